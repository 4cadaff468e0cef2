//! Answers "what should happen next": exactly one directive per call, chosen
//! deterministically from a snapshot.
//!
//! Epic-level gates come before task-level work. An epic with unresolved
//! epic dependencies is excluded outright, an unshipped plan review (when
//! required) is surfaced before any of that epic's tasks, and a finished
//! epic's completion review (when required) is surfaced before it can close.

use crate::error::{Result, StewardError};
use crate::ids::{EpicId, TaskId};
use crate::store::Snapshot;
use crate::types::{EpicStatus, TaskStatus};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which epic-level gates the caller wants enforced during selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateRequirements {
    pub plan: bool,
    pub completion: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    /// Produce or revise the epic's plan and get it reviewed.
    Plan { epic: EpicId, title: String },
    /// Work the named task.
    Implement {
        task: TaskId,
        epic: EpicId,
        title: String,
    },
    /// Every task is done; the epic needs a shipped completion review.
    CompletionReview { epic: EpicId, title: String },
    /// Nothing actionable.
    Idle { reason: IdleReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IdleReason {
    /// An in-scope epic waits on epics that are not done yet.
    BlockedByEpicDeps {
        epic: EpicId,
        unresolved: Vec<EpicId>,
    },
    /// Claimed work is still in flight.
    InProgress { tasks: Vec<TaskId> },
    /// Remaining tasks all wait on unfinished dependencies or are blocked.
    Blocked { tasks: Vec<TaskId> },
    AllDone,
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

pub fn select(
    snapshot: &Snapshot,
    scope: Option<EpicId>,
    actor: &str,
    gates: GateRequirements,
) -> Result<Directive> {
    if let Some(id) = scope {
        if snapshot.epic(id).is_none() {
            return Err(StewardError::EpicNotFound(id.to_string()));
        }
    }

    let in_scope = |id: EpicId| scope.map_or(true, |s| s == id);
    let open_epics: Vec<_> = snapshot
        .epics
        .iter()
        .filter(|e| in_scope(e.id) && e.status == EpicStatus::Open)
        .collect();

    // 1. Epic dependencies. An epic waiting on other epics is fully inert:
    // none of its tasks or gates are offered.
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for epic in &open_epics {
        let unresolved: Vec<EpicId> = epic
            .depends_on_epics
            .iter()
            .copied()
            .filter(|dep| {
                snapshot
                    .epic(*dep)
                    .map_or(true, |d| d.status != EpicStatus::Done)
            })
            .collect();
        if unresolved.is_empty() {
            included.push(*epic);
        } else {
            excluded.push((epic.id, unresolved));
        }
    }

    // 2. Plan gate, before any task work in that epic.
    if gates.plan {
        if let Some(epic) = included.iter().find(|e| !e.plan_review_status.is_ship()) {
            return Ok(Directive::Plan {
                epic: epic.id,
                title: epic.title.clone(),
            });
        }
    }

    // 3. Completion gate for epics whose tasks are all done (vacuously true
    // with zero tasks).
    if gates.completion {
        if let Some(epic) = included.iter().find(|e| {
            !e.completion_review_status.is_ship()
                && snapshot.tasks_of(e.id).all(|t| t.status == TaskStatus::Done)
        }) {
            return Ok(Directive::CompletionReview {
                epic: epic.id,
                title: epic.title.clone(),
            });
        }
    }

    let included_tasks: Vec<_> = included
        .iter()
        .flat_map(|e| snapshot.tasks_of(e.id))
        .collect();

    // 4. Resume the actor's own claim before offering new work.
    let mut own: Vec<_> = included_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress && t.assignee.as_deref() == Some(actor))
        .collect();
    own.sort_by_key(|t| (t.priority, t.created_at, t.id));
    if let Some(task) = own.first() {
        return Ok(Directive::Implement {
            task: task.id,
            epic: task.id.epic(),
            title: task.title.clone(),
        });
    }

    // 5. Ready set: todo with every dependency done. A dangling dependency
    // counts as unmet; validation should have caught it already.
    let dep_done = |id: TaskId| {
        snapshot
            .task(id)
            .map_or(false, |t| t.status == TaskStatus::Done)
    };
    let mut ready: Vec<_> = included_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Todo && t.depends_on.iter().all(|d| dep_done(*d)))
        .collect();
    ready.sort_by_key(|t| (t.priority, t.created_at, t.id));
    if let Some(task) = ready.first() {
        return Ok(Directive::Implement {
            task: task.id,
            epic: task.id.epic(),
            title: task.title.clone(),
        });
    }

    // 6. Nothing actionable; say precisely why.
    if let Some((epic, unresolved)) = excluded.into_iter().next() {
        return Ok(Directive::Idle {
            reason: IdleReason::BlockedByEpicDeps { epic, unresolved },
        });
    }
    let in_progress: Vec<TaskId> = included_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .map(|t| t.id)
        .collect();
    if !in_progress.is_empty() {
        return Ok(Directive::Idle {
            reason: IdleReason::InProgress { tasks: in_progress },
        });
    }
    let stuck: Vec<TaskId> = included_tasks
        .iter()
        .filter(|t| matches!(t.status, TaskStatus::Todo | TaskStatus::Blocked))
        .map(|t| t.id)
        .collect();
    if !stuck.is_empty() {
        return Ok(Directive::Idle {
            reason: IdleReason::Blocked { tasks: stuck },
        });
    }
    Ok(Directive::Idle {
        reason: IdleReason::AllDone,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epic::Epic;
    use crate::task::Task;
    use crate::types::ReviewStatus;
    use chrono::{TimeZone, Utc};

    fn eid(s: &str) -> EpicId {
        s.parse().unwrap()
    }

    fn tid(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn mk_epic(id: &str) -> Epic {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Epic {
            id: eid(id),
            title: format!("epic {id}"),
            branch_name: None,
            spec: None,
            depends_on_epics: Vec::new(),
            created_at: now,
            status: EpicStatus::Open,
            plan_review_status: ReviewStatus::Unknown,
            plan_reviewed_at: None,
            completion_review_status: ReviewStatus::Unknown,
            completion_reviewed_at: None,
            updated_at: now,
        }
    }

    fn mk_task(id: &str, status: TaskStatus) -> Task {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Task {
            id: tid(id),
            title: format!("task {id}"),
            priority: 100,
            depends_on: Vec::new(),
            spec: None,
            created_at: now,
            status,
            assignee: None,
            claimed_at: None,
            claim_note: None,
            blocked_reason: None,
            evidence: None,
            updated_at: now,
        }
    }

    fn no_gates() -> GateRequirements {
        GateRequirements::default()
    }

    #[test]
    fn dependency_order_b_after_a() {
        // B depends on A; only A is offered until A is done.
        let mut b = mk_task("E1.2", TaskStatus::Todo);
        b.depends_on = vec![tid("E1.1")];
        let mut snap = Snapshot {
            epics: vec![mk_epic("E1")],
            tasks: vec![mk_task("E1.1", TaskStatus::Todo), b],
        };

        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert_eq!(
            d,
            Directive::Implement {
                task: tid("E1.1"),
                epic: eid("E1"),
                title: "task E1.1".to_string()
            }
        );

        snap.tasks[0].status = TaskStatus::Done;
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert!(matches!(d, Directive::Implement { task, .. } if task == tid("E1.2")));

        snap.tasks[1].status = TaskStatus::Done;
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert_eq!(
            d,
            Directive::Idle {
                reason: IdleReason::AllDone
            }
        );
    }

    #[test]
    fn lowest_priority_wins_then_created_then_id() {
        let mut a = mk_task("E1.1", TaskStatus::Todo);
        let mut b = mk_task("E1.2", TaskStatus::Todo);
        a.priority = 200;
        b.priority = 50;
        let snap = Snapshot {
            epics: vec![mk_epic("E1")],
            tasks: vec![a, b],
        };
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert!(matches!(d, Directive::Implement { task, .. } if task == tid("E1.2")));

        // equal priority and created_at: the lower id is stable
        let snap = Snapshot {
            epics: vec![mk_epic("E1")],
            tasks: vec![mk_task("E1.2", TaskStatus::Todo), mk_task("E1.1", TaskStatus::Todo)],
        };
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert!(matches!(d, Directive::Implement { task, .. } if task == tid("E1.1")));
    }

    #[test]
    fn epic_deps_exclude_the_whole_epic() {
        // E2 depends on E1, which is still open. Scoped selection on E2 must
        // name E1 instead of offering E2's ready task.
        let mut e2 = mk_epic("E2");
        e2.depends_on_epics = vec![eid("E1")];
        let snap = Snapshot {
            epics: vec![mk_epic("E1"), e2],
            tasks: vec![mk_task("E2.1", TaskStatus::Todo)],
        };
        let d = select(&snap, Some(eid("E2")), "alice", no_gates()).unwrap();
        assert_eq!(
            d,
            Directive::Idle {
                reason: IdleReason::BlockedByEpicDeps {
                    epic: eid("E2"),
                    unresolved: vec![eid("E1")]
                }
            }
        );
    }

    #[test]
    fn resolved_epic_dep_releases_tasks() {
        let mut e2 = mk_epic("E2");
        e2.depends_on_epics = vec![eid("E1")];
        let mut e1 = mk_epic("E1");
        e1.status = EpicStatus::Done;
        let snap = Snapshot {
            epics: vec![e1, e2],
            tasks: vec![mk_task("E2.1", TaskStatus::Todo)],
        };
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert!(matches!(d, Directive::Implement { task, .. } if task == tid("E2.1")));
    }

    #[test]
    fn plan_gate_precedes_task_work() {
        let snap = Snapshot {
            epics: vec![mk_epic("E1")],
            tasks: vec![mk_task("E1.1", TaskStatus::Todo)],
        };
        let gates = GateRequirements {
            plan: true,
            completion: false,
        };
        let d = select(&snap, None, "alice", gates).unwrap();
        assert!(matches!(d, Directive::Plan { epic, .. } if epic == eid("E1")));

        // without the gate the task is offered straight away
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert!(matches!(d, Directive::Implement { .. }));

        // a shipped plan opens the gate
        let mut snap = snap;
        snap.epics[0].plan_review_status = ReviewStatus::Ship;
        let d = select(&snap, None, "alice", gates).unwrap();
        assert!(matches!(d, Directive::Implement { .. }));
    }

    #[test]
    fn completion_review_offered_when_all_tasks_done() {
        let snap = Snapshot {
            epics: vec![mk_epic("E1")],
            tasks: vec![mk_task("E1.1", TaskStatus::Done)],
        };
        let gates = GateRequirements {
            plan: false,
            completion: true,
        };
        let d = select(&snap, None, "alice", gates).unwrap();
        assert!(matches!(d, Directive::CompletionReview { epic, .. } if epic == eid("E1")));

        // needs_work keeps the gate shut
        let mut snap = snap;
        snap.epics[0].completion_review_status = ReviewStatus::NeedsWork;
        let d = select(&snap, None, "alice", gates).unwrap();
        assert!(matches!(d, Directive::CompletionReview { .. }));

        snap.epics[0].completion_review_status = ReviewStatus::Ship;
        let d = select(&snap, None, "alice", gates).unwrap();
        assert_eq!(
            d,
            Directive::Idle {
                reason: IdleReason::AllDone
            }
        );
    }

    #[test]
    fn actor_resumes_own_claim_before_new_work() {
        let mut claimed = mk_task("E1.2", TaskStatus::InProgress);
        claimed.assignee = Some("alice".to_string());
        let snap = Snapshot {
            epics: vec![mk_epic("E1")],
            tasks: vec![mk_task("E1.1", TaskStatus::Todo), claimed],
        };
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert!(matches!(d, Directive::Implement { task, .. } if task == tid("E1.2")));

        // a different actor is offered the ready task instead
        let d = select(&snap, None, "bob", no_gates()).unwrap();
        assert!(matches!(d, Directive::Implement { task, .. } if task == tid("E1.1")));
    }

    #[test]
    fn idle_reasons_distinguish_in_progress_from_blocked() {
        let mut claimed = mk_task("E1.1", TaskStatus::InProgress);
        claimed.assignee = Some("carol".to_string());
        let snap = Snapshot {
            epics: vec![mk_epic("E1")],
            tasks: vec![claimed],
        };
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert_eq!(
            d,
            Directive::Idle {
                reason: IdleReason::InProgress {
                    tasks: vec![tid("E1.1")]
                }
            }
        );

        let mut waiting = mk_task("E1.2", TaskStatus::Todo);
        waiting.depends_on = vec![tid("E1.1")];
        let snap = Snapshot {
            epics: vec![mk_epic("E1")],
            tasks: vec![mk_task("E1.1", TaskStatus::Blocked), waiting],
        };
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert!(matches!(
            d,
            Directive::Idle {
                reason: IdleReason::Blocked { .. }
            }
        ));
    }

    #[test]
    fn scoped_to_unknown_epic_fails() {
        let snap = Snapshot {
            epics: vec![],
            tasks: vec![],
        };
        let err = select(&snap, Some(eid("E9")), "alice", no_gates()).unwrap_err();
        assert_eq!(err.code(), "epic_not_found");
    }

    #[test]
    fn closed_epics_are_ignored() {
        let mut e1 = mk_epic("E1");
        e1.status = EpicStatus::Done;
        let snap = Snapshot {
            epics: vec![e1],
            tasks: vec![mk_task("E1.1", TaskStatus::Done)],
        };
        let d = select(&snap, None, "alice", no_gates()).unwrap();
        assert_eq!(
            d,
            Directive::Idle {
                reason: IdleReason::AllDone
            }
        );
    }

    #[test]
    fn directive_serializes_with_kind_tag() {
        let d = Directive::Idle {
            reason: IdleReason::BlockedByEpicDeps {
                epic: eid("E2"),
                unresolved: vec![eid("E1")],
            },
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "idle");
        assert_eq!(json["reason"]["reason"], "blocked_by_epic_deps");
        assert_eq!(json["reason"]["unresolved"][0], "E1");
    }
}
