use crate::error::{Result, StewardError};
use crate::evidence::Evidence;
use crate::ids::TaskId;
use crate::types::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Definition (versioned) and runtime (shared state)
// ---------------------------------------------------------------------------

pub const DEFAULT_PRIORITY: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    pub id: TaskId,
    pub title: String,
    /// Lower number is picked sooner.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Same-epic task ids this task waits on. Kept sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Older layouts stored status inline in the definition. Honored only
    /// when no runtime record exists; never written back.
    #[serde(default, rename = "status", skip_serializing)]
    pub legacy_status: Option<TaskStatus>,
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

impl TaskDef {
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            priority: DEFAULT_PRIORITY,
            depends_on: Vec::new(),
            spec: None,
            created_at: Utc::now(),
            legacy_status: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRuntime {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRuntime {
    pub fn new() -> Self {
        Self {
            status: TaskStatus::Todo,
            assignee: None,
            claimed_at: None,
            claim_note: None,
            blocked_reason: None,
            evidence: None,
            updated_at: Utc::now(),
        }
    }

    /// First-contact record for a definition that has no runtime file yet.
    pub fn synthesize(def: &TaskDef) -> Self {
        Self {
            status: def.legacy_status.unwrap_or(TaskStatus::Todo),
            ..Self::new()
        }
    }
}

impl Default for TaskRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Merged view handed to callers: definition plus runtime in one record.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub priority: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn merge(def: TaskDef, runtime: TaskRuntime) -> Self {
        Self {
            id: def.id,
            title: def.title,
            priority: def.priority,
            depends_on: def.depends_on,
            spec: def.spec,
            created_at: def.created_at,
            status: runtime.status,
            assignee: runtime.assignee,
            claimed_at: runtime.claimed_at,
            claim_note: runtime.claim_note,
            blocked_reason: runtime.blocked_reason,
            evidence: runtime.evidence,
            updated_at: runtime.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Transitions (pure; the store applies them under the entity lock)
// ---------------------------------------------------------------------------

/// Claim a task. Only `todo` tasks can be started; a task someone else
/// already holds needs `force` to take over.
pub fn start(
    rt: &mut TaskRuntime,
    id: TaskId,
    actor: &str,
    note: Option<String>,
    force: bool,
) -> Result<()> {
    match rt.status {
        TaskStatus::Todo => {}
        TaskStatus::InProgress => {
            if !force {
                return Err(StewardError::ClaimConflict {
                    task: id.to_string(),
                    holder: rt.assignee.clone().unwrap_or_default(),
                });
            }
        }
        from @ (TaskStatus::Done | TaskStatus::Blocked) => {
            return Err(StewardError::InvalidTransition {
                id: id.to_string(),
                from: from.as_str().to_string(),
                to: TaskStatus::InProgress.as_str().to_string(),
                reason: "reset the task first".to_string(),
            });
        }
    }
    rt.status = TaskStatus::InProgress;
    rt.assignee = Some(actor.to_string());
    rt.claimed_at = Some(Utc::now());
    rt.claim_note = note;
    rt.updated_at = Utc::now();
    Ok(())
}

/// Complete a task. `done` is only reachable from `in_progress` and demands
/// validated evidence.
pub fn complete(rt: &mut TaskRuntime, id: TaskId, evidence: Evidence) -> Result<()> {
    evidence.validate()?;
    if rt.status != TaskStatus::InProgress {
        return Err(StewardError::InvalidTransition {
            id: id.to_string(),
            from: rt.status.as_str().to_string(),
            to: TaskStatus::Done.as_str().to_string(),
            reason: "done is only reachable from in_progress".to_string(),
        });
    }
    rt.status = TaskStatus::Done;
    rt.evidence = Some(evidence);
    rt.blocked_reason = None;
    rt.updated_at = Utc::now();
    Ok(())
}

/// Mark an in-flight task blocked with a non-empty reason.
pub fn block(rt: &mut TaskRuntime, id: TaskId, reason: &str) -> Result<()> {
    if reason.trim().is_empty() {
        return Err(StewardError::InvalidTransition {
            id: id.to_string(),
            from: rt.status.as_str().to_string(),
            to: TaskStatus::Blocked.as_str().to_string(),
            reason: "a non-empty reason is required".to_string(),
        });
    }
    if rt.status != TaskStatus::InProgress {
        return Err(StewardError::InvalidTransition {
            id: id.to_string(),
            from: rt.status.as_str().to_string(),
            to: TaskStatus::Blocked.as_str().to_string(),
            reason: "blocked is only reachable from in_progress".to_string(),
        });
    }
    rt.status = TaskStatus::Blocked;
    rt.blocked_reason = Some(reason.to_string());
    rt.updated_at = Utc::now();
    Ok(())
}

/// Return a task to `todo`, clearing claim fields, blocked reason, and
/// evidence together. Discarding an in-flight claim requires `force`.
pub fn reset(rt: &mut TaskRuntime, id: TaskId, force: bool) -> Result<()> {
    if rt.status == TaskStatus::InProgress && !force {
        return Err(StewardError::InvalidTransition {
            id: id.to_string(),
            from: TaskStatus::InProgress.as_str().to_string(),
            to: TaskStatus::Todo.as_str().to_string(),
            reason: "task is claimed; pass force to discard the claim".to_string(),
        });
    }
    rt.status = TaskStatus::Todo;
    rt.assignee = None;
    rt.claimed_at = None;
    rt.claim_note = None;
    rt.blocked_reason = None;
    rt.evidence = None;
    rt.updated_at = Utc::now();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tid() -> TaskId {
        "E1.1".parse().unwrap()
    }

    fn evidence() -> Evidence {
        Evidence {
            commits: vec!["abc1234".to_string()],
            tests: Vec::new(),
            prs: Vec::new(),
            summary: "did the thing".to_string(),
        }
    }

    #[test]
    fn lifecycle_todo_to_done() {
        let mut rt = TaskRuntime::new();
        start(&mut rt, tid(), "alice", None, false).unwrap();
        assert_eq!(rt.status, TaskStatus::InProgress);
        assert_eq!(rt.assignee.as_deref(), Some("alice"));
        assert!(rt.claimed_at.is_some());

        complete(&mut rt, tid(), evidence()).unwrap();
        assert_eq!(rt.status, TaskStatus::Done);
        assert!(rt.evidence.is_some());
    }

    #[test]
    fn done_requires_in_progress() {
        let mut rt = TaskRuntime::new();
        let err = complete(&mut rt, tid(), evidence()).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn done_requires_evidence() {
        let mut rt = TaskRuntime::new();
        start(&mut rt, tid(), "alice", None, false).unwrap();
        let mut e = evidence();
        e.commits.clear();
        let err = complete(&mut rt, tid(), e).unwrap_err();
        assert_eq!(err.code(), "missing_evidence");
        // the failed attempt must not have moved the status
        assert_eq!(rt.status, TaskStatus::InProgress);
    }

    #[test]
    fn second_claim_conflicts_without_force() {
        let mut rt = TaskRuntime::new();
        start(&mut rt, tid(), "alice", None, false).unwrap();
        let err = start(&mut rt, tid(), "bob", None, false).unwrap_err();
        assert_eq!(err.code(), "claim_conflict");
        assert!(err.to_string().contains("alice"));
        assert_eq!(rt.assignee.as_deref(), Some("alice"));
    }

    #[test]
    fn forced_claim_takes_over() {
        let mut rt = TaskRuntime::new();
        start(&mut rt, tid(), "alice", None, false).unwrap();
        start(&mut rt, tid(), "bob", Some("taking over".to_string()), true).unwrap();
        assert_eq!(rt.assignee.as_deref(), Some("bob"));
        assert_eq!(rt.claim_note.as_deref(), Some("taking over"));
    }

    #[test]
    fn start_on_done_needs_reset() {
        let mut rt = TaskRuntime::new();
        start(&mut rt, tid(), "alice", None, false).unwrap();
        complete(&mut rt, tid(), evidence()).unwrap();
        let err = start(&mut rt, tid(), "alice", None, true).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn block_requires_reason_and_in_progress() {
        let mut rt = TaskRuntime::new();
        assert_eq!(block(&mut rt, tid(), "infra down").unwrap_err().code(), "invalid_transition");
        start(&mut rt, tid(), "alice", None, false).unwrap();
        assert_eq!(block(&mut rt, tid(), "  ").unwrap_err().code(), "invalid_transition");
        block(&mut rt, tid(), "infra down").unwrap();
        assert_eq!(rt.status, TaskStatus::Blocked);
        assert_eq!(rt.blocked_reason.as_deref(), Some("infra down"));
    }

    #[test]
    fn reset_clears_everything_together() {
        let mut rt = TaskRuntime::new();
        start(&mut rt, tid(), "alice", Some("note".to_string()), false).unwrap();
        complete(&mut rt, tid(), evidence()).unwrap();
        reset(&mut rt, tid(), false).unwrap();
        assert_eq!(rt.status, TaskStatus::Todo);
        assert!(rt.assignee.is_none());
        assert!(rt.claimed_at.is_none());
        assert!(rt.claim_note.is_none());
        assert!(rt.blocked_reason.is_none());
        assert!(rt.evidence.is_none());
    }

    #[test]
    fn reset_in_progress_needs_force() {
        let mut rt = TaskRuntime::new();
        start(&mut rt, tid(), "alice", None, false).unwrap();
        let err = reset(&mut rt, tid(), false).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
        reset(&mut rt, tid(), true).unwrap();
        assert_eq!(rt.status, TaskStatus::Todo);
        assert!(rt.assignee.is_none());
    }

    #[test]
    fn synthesize_honors_legacy_status() {
        let mut def = TaskDef::new(tid(), "t");
        def.legacy_status = Some(TaskStatus::Done);
        let rt = TaskRuntime::synthesize(&def);
        assert_eq!(rt.status, TaskStatus::Done);
        let rt = TaskRuntime::synthesize(&TaskDef::new(tid(), "t"));
        assert_eq!(rt.status, TaskStatus::Todo);
    }

    #[test]
    fn def_never_writes_legacy_status() {
        let mut def = TaskDef::new(tid(), "t");
        def.legacy_status = Some(TaskStatus::Done);
        let json = serde_json::to_string(&def).unwrap();
        assert!(!json.contains("status"));
        // but an old file that carries it still parses
        let old = r#"{"id":"E1.1","title":"t","status":"done","created_at":"2026-01-01T00:00:00Z"}"#;
        let parsed: TaskDef = serde_json::from_str(old).unwrap();
        assert_eq!(parsed.legacy_status, Some(TaskStatus::Done));
        assert_eq!(parsed.priority, DEFAULT_PRIORITY);
    }
}
