//! Domain operations over the store. Each function owns one command's
//! invariants end to end: id allocation under the create lock, readiness and
//! graph validation before definition writes, receipt gates around status
//! setters, and runtime transitions under the entity lock.

use crate::epic::{self, Epic, EpicDef};
use crate::error::{Result, StewardError};
use crate::evidence::Evidence;
use crate::graph::DepGraph;
use crate::ids::{EntityId, EpicId, TaskId};
use crate::receipt;
use crate::store::{LocalStore, StateStore};
use crate::task::{self, Task, TaskDef};
use crate::types::{EpicStatus, ReviewKind, ReviewStatus, TaskStatus};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NewEpic {
    pub title: String,
    pub branch_name: Option<String>,
    pub spec: Option<String>,
    pub depends_on_epics: Vec<EpicId>,
}

/// Allocate the next epic id and write its definition. Id allocation is
/// serialized across processes by the create lock.
pub fn create_epic(store: &LocalStore, req: NewEpic) -> Result<Epic> {
    let _lock = store.create_lock()?;
    for dep in &req.depends_on_epics {
        if store.load_epic_def(*dep).is_err() {
            return Err(StewardError::UnknownDependency {
                from: "new epic".to_string(),
                to: dep.to_string(),
            });
        }
    }
    let next = store
        .list_epic_ids()?
        .last()
        .map_or(1, |id| id.number() + 1);
    let id = EpicId::new(next)?;

    let mut def = EpicDef::new(id, req.title);
    def.branch_name = req.branch_name;
    def.spec = req.spec;
    def.depends_on_epics = req.depends_on_epics;
    def.depends_on_epics.sort();
    def.depends_on_epics.dedup();
    store.save_epic_def(&def)?;
    info!(epic = %id, "created epic");
    store.load_epic(id)
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub epic: EpicId,
    pub title: String,
    pub priority: Option<u32>,
    pub depends_on: Vec<TaskId>,
    pub spec: Option<String>,
}

/// Allocate the next ordinal in the epic and write the task definition.
pub fn add_task(store: &LocalStore, req: NewTask) -> Result<Task> {
    let epic = store.load_epic(req.epic)?;
    if epic.status == EpicStatus::Done {
        return Err(StewardError::InvalidTransition {
            id: req.epic.to_string(),
            from: EpicStatus::Done.as_str().to_string(),
            to: EpicStatus::Done.as_str().to_string(),
            reason: "cannot add tasks to a closed epic".to_string(),
        });
    }

    let _lock = store.create_lock()?;
    let existing = store.list_task_ids(req.epic)?;
    let id = req
        .epic
        .task(existing.last().map_or(1, |t| t.ordinal() + 1))?;

    let mut depends_on = req.depends_on;
    depends_on.sort();
    depends_on.dedup();
    for dep in &depends_on {
        if dep.epic() != req.epic {
            return Err(StewardError::CrossEpicDependency {
                from: id.to_string(),
                to: dep.to_string(),
            });
        }
        if store.load_task_def(*dep).is_err() {
            return Err(StewardError::UnknownDependency {
                from: id.to_string(),
                to: dep.to_string(),
            });
        }
    }

    let mut def = TaskDef::new(id, req.title);
    def.priority = req.priority.unwrap_or(task::DEFAULT_PRIORITY);
    def.depends_on = depends_on;
    def.spec = req.spec;
    store.save_task_def(&def)?;
    info!(task = %id, "added task");
    store.load_task(id)
}

// ---------------------------------------------------------------------------
// Task transitions
// ---------------------------------------------------------------------------

/// Claim a task. Unmet task dependencies or unresolved epic dependencies
/// refuse the claim unless `force` is passed.
pub fn start_task(
    store: &LocalStore,
    id: TaskId,
    actor: &str,
    note: Option<String>,
    force: bool,
) -> Result<Task> {
    if !force {
        let unmet = unmet_dependencies(store, id)?;
        if !unmet.is_empty() {
            return Err(StewardError::TaskNotReady {
                task: id.to_string(),
                unmet: unmet.join(", "),
            });
        }
    }
    let task = store.update_task_runtime(id, |rt| task::start(rt, id, actor, note, force))?;
    info!(task = %id, actor, "started task");
    Ok(task)
}

fn unmet_dependencies(store: &LocalStore, id: TaskId) -> Result<Vec<String>> {
    let def = store.load_task_def(id)?;
    let mut unmet = Vec::new();
    let epic_def = store.load_epic_def(id.epic())?;
    for dep in &epic_def.depends_on_epics {
        let resolved = store
            .load_epic(*dep)
            .map(|e| e.status == EpicStatus::Done)
            .unwrap_or(false);
        if !resolved {
            unmet.push(format!("epic {dep}"));
        }
    }
    for dep in &def.depends_on {
        let done = store
            .load_task(*dep)
            .map(|t| t.status == TaskStatus::Done)
            .unwrap_or(false);
        if !done {
            unmet.push(dep.to_string());
        }
    }
    Ok(unmet)
}

/// Complete a task with evidence. When the implementation gate is on, a
/// receipt must exist before the write and is consumed after it commits.
pub fn complete_task(
    store: &LocalStore,
    id: TaskId,
    evidence: Evidence,
    require_receipt: bool,
) -> Result<Task> {
    if require_receipt {
        receipt::require(store.state_dir(), ReviewKind::Implementation, &id.to_string())?;
    }
    let task = store.update_task_runtime(id, |rt| task::complete(rt, id, evidence))?;
    if require_receipt {
        receipt::consume(store.state_dir(), ReviewKind::Implementation, &id.to_string())?;
    }
    info!(task = %id, "completed task");
    Ok(task)
}

pub fn block_task(store: &LocalStore, id: TaskId, reason: &str) -> Result<Task> {
    let task = store.update_task_runtime(id, |rt| task::block(rt, id, reason))?;
    info!(task = %id, reason, "blocked task");
    Ok(task)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ResetOutcome {
    pub task: Task,
    /// Dependents returned to `todo`, in cascade order.
    pub cascaded: Vec<TaskId>,
    /// In-flight dependents left untouched.
    pub skipped_in_progress: Vec<TaskId>,
}

/// Reset a task to `todo` and cascade to its same-epic dependents: `done`
/// and `blocked` dependents are returned to `todo` with a full clear,
/// `in_progress` dependents are reported but never touched.
pub fn reset_task(store: &LocalStore, id: TaskId, force: bool) -> Result<ResetOutcome> {
    let task = store.update_task_runtime(id, |rt| task::reset(rt, id, force))?;

    let epic = id.epic();
    let mut graph = DepGraph::new(store.list_task_ids(epic)?);
    for tid in store.list_task_ids(epic)? {
        for dep in store.load_task_def(tid)?.depends_on {
            if graph.contains(dep) {
                graph.add_edge(tid, dep)?;
            }
        }
    }

    let mut dependents = graph.transitive_dependents(id);
    dependents.sort();
    let mut cascaded = Vec::new();
    let mut skipped = Vec::new();
    for dep in dependents {
        let current = store.load_task(dep)?;
        match current.status {
            TaskStatus::Done | TaskStatus::Blocked => {
                store.update_task_runtime(dep, |rt| task::reset(rt, dep, false))?;
                cascaded.push(dep);
            }
            TaskStatus::InProgress => skipped.push(dep),
            TaskStatus::Todo => {}
        }
    }
    info!(task = %id, cascaded = cascaded.len(), "reset task");
    Ok(ResetOutcome {
        task,
        cascaded,
        skipped_in_progress: skipped,
    })
}

// ---------------------------------------------------------------------------
// Epic transitions
// ---------------------------------------------------------------------------

/// Close an epic: every owned task must be `done`, and when the completion
/// gate applies its review must have shipped.
pub fn close_epic(store: &LocalStore, id: EpicId, require_completion_gate: bool) -> Result<Epic> {
    let mut open = 0usize;
    for tid in store.list_task_ids(id)? {
        if store.load_task(tid)?.status != TaskStatus::Done {
            open += 1;
        }
    }
    let epic =
        store.update_epic_runtime(id, |rt| epic::close(rt, id, open, require_completion_gate))?;
    info!(epic = %id, "closed epic");
    Ok(epic)
}

/// Receipt-gated review status setter. The receipt is checked before the
/// write and consumed only after the write commits, so a crash in between
/// leaves a consumable receipt rather than a lost verdict.
pub fn set_epic_review(
    store: &LocalStore,
    id: EpicId,
    kind: ReviewKind,
    verdict: ReviewStatus,
) -> Result<Epic> {
    receipt::require(store.state_dir(), kind, &id.to_string())?;
    let epic = store.update_epic_runtime(id, |rt| epic::apply_review(rt, kind, verdict))?;
    receipt::consume(store.state_dir(), kind, &id.to_string())?;
    info!(epic = %id, kind = %kind, verdict = %verdict, "recorded review verdict");
    Ok(epic)
}

// ---------------------------------------------------------------------------
// Dependency maintenance
// ---------------------------------------------------------------------------

/// Add a dependency edge. Both endpoints must be the same kind; task edges
/// stay inside one epic; the mutation is validated for cycles before the
/// definition is written.
pub fn add_dependency(store: &LocalStore, from: EntityId, to: EntityId) -> Result<()> {
    match (from, to) {
        (EntityId::Task(f), EntityId::Task(t)) => {
            if f.epic() != t.epic() {
                return Err(StewardError::CrossEpicDependency {
                    from: f.to_string(),
                    to: t.to_string(),
                });
            }
            let mut def = store.load_task_def(f)?;
            store.load_task_def(t).map_err(|_| StewardError::UnknownDependency {
                from: f.to_string(),
                to: t.to_string(),
            })?;

            let mut graph = DepGraph::new(store.list_task_ids(f.epic())?);
            for tid in store.list_task_ids(f.epic())? {
                for dep in store.load_task_def(tid)?.depends_on {
                    if graph.contains(dep) {
                        graph.add_edge(tid, dep)?;
                    }
                }
            }
            graph.add_edge(f, t)?;
            graph.validate_acyclic()?;

            if !def.depends_on.contains(&t) {
                def.depends_on.push(t);
                def.depends_on.sort();
                store.save_task_def(&def)?;
            }
            debug!(from = %f, to = %t, "added task dependency");
            Ok(())
        }
        (EntityId::Epic(f), EntityId::Epic(t)) => {
            let mut def = store.load_epic_def(f)?;
            store.load_epic_def(t).map_err(|_| StewardError::UnknownDependency {
                from: f.to_string(),
                to: t.to_string(),
            })?;

            let mut graph = DepGraph::new(store.list_epic_ids()?);
            for eid in store.list_epic_ids()? {
                for dep in store.load_epic_def(eid)?.depends_on_epics {
                    if graph.contains(dep) {
                        graph.add_edge(eid, dep)?;
                    }
                }
            }
            graph.add_edge(f, t)?;
            graph.validate_acyclic()?;

            if !def.depends_on_epics.contains(&t) {
                def.depends_on_epics.push(t);
                def.depends_on_epics.sort();
                store.save_epic_def(&def)?;
            }
            debug!(from = %f, to = %t, "added epic dependency");
            Ok(())
        }
        (from, to) => Err(StewardError::InvalidId(format!(
            "{from} -> {to}: endpoints must both be epics or both be tasks"
        ))),
    }
}

/// Remove a dependency edge. Returns false when the edge was not present.
pub fn remove_dependency(store: &LocalStore, from: EntityId, to: EntityId) -> Result<bool> {
    match (from, to) {
        (EntityId::Task(f), EntityId::Task(t)) => {
            let mut def = store.load_task_def(f)?;
            let before = def.depends_on.len();
            def.depends_on.retain(|d| *d != t);
            let changed = def.depends_on.len() != before;
            if changed {
                store.save_task_def(&def)?;
            }
            Ok(changed)
        }
        (EntityId::Epic(f), EntityId::Epic(t)) => {
            let mut def = store.load_epic_def(f)?;
            let before = def.depends_on_epics.len();
            def.depends_on_epics.retain(|d| *d != t);
            let changed = def.depends_on_epics.len() != before;
            if changed {
                store.save_epic_def(&def)?;
            }
            Ok(changed)
        }
        (from, to) => Err(StewardError::InvalidId(format!(
            "{from} -> {to}: endpoints must both be epics or both be tasks"
        ))),
    }
}

/// Full-graph audit: dangling references, cross-epic task edges, cycles.
/// Returns human-readable findings; empty means the graph is sound.
pub fn validate_graph(store: &LocalStore) -> Result<Vec<String>> {
    let mut issues = Vec::new();
    let epic_ids = store.list_epic_ids()?;

    let mut epic_graph = DepGraph::new(epic_ids.iter().copied());
    for eid in &epic_ids {
        for dep in store.load_epic_def(*eid)?.depends_on_epics {
            if epic_graph.contains(dep) {
                epic_graph.add_edge(*eid, dep)?;
            } else {
                issues.push(format!("{eid} depends on {dep}, which does not exist"));
            }
        }
    }
    if let Some(cycle) = epic_graph.find_cycle() {
        issues.push(format!(
            "epic dependency cycle: {}",
            cycle.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" -> ")
        ));
    }

    for eid in &epic_ids {
        let task_ids = store.list_task_ids(*eid)?;
        let mut task_graph = DepGraph::new(task_ids.iter().copied());
        for tid in &task_ids {
            for dep in store.load_task_def(*tid)?.depends_on {
                if dep.epic() != *eid {
                    issues.push(format!("{tid} depends on {dep} in another epic"));
                } else if task_graph.contains(dep) {
                    task_graph.add_edge(*tid, dep)?;
                } else {
                    issues.push(format!("{tid} depends on {dep}, which does not exist"));
                }
            }
        }
        if let Some(cycle) = task_graph.find_cycle() {
            issues.push(format!(
                "task dependency cycle in {eid}: {}",
                cycle.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" -> ")
            ));
        }
    }
    Ok(issues)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::Receipt;
    use crate::workspace::Workspace;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::init(dir.path(), "test").unwrap();
        (dir, LocalStore::new(&ws))
    }

    fn epic(store: &LocalStore, title: &str) -> EpicId {
        create_epic(
            store,
            NewEpic {
                title: title.to_string(),
                ..NewEpic::default()
            },
        )
        .unwrap()
        .id
    }

    fn task(store: &LocalStore, epic: EpicId, title: &str, deps: &[TaskId]) -> TaskId {
        add_task(
            store,
            NewTask {
                epic,
                title: title.to_string(),
                priority: None,
                depends_on: deps.to_vec(),
                spec: None,
            },
        )
        .unwrap()
        .id
    }

    fn evidence() -> Evidence {
        Evidence {
            commits: vec!["abc1234".to_string()],
            tests: vec!["cargo test".to_string()],
            prs: Vec::new(),
            summary: "done".to_string(),
        }
    }

    fn finish(store: &LocalStore, id: TaskId) {
        start_task(store, id, "alice", None, false).unwrap();
        complete_task(store, id, evidence(), false).unwrap();
    }

    #[test]
    fn epic_ids_allocate_monotonically() {
        let (_dir, store) = store();
        assert_eq!(epic(&store, "one").to_string(), "E1");
        assert_eq!(epic(&store, "two").to_string(), "E2");
    }

    #[test]
    fn task_ordinals_allocate_per_epic() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let e2 = epic(&store, "two");
        assert_eq!(task(&store, e1, "a", &[]).to_string(), "E1.1");
        assert_eq!(task(&store, e1, "b", &[]).to_string(), "E1.2");
        assert_eq!(task(&store, e2, "c", &[]).to_string(), "E2.1");
    }

    #[test]
    fn add_task_rejects_cross_epic_and_unknown_deps() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let e2 = epic(&store, "two");
        let t = task(&store, e1, "a", &[]);

        let err = add_task(
            &store,
            NewTask {
                epic: e2,
                title: "x".to_string(),
                priority: None,
                depends_on: vec![t],
                spec: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "cross_epic_dependency");

        let err = add_task(
            &store,
            NewTask {
                epic: e1,
                title: "x".to_string(),
                priority: None,
                depends_on: vec!["E1.9".parse().unwrap()],
                spec: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "unknown_dependency");
    }

    #[test]
    fn start_refuses_unmet_deps_unless_forced() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let a = task(&store, e1, "a", &[]);
        let b = task(&store, e1, "b", &[a]);

        let err = start_task(&store, b, "alice", None, false).unwrap_err();
        assert_eq!(err.code(), "task_not_ready");
        assert!(err.to_string().contains("E1.1"));

        start_task(&store, b, "alice", None, true).unwrap();
        assert_eq!(
            store.load_task(b).unwrap().status,
            TaskStatus::InProgress
        );
    }

    #[test]
    fn start_refuses_unresolved_epic_deps() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let e2 = create_epic(
            &store,
            NewEpic {
                title: "two".to_string(),
                depends_on_epics: vec![e1],
                ..NewEpic::default()
            },
        )
        .unwrap()
        .id;
        let t = task(&store, e2, "a", &[]);
        let err = start_task(&store, t, "alice", None, false).unwrap_err();
        assert_eq!(err.code(), "task_not_ready");
        assert!(err.to_string().contains("epic E1"));
    }

    #[test]
    fn implementation_gate_requires_and_consumes_receipt() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let t = task(&store, e1, "a", &[]);
        start_task(&store, t, "alice", None, false).unwrap();

        let err = complete_task(&store, t, evidence(), true).unwrap_err();
        assert_eq!(err.code(), "gate_refused");
        assert!(err.is_retryable());

        receipt::write(
            store.state_dir(),
            &Receipt::new(ReviewKind::Implementation, t.to_string(), "manual"),
        )
        .unwrap();
        complete_task(&store, t, evidence(), true).unwrap();

        // consumed exactly once
        let err = receipt::require(store.state_dir(), ReviewKind::Implementation, &t.to_string())
            .unwrap_err();
        assert_eq!(err.code(), "gate_refused");
    }

    #[test]
    fn cascade_reset_returns_dependents_to_todo() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let a = task(&store, e1, "a", &[]);
        let b = task(&store, e1, "b", &[a]);
        let c = task(&store, e1, "c", &[b]);
        let d = task(&store, e1, "d", &[]);
        finish(&store, a);
        finish(&store, b);
        finish(&store, c);
        finish(&store, d);

        let outcome = reset_task(&store, a, false).unwrap();
        assert_eq!(outcome.cascaded, vec![b, c]);
        assert!(outcome.skipped_in_progress.is_empty());
        for id in [a, b, c] {
            let t = store.load_task(id).unwrap();
            assert_eq!(t.status, TaskStatus::Todo);
            assert!(t.evidence.is_none());
            assert!(t.assignee.is_none());
        }
        // unrelated task untouched
        assert_eq!(store.load_task(d).unwrap().status, TaskStatus::Done);
    }

    #[test]
    fn cascade_skips_in_progress_dependents() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let a = task(&store, e1, "a", &[]);
        let b = task(&store, e1, "b", &[a]);
        finish(&store, a);
        start_task(&store, b, "bob", None, false).unwrap();

        let outcome = reset_task(&store, a, false).unwrap();
        assert!(outcome.cascaded.is_empty());
        assert_eq!(outcome.skipped_in_progress, vec![b]);
        assert_eq!(store.load_task(b).unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn cascade_never_crosses_epics() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let a = task(&store, e1, "a", &[]);
        finish(&store, a);
        let e2 = epic(&store, "two");
        let other = task(&store, e2, "other", &[]);
        finish(&store, other);

        let outcome = reset_task(&store, a, false).unwrap();
        assert!(outcome.cascaded.is_empty());
        assert_eq!(store.load_task(other).unwrap().status, TaskStatus::Done);
    }

    #[test]
    fn close_epic_demands_done_tasks_and_gate() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let t = task(&store, e1, "a", &[]);

        let err = close_epic(&store, e1, false).unwrap_err();
        assert_eq!(err.code(), "epic_open_tasks");

        finish(&store, t);
        let err = close_epic(&store, e1, true).unwrap_err();
        assert_eq!(err.code(), "gate_not_ship");

        receipt::write(
            store.state_dir(),
            &Receipt::new(ReviewKind::Completion, e1.to_string(), "manual"),
        )
        .unwrap();
        set_epic_review(&store, e1, ReviewKind::Completion, ReviewStatus::Ship).unwrap();
        let epic = close_epic(&store, e1, true).unwrap();
        assert_eq!(epic.status, EpicStatus::Done);
    }

    #[test]
    fn set_review_requires_fresh_receipt_each_cycle() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");

        let err = set_epic_review(&store, e1, ReviewKind::Plan, ReviewStatus::Ship).unwrap_err();
        assert_eq!(err.code(), "gate_refused");

        receipt::write(
            store.state_dir(),
            &Receipt::new(ReviewKind::Plan, e1.to_string(), "manual"),
        )
        .unwrap();
        let epic = set_epic_review(&store, e1, ReviewKind::Plan, ReviewStatus::NeedsWork).unwrap();
        assert_eq!(epic.plan_review_status, ReviewStatus::NeedsWork);

        // the receipt was consumed; another verdict needs another review
        let err = set_epic_review(&store, e1, ReviewKind::Plan, ReviewStatus::Ship).unwrap_err();
        assert_eq!(err.code(), "gate_refused");
    }

    #[test]
    fn dependency_edges_validate_cycles_before_writing() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let a = task(&store, e1, "a", &[]);
        let b = task(&store, e1, "b", &[a]);

        let err = add_dependency(&store, EntityId::Task(a), EntityId::Task(b)).unwrap_err();
        assert_eq!(err.code(), "dependency_cycle");
        // the refused edge must not have been written
        assert!(store.load_task_def(a).unwrap().depends_on.is_empty());

        assert!(remove_dependency(&store, EntityId::Task(b), EntityId::Task(a)).unwrap());
        assert!(!remove_dependency(&store, EntityId::Task(b), EntityId::Task(a)).unwrap());
        add_dependency(&store, EntityId::Task(a), EntityId::Task(b)).unwrap();
    }

    #[test]
    fn epic_dependency_cycle_rejected() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let e2 = create_epic(
            &store,
            NewEpic {
                title: "two".to_string(),
                depends_on_epics: vec![e1],
                ..NewEpic::default()
            },
        )
        .unwrap()
        .id;
        let err = add_dependency(&store, EntityId::Epic(e1), EntityId::Epic(e2)).unwrap_err();
        assert_eq!(err.code(), "dependency_cycle");
    }

    #[test]
    fn mixed_endpoints_rejected() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let t = task(&store, e1, "a", &[]);
        let err = add_dependency(&store, EntityId::Epic(e1), EntityId::Task(t)).unwrap_err();
        assert_eq!(err.code(), "invalid_id");
    }

    #[test]
    fn validate_graph_reports_all_findings() {
        let (_dir, store) = store();
        let e1 = epic(&store, "one");
        let a = task(&store, e1, "a", &[]);

        // corrupt the definitions directly to simulate hand-edited files
        let mut def = store.load_task_def(a).unwrap();
        def.depends_on = vec!["E1.9".parse().unwrap(), "E2.1".parse().unwrap()];
        store.save_task_def(&def).unwrap();

        let issues = validate_graph(&store).unwrap();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.contains("does not exist")));
        assert!(issues.iter().any(|i| i.contains("another epic")));

        def.depends_on = Vec::new();
        store.save_task_def(&def).unwrap();
        assert!(validate_graph(&store).unwrap().is_empty());
    }
}
