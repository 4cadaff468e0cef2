use crate::ids::{EpicId, TaskId};
use crate::types::ReviewKind;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STEWARD_DIR: &str = ".steward";
pub const EPICS_DIR: &str = ".steward/epics";
pub const CONFIG_FILE: &str = ".steward/config.yaml";

/// Shared state location when the workspace is not a git repository.
pub const FALLBACK_STATE_DIR: &str = ".steward/state";
pub const GITIGNORE_STATE_ENTRY: &str = ".steward/state/";

/// Subdirectory of the git common dir (or fallback dir) holding shared state.
pub const STATE_SUBDIR: &str = "steward";

pub const EPIC_DEF_FILE: &str = "epic.json";
pub const RUN_RECORD_FILE: &str = "run.json";
pub const PROGRESS_LOG_FILE: &str = "progress.log";
pub const PAUSE_FILE: &str = "PAUSE";
pub const STOP_FILE: &str = "STOP";

// ---------------------------------------------------------------------------
// Versioned tree (definitions, committed alongside the code)
// ---------------------------------------------------------------------------

pub fn steward_dir(root: &Path) -> PathBuf {
    root.join(STEWARD_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn epics_dir(root: &Path) -> PathBuf {
    root.join(EPICS_DIR)
}

pub fn epic_dir(root: &Path, id: EpicId) -> PathBuf {
    epics_dir(root).join(id.to_string())
}

pub fn epic_def_path(root: &Path, id: EpicId) -> PathBuf {
    epic_dir(root, id).join(EPIC_DEF_FILE)
}

pub fn tasks_dir(root: &Path, id: EpicId) -> PathBuf {
    epic_dir(root, id).join("tasks")
}

pub fn task_def_path(root: &Path, id: TaskId) -> PathBuf {
    tasks_dir(root, id.epic()).join(format!("{id}.json"))
}

// ---------------------------------------------------------------------------
// Shared state tree (runtime status, uncommitted, one per repository)
// ---------------------------------------------------------------------------

pub fn runtime_epics_dir(state: &Path) -> PathBuf {
    state.join("runtime").join("epics")
}

pub fn runtime_tasks_dir(state: &Path) -> PathBuf {
    state.join("runtime").join("tasks")
}

pub fn epic_runtime_path(state: &Path, id: EpicId) -> PathBuf {
    runtime_epics_dir(state).join(format!("{id}.json"))
}

pub fn task_runtime_path(state: &Path, id: TaskId) -> PathBuf {
    runtime_tasks_dir(state).join(format!("{id}.json"))
}

pub fn locks_dir(state: &Path) -> PathBuf {
    state.join("locks")
}

/// Per-entity lock file guarding read-modify-write of one runtime record.
pub fn entity_lock_path(state: &Path, entity: &str) -> PathBuf {
    locks_dir(state).join(format!("{entity}.lock"))
}

/// Lock serializing id allocation across concurrent `epic create` calls.
pub fn create_lock_path(state: &Path) -> PathBuf {
    locks_dir(state).join("create.lock")
}

pub fn receipts_dir(state: &Path) -> PathBuf {
    state.join("receipts")
}

pub fn receipt_path(state: &Path, kind: ReviewKind, subject: &str) -> PathBuf {
    receipts_dir(state).join(format!("{}-{subject}.json", kind.as_str()))
}

pub fn runs_dir(state: &Path) -> PathBuf {
    state.join("runs")
}

pub fn run_dir(state: &Path, run_id: &str) -> PathBuf {
    runs_dir(state).join(run_id)
}

pub fn run_record_path(state: &Path, run_id: &str) -> PathBuf {
    run_dir(state, run_id).join(RUN_RECORD_FILE)
}

pub fn progress_log_path(state: &Path, run_id: &str) -> PathBuf {
    run_dir(state, run_id).join(PROGRESS_LOG_FILE)
}

pub fn pause_path(state: &Path, run_id: &str) -> PathBuf {
    run_dir(state, run_id).join(PAUSE_FILE)
}

pub fn stop_path(state: &Path, run_id: &str) -> PathBuf {
    run_dir(state, run_id).join(STOP_FILE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_tree_paths() {
        let root = Path::new("/tmp/proj");
        let epic: EpicId = "E2".parse().unwrap();
        let task: TaskId = "E2.3".parse().unwrap();
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.steward/config.yaml")
        );
        assert_eq!(
            epic_def_path(root, epic),
            PathBuf::from("/tmp/proj/.steward/epics/E2/epic.json")
        );
        assert_eq!(
            task_def_path(root, task),
            PathBuf::from("/tmp/proj/.steward/epics/E2/tasks/E2.3.json")
        );
    }

    #[test]
    fn state_tree_paths() {
        let state = Path::new("/tmp/proj/.git/steward");
        let epic: EpicId = "E2".parse().unwrap();
        let task: TaskId = "E2.3".parse().unwrap();
        assert_eq!(
            epic_runtime_path(state, epic),
            PathBuf::from("/tmp/proj/.git/steward/runtime/epics/E2.json")
        );
        assert_eq!(
            task_runtime_path(state, task),
            PathBuf::from("/tmp/proj/.git/steward/runtime/tasks/E2.3.json")
        );
        assert_eq!(
            entity_lock_path(state, "E2.3"),
            PathBuf::from("/tmp/proj/.git/steward/locks/E2.3.lock")
        );
        assert_eq!(
            receipt_path(state, ReviewKind::Plan, "E2"),
            PathBuf::from("/tmp/proj/.git/steward/receipts/plan-E2.json")
        );
        assert_eq!(
            pause_path(state, "abcd"),
            PathBuf::from("/tmp/proj/.git/steward/runs/abcd/PAUSE")
        );
    }
}
