use thiserror::Error;

#[derive(Debug, Error)]
pub enum StewardError {
    #[error("not initialized: run 'steward init'")]
    NotInitialized,

    #[error("invalid id '{0}': expected E<n> for epics or E<n>.<m> for tasks")]
    InvalidId(String),

    #[error("invalid verdict '{0}': expected ship, needs_work, or major_rethink")]
    InvalidVerdict(String),

    #[error("invalid review kind '{0}': expected plan, implementation, or completion")]
    InvalidReviewKind(String),

    #[error("epic not found: {0}")]
    EpicNotFound(String),

    #[error("epic already exists: {0}")]
    EpicExists(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already exists: {0}")]
    TaskExists(String),

    #[error("dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("unknown dependency: {from} depends on {to}, which does not exist")]
    UnknownDependency { from: String, to: String },

    #[error("cross-epic dependency: task {from} may not depend on task {to} in another epic")]
    CrossEpicDependency { from: String, to: String },

    #[error("missing evidence: {0}")]
    MissingEvidence(String),

    #[error("invalid transition for {id} from {from} to {to}: {reason}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
        reason: String,
    },

    #[error("task {task} is already claimed by '{holder}' (pass an override to take it over)")]
    ClaimConflict { task: String, holder: String },

    #[error("task {task} is not ready: unfinished dependencies {unmet}")]
    TaskNotReady { task: String, unmet: String },

    #[error("cannot close epic {epic}: {open} task(s) still open")]
    EpicOpenTasks { epic: String, open: usize },

    #[error("cannot close epic {epic}: completion review status is '{status}', not 'ship'")]
    GateNotShip { epic: String, status: String },

    #[error("review gate refused for {kind} review of {subject}: {reason}")]
    GateRefused {
        kind: String,
        subject: String,
        reason: String,
    },

    #[error("runtime record for {0} is locked by another process")]
    LockContention(String),

    #[error("corrupt record at {path}: {detail}")]
    CorruptRecord { path: String, detail: String },

    #[error("no active run found")]
    NoActiveRun,

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("multiple active runs, pass --run to choose one: {0}")]
    AmbiguousRun(String),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StewardError {
    /// Stable machine-checkable code for this error, independent of the
    /// human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            StewardError::NotInitialized => "not_initialized",
            StewardError::InvalidId(_) => "invalid_id",
            StewardError::InvalidVerdict(_) => "invalid_verdict",
            StewardError::InvalidReviewKind(_) => "invalid_review_kind",
            StewardError::EpicNotFound(_) => "epic_not_found",
            StewardError::EpicExists(_) => "epic_exists",
            StewardError::TaskNotFound(_) => "task_not_found",
            StewardError::TaskExists(_) => "task_exists",
            StewardError::DependencyCycle(_) => "dependency_cycle",
            StewardError::UnknownDependency { .. } => "unknown_dependency",
            StewardError::CrossEpicDependency { .. } => "cross_epic_dependency",
            StewardError::MissingEvidence(_) => "missing_evidence",
            StewardError::InvalidTransition { .. } => "invalid_transition",
            StewardError::ClaimConflict { .. } => "claim_conflict",
            StewardError::TaskNotReady { .. } => "task_not_ready",
            StewardError::EpicOpenTasks { .. } => "epic_open_tasks",
            StewardError::GateNotShip { .. } => "gate_not_ship",
            StewardError::GateRefused { .. } => "gate_refused",
            StewardError::LockContention(_) => "lock_contention",
            StewardError::CorruptRecord { .. } => "corrupt_record",
            StewardError::NoActiveRun => "no_active_run",
            StewardError::RunNotFound(_) => "run_not_found",
            StewardError::AmbiguousRun(_) => "ambiguous_run",
            StewardError::Worker(_) => "worker_failed",
            StewardError::Io(_) => "io",
            StewardError::Yaml(_) => "yaml",
            StewardError::Json(_) => "json",
        }
    }

    /// True for errors the caller is expected to retry after acting on the
    /// message: lock contention and unsatisfied review gates. Everything else
    /// is a final rejection for that invocation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StewardError::LockContention(_) | StewardError::GateRefused { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StewardError>;
