use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EpicStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpicStatus {
    Open,
    Done,
}

impl EpicStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EpicStatus::Open => "open",
            EpicStatus::Done => "done",
        }
    }
}

impl fmt::Display for EpicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReviewStatus
// ---------------------------------------------------------------------------

/// Verdict state of a review gate. Only `Ship` unblocks downstream progress;
/// `NeedsWork` and `MajorRethink` leave the entity gated until another review
/// cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Unknown,
    Ship,
    NeedsWork,
    MajorRethink,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Unknown => "unknown",
            ReviewStatus::Ship => "ship",
            ReviewStatus::NeedsWork => "needs_work",
            ReviewStatus::MajorRethink => "major_rethink",
        }
    }

    pub fn is_ship(self) -> bool {
        matches!(self, ReviewStatus::Ship)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = crate::error::StewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(ReviewStatus::Unknown),
            "ship" => Ok(ReviewStatus::Ship),
            "needs_work" | "needs-work" => Ok(ReviewStatus::NeedsWork),
            "major_rethink" | "major-rethink" => Ok(ReviewStatus::MajorRethink),
            _ => Err(crate::error::StewardError::InvalidVerdict(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ReviewKind
// ---------------------------------------------------------------------------

/// Which gate a receipt belongs to. Plan and completion reviews gate epic
/// status setters; implementation reviews gate `task done` when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    Plan,
    Implementation,
    Completion,
}

impl ReviewKind {
    pub fn all() -> &'static [ReviewKind] {
        &[
            ReviewKind::Plan,
            ReviewKind::Implementation,
            ReviewKind::Completion,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewKind::Plan => "plan",
            ReviewKind::Implementation => "implementation",
            ReviewKind::Completion => "completion",
        }
    }
}

impl fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewKind {
    type Err = crate::error::StewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan" => Ok(ReviewKind::Plan),
            "implementation" => Ok(ReviewKind::Implementation),
            "completion" => Ok(ReviewKind::Completion),
            _ => Err(crate::error::StewardError::InvalidReviewKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ExitReason
// ---------------------------------------------------------------------------

/// Why a driver run terminated. The token form is what lands next to the
/// completion marker in the progress log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Every in-scope epic is closed or closeable; nothing left to do.
    Done,
    /// Work remains but none of it is actionable right now.
    NoWork,
    /// A STOP sentinel was observed at an iteration boundary.
    Stopped,
    /// The configured iteration cap was reached.
    MaxIterations,
    /// The worker (or the loop itself) failed unrecoverably.
    Failed,
}

impl ExitReason {
    pub fn token(self) -> &'static str {
        match self {
            ExitReason::Done => "DONE",
            ExitReason::NoWork => "NO_WORK",
            ExitReason::Stopped => "STOPPED",
            ExitReason::MaxIterations => "MAX_ITERATIONS",
            ExitReason::Failed => "FAILED",
        }
    }

    pub fn from_token(s: &str) -> Option<ExitReason> {
        match s {
            "DONE" => Some(ExitReason::Done),
            "NO_WORK" => Some(ExitReason::NoWork),
            "STOPPED" => Some(ExitReason::Stopped),
            "MAX_ITERATIONS" => Some(ExitReason::MaxIterations),
            "FAILED" => Some(ExitReason::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
