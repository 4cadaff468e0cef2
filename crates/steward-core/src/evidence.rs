use crate::error::{Result, StewardError};
use serde::{Deserialize, Serialize};

/// Proof of work attached when a task is completed. Immutable while the task
/// stays `done`; cleared only by a reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Commit shas or refs. At least one is required.
    pub commits: Vec<String>,
    /// Test commands that were run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prs: Vec<String>,
    pub summary: String,
}

impl Evidence {
    pub fn validate(&self) -> Result<()> {
        if self.commits.is_empty() {
            return Err(StewardError::MissingEvidence(
                "at least one commit is required".to_string(),
            ));
        }
        if self.commits.iter().any(|c| c.trim().is_empty()) {
            return Err(StewardError::MissingEvidence(
                "commit entries must not be blank".to_string(),
            ));
        }
        if self.summary.trim().is_empty() {
            return Err(StewardError::MissingEvidence(
                "summary must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
