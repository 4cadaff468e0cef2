use crate::error::{Result, StewardError};
use crate::paths;
use crate::types::ReviewKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ReviewBackend
// ---------------------------------------------------------------------------

/// How a review of a given kind is performed. `command` shells out and parses
/// the verdict from stdout; `manual` refuses automation and expects a human
/// to record the receipt and verdict explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewBackend {
    Command { command: String },
    Manual,
}

// ---------------------------------------------------------------------------
// ReviewsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewsConfig {
    #[serde(default = "default_review_backend")]
    pub default: ReviewBackend,
    /// Per-kind overrides, keyed by review kind ("plan", "implementation",
    /// "completion").
    #[serde(default)]
    pub backends: HashMap<String, ReviewBackend>,
    /// Selector default: demand a shipped plan review before offering task
    /// work in an epic. The `next`/`run` flags can force this on per call.
    #[serde(default)]
    pub require_plan: bool,
    /// Selector default: demand a shipped completion review before an epic
    /// counts as closable.
    #[serde(default)]
    pub require_completion: bool,
    /// When true, `task done` requires an implementation receipt.
    #[serde(default)]
    pub implementation: bool,
}

fn default_review_backend() -> ReviewBackend {
    ReviewBackend::Manual
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self {
            default: default_review_backend(),
            backends: HashMap::new(),
            require_plan: false,
            require_completion: false,
            implementation: false,
        }
    }
}

impl ReviewsConfig {
    pub fn backend_for(&self, kind: ReviewKind) -> &ReviewBackend {
        self.backends.get(kind.as_str()).unwrap_or(&self.default)
    }
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Worker argv. Empty means `run` requires an explicit `--worker`.
    #[serde(default)]
    pub worker: Vec<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 0 means no iteration cap.
    #[serde(default)]
    pub max_iterations: u32,
    #[serde(default = "default_max_worker_failures")]
    pub max_worker_failures: u32,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_worker_failures() -> u32 {
    3
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            worker: Vec::new(),
            poll_interval_ms: default_poll_interval_ms(),
            max_iterations: 0,
            max_worker_failures: default_max_worker_failures(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    /// Override for the shared runtime-state directory. Relative paths are
    /// resolved against the workspace root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub reviews: ReviewsConfig,
    #[serde(default)]
    pub run: RunConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            state_dir: None,
            reviews: ReviewsConfig::default(),
            run: RunConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(StewardError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for kind_key in self.reviews.backends.keys() {
            if kind_key.parse::<ReviewKind>().is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("unknown review kind '{kind_key}' in reviews.backends"),
                });
            }
        }

        for (kind_key, backend) in &self.reviews.backends {
            if let ReviewBackend::Command { command } = backend {
                if command.trim().is_empty() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!("review backend for '{kind_key}' has an empty command"),
                    });
                }
            }
        }

        if self.run.worker.iter().any(|a| a.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "run.worker contains an empty argv element".to_string(),
            });
        }

        if self.run.poll_interval_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "run.poll_interval_ms is 0, pause waits will busy-spin".to_string(),
            });
        }

        if self.run.max_worker_failures == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "run.max_worker_failures is 0, the first worker failure ends the run"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
