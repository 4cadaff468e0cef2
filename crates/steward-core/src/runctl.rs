//! Run directory lifecycle: run records, the append-only progress log with
//! its completion marker, and the PAUSE/STOP sentinel files.
//!
//! A run is complete exactly when its progress log contains the completion
//! marker; readers treat a missing marker as "still active". Sentinels are
//! plain files checked by the driver at iteration boundaries, so control
//! works from any working copy that shares the state dir.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StewardError};
use crate::ids::EpicId;
use crate::io::{append_line, read_json, write_json};
use crate::paths;
use crate::types::ExitReason;

/// Literal substring that marks a run's progress log as finished.
pub const COMPLETION_MARKER: &str = "RUN COMPLETE";

const EXIT_REASON_KEY: &str = "exit_reason=";

// ---------------------------------------------------------------------------
// Run record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub pid: u32,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<EpicId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub started_at: DateTime<Utc>,
    pub iterations: u32,
    pub worker_failures: u32,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new(actor: impl Into<String>, scope: Option<EpicId>, branch: Option<String>) -> Self {
        let now = Utc::now();
        RunRecord {
            run_id: Uuid::new_v4().to_string(),
            pid: std::process::id(),
            actor: actor.into(),
            scope,
            branch,
            started_at: now,
            iterations: 0,
            worker_failures: 0,
            updated_at: now,
        }
    }
}

/// Create the run directory and persist the initial record.
pub fn start_run(state: &Path, record: &RunRecord) -> Result<()> {
    save_run(state, record)?;
    log_progress(
        state,
        &record.run_id,
        &format!("run {} started by {}", record.run_id, record.actor),
    )
}

pub fn save_run(state: &Path, record: &RunRecord) -> Result<()> {
    write_json(&paths::run_record_path(state, &record.run_id), record)
}

pub fn load_run(state: &Path, run_id: &str) -> Result<RunRecord> {
    let path = paths::run_record_path(state, run_id);
    if !path.exists() {
        return Err(StewardError::RunNotFound(run_id.to_string()));
    }
    read_json(&path)
}

// ---------------------------------------------------------------------------
// Progress log & completion marker
// ---------------------------------------------------------------------------

pub fn log_progress(state: &Path, run_id: &str, message: &str) -> Result<()> {
    let line = format!("[{}] {message}", Utc::now().to_rfc3339());
    append_line(&paths::progress_log_path(state, run_id), &line)
}

/// Append the completion marker. Call exactly once per driver process, on
/// every exit path.
pub fn write_completion_marker(state: &Path, run_id: &str, reason: ExitReason) -> Result<()> {
    log_progress(
        state,
        run_id,
        &format!("{COMPLETION_MARKER} {EXIT_REASON_KEY}{}", reason.token()),
    )
}

fn marker_line(state: &Path, run_id: &str) -> Result<Option<String>> {
    let path = paths::progress_log_path(state, run_id);
    let log = match fs::read_to_string(&path) {
        Ok(log) => log,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(log
        .lines()
        .rev()
        .find(|l| l.contains(COMPLETION_MARKER))
        .map(str::to_string))
}

/// A run with no completion marker is still active, whatever its process
/// is doing.
pub fn is_active(state: &Path, run_id: &str) -> Result<bool> {
    Ok(marker_line(state, run_id)?.is_none())
}

/// Exit reason parsed from the completion marker, when one is present.
pub fn exit_reason(state: &Path, run_id: &str) -> Result<Option<ExitReason>> {
    let Some(line) = marker_line(state, run_id)? else {
        return Ok(None);
    };
    Ok(line
        .split_whitespace()
        .find_map(|tok| tok.strip_prefix(EXIT_REASON_KEY))
        .and_then(ExitReason::from_token))
}

// ---------------------------------------------------------------------------
// Sentinels
// ---------------------------------------------------------------------------

fn ensure_run_exists(state: &Path, run_id: &str) -> Result<()> {
    if paths::run_record_path(state, run_id).exists() {
        Ok(())
    } else {
        Err(StewardError::RunNotFound(run_id.to_string()))
    }
}

/// Drop the PAUSE sentinel. Idempotent.
pub fn request_pause(state: &Path, run_id: &str) -> Result<()> {
    ensure_run_exists(state, run_id)?;
    let line = format!("requested at {}", Utc::now().to_rfc3339());
    append_line(&paths::pause_path(state, run_id), &line)
}

/// Remove the PAUSE sentinel. Returns false when the run was not paused.
pub fn clear_pause(state: &Path, run_id: &str) -> Result<bool> {
    ensure_run_exists(state, run_id)?;
    match fs::remove_file(paths::pause_path(state, run_id)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Drop the STOP sentinel. Idempotent; the file is retained after the run
/// exits as a record of the request.
pub fn request_stop(state: &Path, run_id: &str) -> Result<()> {
    ensure_run_exists(state, run_id)?;
    let line = format!("requested at {}", Utc::now().to_rfc3339());
    append_line(&paths::stop_path(state, run_id), &line)
}

pub fn pause_requested(state: &Path, run_id: &str) -> bool {
    paths::pause_path(state, run_id).exists()
}

pub fn stop_requested(state: &Path, run_id: &str) -> bool {
    paths::stop_path(state, run_id).exists()
}

// ---------------------------------------------------------------------------
// Listing & disambiguation
// ---------------------------------------------------------------------------

/// All recorded runs, oldest first. Unreadable run directories are skipped.
pub fn list_runs(state: &Path) -> Result<Vec<RunRecord>> {
    let dir = paths::runs_dir(state);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut runs = Vec::new();
    for entry in entries {
        let entry = entry?;
        let Some(run_id) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if let Ok(record) = load_run(state, &run_id) {
            runs.push(record);
        }
    }
    runs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
    Ok(runs)
}

pub fn active_runs(state: &Path) -> Result<Vec<RunRecord>> {
    let mut active = Vec::new();
    for record in list_runs(state)? {
        if is_active(state, &record.run_id)? {
            active.push(record);
        }
    }
    Ok(active)
}

/// Resolve the run a control command targets: an explicit id wins, otherwise
/// exactly one active run must exist.
pub fn resolve_run(state: &Path, explicit: Option<&str>) -> Result<RunRecord> {
    if let Some(run_id) = explicit {
        return load_run(state, run_id);
    }
    let mut active = active_runs(state)?;
    match active.len() {
        0 => Err(StewardError::NoActiveRun),
        1 => Ok(active.remove(0)),
        _ => Err(StewardError::AmbiguousRun(
            active
                .iter()
                .map(|r| r.run_id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
