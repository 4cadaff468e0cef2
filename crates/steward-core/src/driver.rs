//! The autonomous run loop: select a directive, hand it to a worker,
//! repeat until nothing is actionable or a sentinel says otherwise.
//!
//! Sentinels are checked at iteration boundaries only; a directive in
//! flight is never interrupted. The completion marker is written through a
//! single funnel on every exit path, so `status` can always tell a finished
//! run from a live one.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Result, StewardError};
use crate::ids::EpicId;
use crate::runctl::{self, RunRecord};
use crate::selector::{self, Directive, GateRequirements, IdleReason};
use crate::store::{LocalStore, StateStore};
use crate::types::ExitReason;

/// Environment variable carrying the directive JSON to the worker process.
pub const DIRECTIVE_ENV: &str = "STEWARD_DIRECTIVE";
/// Environment variable carrying the workspace root to the worker process.
pub const ROOT_ENV: &str = "STEWARD_ROOT";

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Executes one directive. Implementations mutate tracker state through the
/// normal command surface; the driver only observes the outcome.
pub trait Worker {
    fn execute(&mut self, directive: &Directive) -> Result<()>;
}

/// Spawns the configured worker argv once per directive. The directive JSON
/// travels in `STEWARD_DIRECTIVE`; stdout and stderr flow through to the
/// driver's terminal.
#[derive(Debug)]
pub struct CommandWorker {
    argv: Vec<String>,
    root: PathBuf,
}

impl CommandWorker {
    pub fn new(argv: Vec<String>, root: PathBuf) -> Result<Self> {
        if argv.is_empty() {
            return Err(StewardError::Worker(
                "run.worker is not configured".to_string(),
            ));
        }
        Ok(CommandWorker { argv, root })
    }
}

impl Worker for CommandWorker {
    fn execute(&mut self, directive: &Directive) -> Result<()> {
        let payload = serde_json::to_string(directive)?;
        let status = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .env(DIRECTIVE_ENV, &payload)
            .env(ROOT_ENV, &self.root)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| StewardError::Worker(format!("failed to spawn worker: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(StewardError::Worker(format!("worker exited with {status}")))
        }
    }
}

// ---------------------------------------------------------------------------
// Drive loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DriveParams {
    pub scope: Option<EpicId>,
    pub actor: String,
    pub gates: GateRequirements,
    /// 0 means uncapped.
    pub max_iterations: u32,
    /// 0 means unlimited tolerance.
    pub max_worker_failures: u32,
    pub poll_interval: Duration,
}

/// Run the loop to completion. Exactly one completion marker is appended,
/// whatever happens inside, including selector and store errors.
pub fn drive(
    store: &LocalStore,
    record: &mut RunRecord,
    worker: &mut dyn Worker,
    params: &DriveParams,
) -> Result<ExitReason> {
    let outcome = run_loop(store, record, worker, params);
    let code = match &outcome {
        Ok(reason) => *reason,
        Err(_) => ExitReason::Failed,
    };
    let state = store.state_dir();
    runctl::write_completion_marker(state, &record.run_id, code)?;
    record.updated_at = Utc::now();
    runctl::save_run(state, record)?;
    info!(run = %record.run_id, reason = code.token(), "run finished");
    outcome
}

fn run_loop(
    store: &LocalStore,
    record: &mut RunRecord,
    worker: &mut dyn Worker,
    params: &DriveParams,
) -> Result<ExitReason> {
    let state = store.state_dir().to_path_buf();
    let run_id = record.run_id.clone();
    loop {
        if runctl::stop_requested(&state, &run_id) {
            runctl::log_progress(&state, &run_id, "stop requested")?;
            return Ok(ExitReason::Stopped);
        }
        if runctl::pause_requested(&state, &run_id) {
            runctl::log_progress(&state, &run_id, "run paused")?;
            info!(run = %run_id, "run paused");
            while runctl::pause_requested(&state, &run_id) {
                // stop wins over pause
                if runctl::stop_requested(&state, &run_id) {
                    runctl::log_progress(&state, &run_id, "stop requested while paused")?;
                    return Ok(ExitReason::Stopped);
                }
                std::thread::sleep(params.poll_interval);
            }
            runctl::log_progress(&state, &run_id, "run resumed")?;
            info!(run = %run_id, "run resumed");
        }
        if params.max_iterations > 0 && record.iterations >= params.max_iterations {
            runctl::log_progress(&state, &run_id, "iteration cap reached")?;
            return Ok(ExitReason::MaxIterations);
        }

        let snapshot = store.snapshot()?;
        let directive = selector::select(&snapshot, params.scope, &params.actor, params.gates)?;
        match directive {
            Directive::Idle { reason } => {
                let detail = serde_json::to_string(&reason)?;
                runctl::log_progress(&state, &run_id, &format!("idle: {detail}"))?;
                return Ok(match reason {
                    IdleReason::AllDone => ExitReason::Done,
                    _ => ExitReason::NoWork,
                });
            }
            directive => {
                record.iterations += 1;
                record.updated_at = Utc::now();
                runctl::save_run(&state, record)?;
                runctl::log_progress(
                    &state,
                    &run_id,
                    &format!(
                        "iteration {}: {}",
                        record.iterations,
                        serde_json::to_string(&directive)?
                    ),
                )?;

                match worker.execute(&directive) {
                    Ok(()) => {
                        // the failure budget counts consecutive failures
                        if record.worker_failures > 0 {
                            record.worker_failures = 0;
                            record.updated_at = Utc::now();
                            runctl::save_run(&state, record)?;
                        }
                        runctl::log_progress(&state, &run_id, "worker completed directive")?;
                    }
                    Err(e) => {
                        record.worker_failures += 1;
                        record.updated_at = Utc::now();
                        runctl::save_run(&state, record)?;
                        runctl::log_progress(
                            &state,
                            &run_id,
                            &format!("worker failed ({}): {e}", record.worker_failures),
                        )?;
                        warn!(run = %run_id, error = %e, "worker failed");
                        if params.max_worker_failures > 0
                            && record.worker_failures >= params.max_worker_failures
                        {
                            runctl::log_progress(&state, &run_id, "worker failure cap reached")?;
                            return Ok(ExitReason::Failed);
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
