use crate::output::{print_json, print_table};
use std::path::Path;
use steward_core::runctl::{self, RunRecord};
use steward_core::StewardError;

pub fn pause(root: &Path, state: Option<&Path>, run: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (_ws, store) = super::open(root, state)?;
    let state = store.state_dir();
    let record = active_target(state, run)?;
    runctl::request_pause(state, &record.run_id)?;
    if json {
        print_json(&serde_json::json!({ "run_id": record.run_id, "paused": true }))?;
    } else {
        println!(
            "Paused run {}; it will idle at the next iteration boundary",
            record.run_id
        );
    }
    Ok(())
}

pub fn resume(root: &Path, state: Option<&Path>, run: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (_ws, store) = super::open(root, state)?;
    let state = store.state_dir();
    let record = runctl::resolve_run(state, run)?;
    let was_paused = runctl::clear_pause(state, &record.run_id)?;
    if json {
        print_json(&serde_json::json!({ "run_id": record.run_id, "resumed": was_paused }))?;
    } else if was_paused {
        println!("Resumed run {}", record.run_id);
    } else {
        println!("Run {} was not paused", record.run_id);
    }
    Ok(())
}

pub fn stop(root: &Path, state: Option<&Path>, run: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (_ws, store) = super::open(root, state)?;
    let state = store.state_dir();
    let record = active_target(state, run)?;
    runctl::request_stop(state, &record.run_id)?;
    if json {
        print_json(&serde_json::json!({ "run_id": record.run_id, "stop_requested": true }))?;
    } else {
        println!(
            "Stop requested for run {}; it will exit at the next iteration boundary",
            record.run_id
        );
    }
    Ok(())
}

pub fn status(root: &Path, state: Option<&Path>, run: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (_ws, store) = super::open(root, state)?;
    let state = store.state_dir();

    // an explicit id or a single active run gets the detailed view; with
    // nothing active, fall back to listing what ran before
    let record = match runctl::resolve_run(state, run) {
        Ok(record) => record,
        Err(StewardError::NoActiveRun) => {
            let runs = runctl::list_runs(state)?;
            if json {
                let items: Vec<_> = runs
                    .iter()
                    .map(|r| status_payload(state, r))
                    .collect::<anyhow::Result<_>>()?;
                return print_json(&serde_json::json!({ "active": false, "runs": items }));
            }
            if runs.is_empty() {
                println!("No runs recorded.");
                return Ok(());
            }
            println!("No active runs.");
            let rows: Vec<Vec<String>> = runs
                .iter()
                .map(|r| {
                    let reason = runctl::exit_reason(state, &r.run_id)
                        .unwrap_or(None)
                        .map(|x| x.token().to_string())
                        .unwrap_or_else(|| "?".to_string());
                    vec![
                        r.run_id.clone(),
                        reason,
                        r.iterations.to_string(),
                        r.started_at.format("%Y-%m-%d %H:%M").to_string(),
                    ]
                })
                .collect();
            print_table(&["RUN", "EXIT", "ITER", "STARTED"], rows);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&status_payload(state, &record)?);
    }
    let active = runctl::is_active(state, &record.run_id)?;
    println!("Run: {}", record.run_id);
    println!("Actor:      {}", record.actor);
    println!(
        "Scope:      {}",
        record
            .scope
            .map(|s| s.to_string())
            .unwrap_or_else(|| "(all)".to_string())
    );
    let status = if !active {
        let reason = runctl::exit_reason(state, &record.run_id)?
            .map(|x| x.token().to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("finished ({reason})")
    } else if runctl::pause_requested(state, &record.run_id) {
        "paused".to_string()
    } else {
        "active".to_string()
    };
    println!("Status:     {status}");
    println!("Iterations: {}", record.iterations);
    println!("Failures:   {}", record.worker_failures);
    println!("Started:    {}", record.started_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

/// Pause and stop only make sense against a run that can still react.
fn active_target(state: &Path, run: Option<&str>) -> anyhow::Result<RunRecord> {
    let record = runctl::resolve_run(state, run)?;
    if !runctl::is_active(state, &record.run_id)? {
        anyhow::bail!("run {} already finished", record.run_id);
    }
    Ok(record)
}

fn status_payload(state: &Path, record: &RunRecord) -> anyhow::Result<serde_json::Value> {
    let active = runctl::is_active(state, &record.run_id)?;
    Ok(serde_json::json!({
        "run_id": record.run_id,
        "actor": record.actor,
        "scope": record.scope.map(|s| s.to_string()),
        "active": active,
        "exit_reason": runctl::exit_reason(state, &record.run_id)?.map(|x| x.token()),
        "paused": runctl::pause_requested(state, &record.run_id),
        "stop_requested": runctl::stop_requested(state, &record.run_id),
        "iterations": record.iterations,
        "worker_failures": record.worker_failures,
        "started_at": record.started_at,
        "updated_at": record.updated_at,
    }))
}
