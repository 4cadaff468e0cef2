use crate::output::print_json;
use std::path::Path;
use std::time::Duration;
use steward_core::driver::{self, CommandWorker, DriveParams};
use steward_core::runctl::{self, RunRecord};
use steward_core::store::StateStore;
use steward_core::types::ExitReason;
use steward_core::StewardError;

pub struct RunArgs {
    pub epic: Option<String>,
    pub actor: Option<String>,
    pub max_iterations: Option<u32>,
    pub worker: Vec<String>,
    pub require_plan_review: bool,
    pub require_completion_review: bool,
}

pub fn run(root: &Path, state: Option<&Path>, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let (ws, store) = super::open(root, state)?;
    let scope = args.epic.as_deref().map(super::parse_epic).transpose()?;
    let actor = super::resolve_actor(args.actor.as_deref());
    let gates = super::gate_requirements(&ws, args.require_plan_review, args.require_completion_review);

    let argv = if args.worker.is_empty() {
        ws.config().run.worker.clone()
    } else {
        args.worker
    };
    if argv.is_empty() {
        anyhow::bail!(
            "no worker configured: set run.worker in .steward/config.yaml or pass --worker"
        );
    }

    let branch = match scope {
        Some(id) => store.load_epic(id)?.branch_name,
        None => None,
    };
    let params = DriveParams {
        scope,
        actor: actor.clone(),
        gates,
        max_iterations: args
            .max_iterations
            .unwrap_or(ws.config().run.max_iterations),
        max_worker_failures: ws.config().run.max_worker_failures,
        poll_interval: Duration::from_millis(ws.config().run.poll_interval_ms),
    };

    let mut record = RunRecord::new(actor, scope, branch);
    runctl::start_run(store.state_dir(), &record)?;
    if !json {
        println!("Run {} started", record.run_id);
    }

    let mut worker = CommandWorker::new(argv, ws.root().to_path_buf())?;
    let reason = driver::drive(&store, &mut record, &mut worker, &params)?;

    if reason == ExitReason::Failed {
        return Err(StewardError::Worker(format!(
            "run {} ended with FAILED after {} worker failure(s)",
            record.run_id, record.worker_failures
        ))
        .into());
    }
    if json {
        print_json(&serde_json::json!({
            "run_id": record.run_id,
            "exit_reason": reason.token(),
            "iterations": record.iterations,
            "worker_failures": record.worker_failures,
        }))?;
    } else {
        println!(
            "Run {} finished: {} ({} iteration(s), {} worker failure(s))",
            record.run_id,
            reason.token(),
            record.iterations,
            record.worker_failures
        );
    }
    Ok(())
}
