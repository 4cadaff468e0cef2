use crate::output::print_json;
use std::path::Path;
use steward_core::selector::{self, Directive, IdleReason};
use steward_core::store::StateStore;

pub fn run(
    root: &Path,
    state: Option<&Path>,
    epic: Option<&str>,
    actor: Option<&str>,
    require_plan: bool,
    require_completion: bool,
    json: bool,
) -> anyhow::Result<()> {
    let (ws, store) = super::open(root, state)?;
    let scope = epic.map(super::parse_epic).transpose()?;
    let actor = super::resolve_actor(actor);
    let gates = super::gate_requirements(&ws, require_plan, require_completion);

    let snapshot = store.snapshot()?;
    let directive = selector::select(&snapshot, scope, &actor, gates)?;

    if json {
        return print_json(&directive);
    }
    match &directive {
        Directive::Plan { epic, title } => {
            println!("Plan {epic}: {title}");
            println!("Write or revise the plan, then get a plan review shipped.");
        }
        Directive::Implement { task, epic, title } => {
            println!("Implement {task} ({epic}): {title}");
            println!("Claim it with `steward task start {task}`.");
        }
        Directive::CompletionReview { epic, title } => {
            println!("Completion review for {epic}: {title}");
            println!("All tasks are done; get a completion review shipped.");
        }
        Directive::Idle { reason } => match reason {
            IdleReason::BlockedByEpicDeps { epic, unresolved } => {
                let deps: Vec<String> = unresolved.iter().map(|d| d.to_string()).collect();
                println!("Idle: {epic} waits on {}", deps.join(", "));
            }
            IdleReason::InProgress { tasks } => {
                let ids: Vec<String> = tasks.iter().map(|t| t.to_string()).collect();
                println!("Idle: work in flight ({})", ids.join(", "));
            }
            IdleReason::Blocked { tasks } => {
                let ids: Vec<String> = tasks.iter().map(|t| t.to_string()).collect();
                println!("Idle: remaining tasks are blocked ({})", ids.join(", "));
            }
            IdleReason::AllDone => println!("Idle: everything is done."),
        },
    }
    Ok(())
}
