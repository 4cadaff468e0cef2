use crate::output::{print_json, print_table};
use clap::Subcommand;
use std::path::Path;
use steward_core::{evidence::Evidence, ops, store::StateStore};

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Add a task to an epic
    Add {
        epic: String,
        #[arg(required = true)]
        title: Vec<String>,
        /// Scheduling priority; lower runs sooner
        #[arg(long)]
        priority: Option<u32>,
        /// Comma-separated task ids this task waits on (e.g. E1.1,E1.2)
        #[arg(long)]
        depends: Option<String>,
        /// Free-form spec reference
        #[arg(long)]
        spec: Option<String>,
    },
    /// Show full details for a single task
    Show { id: String },
    /// List tasks, optionally scoped to one epic
    List {
        #[arg(long)]
        epic: Option<String>,
    },
    /// Claim a task
    Start {
        id: String,
        /// Acting identity (default: $USER)
        #[arg(long, env = "STEWARD_ACTOR")]
        actor: Option<String>,
        /// Note recorded with the claim
        #[arg(long)]
        note: Option<String>,
        /// Take over another claim or skip the readiness check
        #[arg(long)]
        force: bool,
    },
    /// Complete a task with evidence
    Done {
        id: String,
        /// Commit hash (repeatable); at least one is required
        #[arg(long = "commit")]
        commits: Vec<String>,
        /// Test command that was run (repeatable)
        #[arg(long = "test")]
        tests: Vec<String>,
        /// Pull request reference (repeatable)
        #[arg(long = "pr")]
        prs: Vec<String>,
        /// What was done and how it was verified
        #[arg(long)]
        summary: String,
    },
    /// Mark a claimed task as blocked
    Block {
        id: String,
        #[arg(required = true)]
        reason: Vec<String>,
    },
    /// Return a task to todo, cascading through same-epic dependents
    Reset {
        id: String,
        /// Discard an in-flight claim
        #[arg(long)]
        force: bool,
    },
}

pub fn run(
    root: &Path,
    state: Option<&Path>,
    subcmd: TaskSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let (ws, store) = super::open(root, state)?;
    match subcmd {
        TaskSubcommand::Add {
            epic,
            title,
            priority,
            depends,
            spec,
        } => {
            let epic = super::parse_epic(&epic)?;
            let depends_on = depends
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(super::parse_task)
                .collect::<anyhow::Result<Vec<_>>>()?;
            let task = ops::add_task(
                &store,
                ops::NewTask {
                    epic,
                    title: title.join(" "),
                    priority,
                    depends_on,
                    spec,
                },
            )?;
            if json {
                print_json(&task)?;
            } else {
                println!("Added task {}: {}", task.id, task.title);
            }
            Ok(())
        }
        TaskSubcommand::Show { id } => {
            let id = super::parse_task(&id)?;
            let task = store.load_task(id)?;
            if json {
                return print_json(&task);
            }
            println!("Task: {} — {}", task.id, task.title);
            println!("Status:   {}", task.status);
            println!("Priority: {}", task.priority);
            if !task.depends_on.is_empty() {
                let deps: Vec<String> = task.depends_on.iter().map(|d| d.to_string()).collect();
                println!("Depends:  {}", deps.join(", "));
            }
            if let Some(assignee) = &task.assignee {
                println!("Assignee: {assignee}");
            }
            if let Some(note) = &task.claim_note {
                println!("Note:     {note}");
            }
            if let Some(reason) = &task.blocked_reason {
                println!("Blocker:  {reason}");
            }
            if let Some(evidence) = &task.evidence {
                println!("Evidence: {}", evidence.summary);
                println!("Commits:  {}", evidence.commits.join(", "));
                if !evidence.tests.is_empty() {
                    println!("Tests:    {}", evidence.tests.join(", "));
                }
            }
            Ok(())
        }
        TaskSubcommand::List { epic } => {
            let tasks = match epic {
                Some(e) => {
                    let id = super::parse_epic(&e)?;
                    store
                        .list_task_ids(id)?
                        .into_iter()
                        .map(|tid| store.load_task(tid))
                        .collect::<steward_core::Result<Vec<_>>>()?
                }
                None => store.snapshot()?.tasks,
            };
            if json {
                return print_json(&tasks);
            }
            if tasks.is_empty() {
                println!("No tasks.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = tasks
                .iter()
                .map(|t| {
                    vec![
                        t.id.to_string(),
                        t.status.to_string(),
                        t.priority.to_string(),
                        t.assignee.clone().unwrap_or_default(),
                        t.title.clone(),
                    ]
                })
                .collect();
            print_table(&["ID", "STATUS", "PRIORITY", "ASSIGNEE", "TITLE"], rows);
            Ok(())
        }
        TaskSubcommand::Start {
            id,
            actor,
            note,
            force,
        } => {
            let id = super::parse_task(&id)?;
            let actor = super::resolve_actor(actor.as_deref());
            let task = ops::start_task(&store, id, &actor, note, force)?;
            if json {
                print_json(&task)?;
            } else {
                println!("Started {} as {actor}", task.id);
            }
            Ok(())
        }
        TaskSubcommand::Done {
            id,
            commits,
            tests,
            prs,
            summary,
        } => {
            let id = super::parse_task(&id)?;
            let evidence = Evidence {
                commits,
                tests,
                prs,
                summary,
            };
            let require_receipt = ws.config().reviews.implementation;
            let task = ops::complete_task(&store, id, evidence, require_receipt)?;
            if json {
                print_json(&task)?;
            } else {
                println!("Completed {}", task.id);
            }
            Ok(())
        }
        TaskSubcommand::Block { id, reason } => {
            let id = super::parse_task(&id)?;
            let task = ops::block_task(&store, id, &reason.join(" "))?;
            if json {
                print_json(&task)?;
            } else {
                println!(
                    "Blocked {}: {}",
                    task.id,
                    task.blocked_reason.as_deref().unwrap_or_default()
                );
            }
            Ok(())
        }
        TaskSubcommand::Reset { id, force } => {
            let id = super::parse_task(&id)?;
            let outcome = ops::reset_task(&store, id, force)?;
            if json {
                print_json(&outcome)?;
            } else {
                println!("Reset {}", outcome.task.id);
                if !outcome.cascaded.is_empty() {
                    let ids: Vec<String> =
                        outcome.cascaded.iter().map(|t| t.to_string()).collect();
                    println!("Cascaded to: {}", ids.join(", "));
                }
                if !outcome.skipped_in_progress.is_empty() {
                    let ids: Vec<String> = outcome
                        .skipped_in_progress
                        .iter()
                        .map(|t| t.to_string())
                        .collect();
                    println!("Left in progress: {}", ids.join(", "));
                }
            }
            Ok(())
        }
    }
}
