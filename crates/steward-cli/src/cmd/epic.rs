use crate::output::{print_json, print_table};
use clap::Subcommand;
use std::path::Path;
use steward_core::{ops, store::StateStore, types::TaskStatus};

#[derive(Subcommand)]
pub enum EpicSubcommand {
    /// Create a new epic
    Create {
        #[arg(required = true)]
        title: Vec<String>,
        /// Branch the epic's work lands on
        #[arg(long)]
        branch: Option<String>,
        /// Free-form spec reference (path, URL, ticket)
        #[arg(long)]
        spec: Option<String>,
        /// Comma-separated epic ids this epic waits on (e.g. E1,E2)
        #[arg(long)]
        depends: Option<String>,
    },
    /// Show one epic with its review state
    Show { id: String },
    /// List all epics with task progress
    List,
    /// Close an epic whose tasks are all done
    Close {
        id: String,
        /// Demand a shipped completion review even if config does not
        #[arg(long)]
        require_review: bool,
    },
}

pub fn run(
    root: &Path,
    state: Option<&Path>,
    subcmd: EpicSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let (ws, store) = super::open(root, state)?;
    match subcmd {
        EpicSubcommand::Create {
            title,
            branch,
            spec,
            depends,
        } => {
            let depends_on_epics = depends
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(super::parse_epic)
                .collect::<anyhow::Result<Vec<_>>>()?;
            let epic = ops::create_epic(
                &store,
                ops::NewEpic {
                    title: title.join(" "),
                    branch_name: branch,
                    spec,
                    depends_on_epics,
                },
            )?;
            if json {
                print_json(&epic)?;
            } else {
                println!("Created epic {}: {}", epic.id, epic.title);
            }
            Ok(())
        }
        EpicSubcommand::Show { id } => {
            let id = super::parse_epic(&id)?;
            let epic = store.load_epic(id)?;
            if json {
                return print_json(&epic);
            }
            println!("Epic: {} — {}", epic.id, epic.title);
            println!("Status:      {}", epic.status);
            if let Some(branch) = &epic.branch_name {
                println!("Branch:      {branch}");
            }
            if let Some(spec) = &epic.spec {
                println!("Spec:        {spec}");
            }
            if !epic.depends_on_epics.is_empty() {
                let deps: Vec<String> =
                    epic.depends_on_epics.iter().map(|d| d.to_string()).collect();
                println!("Depends:     {}", deps.join(", "));
            }
            println!("Plan review: {}", epic.plan_review_status);
            println!("Completion:  {}", epic.completion_review_status);
            let tasks: Vec<_> = store
                .list_task_ids(id)?
                .into_iter()
                .map(|tid| store.load_task(tid))
                .collect::<steward_core::Result<_>>()?;
            let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
            println!("Tasks:       {done}/{} done", tasks.len());
            Ok(())
        }
        EpicSubcommand::List => {
            let snapshot = store.snapshot()?;
            if json {
                return print_json(&snapshot);
            }
            if snapshot.epics.is_empty() {
                println!("No epics yet. Create one with `steward epic create`.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = snapshot
                .epics
                .iter()
                .map(|e| {
                    let total = snapshot.tasks_of(e.id).count();
                    let done = snapshot
                        .tasks_of(e.id)
                        .filter(|t| t.status == TaskStatus::Done)
                        .count();
                    vec![
                        e.id.to_string(),
                        e.status.to_string(),
                        format!("{done}/{total}"),
                        e.plan_review_status.to_string(),
                        e.completion_review_status.to_string(),
                        e.title.clone(),
                    ]
                })
                .collect();
            print_table(
                &["ID", "STATUS", "TASKS", "PLAN", "COMPLETION", "TITLE"],
                rows,
            );
            Ok(())
        }
        EpicSubcommand::Close { id, require_review } => {
            let id = super::parse_epic(&id)?;
            let gate = require_review || ws.config().reviews.require_completion;
            let epic = ops::close_epic(&store, id, gate)?;
            if json {
                print_json(&epic)?;
            } else {
                println!("Closed epic {}", epic.id);
            }
            Ok(())
        }
    }
}
