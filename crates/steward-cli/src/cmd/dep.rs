use crate::output::print_json;
use clap::Subcommand;
use std::path::Path;
use steward_core::ops;

#[derive(Subcommand)]
pub enum DepSubcommand {
    /// Add a dependency edge (task->task within an epic, or epic->epic)
    Add { from: String, to: String },
    /// Remove a dependency edge
    Remove { from: String, to: String },
    /// Audit the whole graph for cycles and dangling references
    Validate,
}

pub fn run(
    root: &Path,
    state: Option<&Path>,
    subcmd: DepSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let (_ws, store) = super::open(root, state)?;
    match subcmd {
        DepSubcommand::Add { from, to } => {
            let from = super::parse_entity(&from)?;
            let to = super::parse_entity(&to)?;
            ops::add_dependency(&store, from, to)?;
            if json {
                print_json(&serde_json::json!({ "from": from.to_string(), "to": to.to_string() }))?;
            } else {
                println!("{from} now depends on {to}");
            }
            Ok(())
        }
        DepSubcommand::Remove { from, to } => {
            let from = super::parse_entity(&from)?;
            let to = super::parse_entity(&to)?;
            let removed = ops::remove_dependency(&store, from, to)?;
            if json {
                print_json(&serde_json::json!({
                    "from": from.to_string(),
                    "to": to.to_string(),
                    "removed": removed,
                }))?;
            } else if removed {
                println!("{from} no longer depends on {to}");
            } else {
                println!("{from} did not depend on {to}");
            }
            Ok(())
        }
        DepSubcommand::Validate => {
            let issues = ops::validate_graph(&store)?;
            if json {
                print_json(&serde_json::json!({ "issues": issues }))?;
            } else if issues.is_empty() {
                println!("Dependency graph is sound.");
            } else {
                for issue in &issues {
                    println!("issue: {issue}");
                }
            }
            if !issues.is_empty() {
                anyhow::bail!("{} dependency issue(s) found", issues.len());
            }
            Ok(())
        }
    }
}
