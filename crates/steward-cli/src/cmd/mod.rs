pub mod ctl;
pub mod dep;
pub mod epic;
pub mod init;
pub mod next;
pub mod review;
pub mod run;
pub mod task;

use anyhow::Context;
use std::path::Path;
use steward_core::ids::{EntityId, EpicId, TaskId};
use steward_core::selector::GateRequirements;
use steward_core::store::LocalStore;
use steward_core::workspace::Workspace;

/// Open the workspace and its store; the entry point for every command that
/// needs tracker state.
pub(crate) fn open(root: &Path, state: Option<&Path>) -> anyhow::Result<(Workspace, LocalStore)> {
    let ws = Workspace::open_with(root, state)
        .with_context(|| format!("failed to open workspace at {}", root.display()))?;
    let store = LocalStore::new(&ws);
    Ok((ws, store))
}

pub(crate) fn parse_epic(s: &str) -> anyhow::Result<EpicId> {
    Ok(s.parse::<EpicId>()?)
}

pub(crate) fn parse_task(s: &str) -> anyhow::Result<TaskId> {
    Ok(s.parse::<TaskId>()?)
}

pub(crate) fn parse_entity(s: &str) -> anyhow::Result<EntityId> {
    Ok(s.parse::<EntityId>()?)
}

/// Flag > `STEWARD_ACTOR` (clap env hook) > `$USER` > "local".
pub(crate) fn resolve_actor(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var("USER").ok())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

/// CLI flags OR config defaults: a gate demanded either way is enforced.
pub(crate) fn gate_requirements(ws: &Workspace, plan_flag: bool, completion_flag: bool) -> GateRequirements {
    GateRequirements {
        plan: plan_flag || ws.config().reviews.require_plan,
        completion: completion_flag || ws.config().reviews.require_completion,
    }
}
