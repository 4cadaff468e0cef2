use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use steward_core::{config::WarnLevel, paths, workspace::Workspace};

pub fn run(root: &Path, state: Option<&Path>, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });

    let config_existed = paths::config_path(root).exists();
    let ws = Workspace::init_with(root, &project_name, state)
        .with_context(|| format!("failed to initialize {}", root.display()))?;

    if json {
        return print_json(&serde_json::json!({
            "root": ws.root(),
            "state_dir": ws.state_dir(),
            "config": paths::config_path(root),
            "created": !config_existed,
        }));
    }

    println!("Initialized steward in: {}", root.display());
    if config_existed {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        println!("  created: {}", paths::CONFIG_FILE);
    }
    println!("  epics:   {}", paths::EPICS_DIR);
    println!("  state:   {}", ws.state_dir().display());

    for w in ws.config().validate() {
        let prefix = match w.level {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "error",
        };
        println!("  {prefix}: {}", w.message);
    }
    Ok(())
}
