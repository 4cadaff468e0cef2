mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    dep::DepSubcommand, epic::EpicSubcommand, review::ReviewSubcommand, task::TaskSubcommand,
};
use std::path::PathBuf;
use steward_core::StewardError;

#[derive(Parser)]
#[command(
    name = "steward",
    about = "Crash-safe epic/task tracker with reviewed, resumable autonomous runs",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .steward/ or .git)
    #[arg(long, global = true, env = "STEWARD_ROOT")]
    root: Option<PathBuf>,

    /// Shared state directory (default: derived from the git common dir)
    #[arg(long, global = true, env = "STEWARD_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize steward in the current project
    Init {
        /// Project name (default: the root directory's name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Manage epics
    Epic {
        #[command(subcommand)]
        subcommand: EpicSubcommand,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Manage dependency edges
    Dep {
        #[command(subcommand)]
        subcommand: DepSubcommand,
    },

    /// Show the next directive for an actor
    Next {
        /// Restrict selection to one epic
        #[arg(long)]
        epic: Option<String>,

        /// Acting identity (default: $USER)
        #[arg(long, env = "STEWARD_ACTOR")]
        actor: Option<String>,

        /// Demand a shipped plan review before task work
        #[arg(long)]
        require_plan_review: bool,

        /// Demand a shipped completion review before an epic rests
        #[arg(long)]
        require_completion_review: bool,
    },

    /// Review receipts, verdicts, and backends
    Review {
        #[command(subcommand)]
        subcommand: ReviewSubcommand,
    },

    /// Drive the autonomous run loop
    Run {
        /// Restrict the run to one epic
        #[arg(long)]
        epic: Option<String>,

        /// Acting identity (default: $USER)
        #[arg(long, env = "STEWARD_ACTOR")]
        actor: Option<String>,

        /// Iteration cap for this run (overrides config)
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Worker argv (overrides config), e.g. --worker my-agent --once
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        worker: Vec<String>,

        /// Demand a shipped plan review before task work
        #[arg(long)]
        require_plan_review: bool,

        /// Demand a shipped completion review before an epic rests
        #[arg(long)]
        require_completion_review: bool,
    },

    /// Pause an active run
    Pause {
        /// Run id (default: the single active run)
        #[arg(long)]
        run: Option<String>,
    },

    /// Resume a paused run
    Resume {
        /// Run id (default: the single active run)
        #[arg(long)]
        run: Option<String>,
    },

    /// Stop an active run
    Stop {
        /// Run id (default: the single active run)
        #[arg(long)]
        run: Option<String>,
    },

    /// Show run status
    Status {
        /// Run id (default: the single active run)
        #[arg(long)]
        run: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let state = cli.state_dir.as_deref();

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, state, name.as_deref(), cli.json),
        Commands::Epic { subcommand } => cmd::epic::run(&root, state, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, state, subcommand, cli.json),
        Commands::Dep { subcommand } => cmd::dep::run(&root, state, subcommand, cli.json),
        Commands::Next {
            epic,
            actor,
            require_plan_review,
            require_completion_review,
        } => cmd::next::run(
            &root,
            state,
            epic.as_deref(),
            actor.as_deref(),
            require_plan_review,
            require_completion_review,
            cli.json,
        ),
        Commands::Review { subcommand } => cmd::review::run(&root, state, subcommand, cli.json),
        Commands::Run {
            epic,
            actor,
            max_iterations,
            worker,
            require_plan_review,
            require_completion_review,
        } => cmd::run::run(
            &root,
            state,
            cmd::run::RunArgs {
                epic,
                actor,
                max_iterations,
                worker,
                require_plan_review,
                require_completion_review,
            },
            cli.json,
        ),
        Commands::Pause { run } => cmd::ctl::pause(&root, state, run.as_deref(), cli.json),
        Commands::Resume { run } => cmd::ctl::resume(&root, state, run.as_deref(), cli.json),
        Commands::Stop { run } => cmd::ctl::stop(&root, state, run.as_deref(), cli.json),
        Commands::Status { run } => cmd::ctl::status(&root, state, run.as_deref(), cli.json),
    };

    if let Err(e) = result {
        let code = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<StewardError>())
            .map(StewardError::code)
            .unwrap_or("error");
        if cli.json {
            eprintln!(
                "{}",
                serde_json::json!({ "ok": false, "code": code, "error": format!("{e:#}") })
            );
        } else {
            eprintln!("error: {e:#} ({code})");
        }
        std::process::exit(1);
    }
}
