use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use std::process::{Command, Stdio};
use steward_core::config::ReviewBackend;
use steward_core::ids::EntityId;
use steward_core::receipt::{self, Receipt};
use steward_core::types::{ReviewKind, ReviewStatus};
use steward_core::{ops, StewardError};

/// Environment variables handed to command review backends.
pub const REVIEW_KIND_ENV: &str = "STEWARD_REVIEW_KIND";
pub const REVIEW_SUBJECT_ENV: &str = "STEWARD_REVIEW_SUBJECT";

#[derive(Subcommand)]
pub enum ReviewSubcommand {
    /// Record a review receipt directly (for external reviewers)
    Receipt {
        /// Review kind: plan, implementation, or completion
        kind: String,
        /// Subject id (epic for plan/completion, task for implementation)
        subject: String,
        /// Which backend or collaborator produced the receipt
        #[arg(long, default_value = "manual")]
        mode: String,
    },
    /// Apply a review verdict to an epic (requires a receipt)
    Set {
        /// Epic id
        subject: String,
        /// Review kind: plan or completion
        #[arg(long)]
        kind: String,
        /// ship, needs_work, or major_rethink
        #[arg(long)]
        verdict: String,
    },
    /// Drive the configured backend end-to-end: run, parse, receipt, apply
    Run {
        /// Review kind: plan, implementation, or completion
        kind: String,
        /// Subject id (epic for plan/completion, task for implementation)
        subject: String,
    },
}

pub fn run(
    root: &Path,
    state: Option<&Path>,
    subcmd: ReviewSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let (ws, store) = super::open(root, state)?;
    match subcmd {
        ReviewSubcommand::Receipt {
            kind,
            subject,
            mode,
        } => {
            let kind: ReviewKind = kind.parse()?;
            check_subject(kind, &subject)?;
            let receipt = Receipt::new(kind, subject, mode);
            receipt::write(store.state_dir(), &receipt)?;
            if json {
                print_json(&receipt)?;
            } else {
                println!("Recorded {} receipt for {}", receipt.kind, receipt.id);
            }
            Ok(())
        }
        ReviewSubcommand::Set {
            subject,
            kind,
            verdict,
        } => {
            let kind: ReviewKind = kind.parse()?;
            let verdict: ReviewStatus = verdict.parse()?;
            let epic = super::parse_epic(&subject)?;
            let epic = ops::set_epic_review(&store, epic, kind, verdict)?;
            if json {
                print_json(&epic)?;
            } else {
                println!("Recorded {kind} review of {}: {verdict}", epic.id);
            }
            Ok(())
        }
        ReviewSubcommand::Run { kind, subject } => {
            let kind: ReviewKind = kind.parse()?;
            check_subject(kind, &subject)?;
            let backend = ws.config().reviews.backend_for(kind);
            let command = match backend {
                ReviewBackend::Command { command } => command.clone(),
                ReviewBackend::Manual => anyhow::bail!(
                    "the {kind} review backend is manual: run the review yourself, \
                     then `steward review receipt {kind} {subject}` and, for epic \
                     reviews, `steward review set {subject} --kind {kind} --verdict <v>`"
                ),
            };

            let verdict = run_backend(&command, kind, &subject, ws.root())?;
            // implementation receipts directly unlock `task done`, so only a
            // shipped verdict may produce one
            if kind == ReviewKind::Implementation && !verdict.is_ship() {
                anyhow::bail!(
                    "implementation review of {subject} returned {verdict}; no receipt recorded"
                );
            }
            receipt::write(
                store.state_dir(),
                &Receipt::new(kind, subject.clone(), "command"),
            )?;
            let applied = match kind {
                ReviewKind::Plan | ReviewKind::Completion => {
                    let epic = super::parse_epic(&subject)?;
                    Some(ops::set_epic_review(&store, epic, kind, verdict)?)
                }
                ReviewKind::Implementation => None,
            };

            if json {
                print_json(&serde_json::json!({
                    "kind": kind.to_string(),
                    "subject": subject,
                    "verdict": verdict.to_string(),
                    "applied": applied.is_some(),
                }))?;
            } else {
                println!("{kind} review of {subject}: {verdict}");
                if applied.is_none() {
                    println!("Receipt recorded; complete the task to consume it.");
                }
            }
            Ok(())
        }
    }
}

/// Plan and completion reviews name an epic; implementation reviews name a
/// task.
fn check_subject(kind: ReviewKind, subject: &str) -> anyhow::Result<()> {
    let entity = super::parse_entity(subject)?;
    match (kind, entity) {
        (ReviewKind::Implementation, EntityId::Task(_)) => Ok(()),
        (ReviewKind::Implementation, EntityId::Epic(_)) => Err(StewardError::InvalidId(format!(
            "implementation reviews apply to tasks, not {subject}"
        ))
        .into()),
        (_, EntityId::Epic(_)) => Ok(()),
        (_, EntityId::Task(_)) => Err(StewardError::InvalidId(format!(
            "{kind} reviews apply to epics, not {subject}"
        ))
        .into()),
    }
}

/// Shell out to the backend, inheriting stderr for live log flow, and parse
/// the verdict from captured stdout.
fn run_backend(
    command: &str,
    kind: ReviewKind,
    subject: &str,
    root: &Path,
) -> anyhow::Result<ReviewStatus> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .env(REVIEW_KIND_ENV, kind.as_str())
        .env(REVIEW_SUBJECT_ENV, subject)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("failed to run review backend: {command}"))?;
    if !output.status.success() {
        anyhow::bail!("review backend exited with {}", output.status);
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    receipt::parse_verdict(&stdout).ok_or_else(|| {
        anyhow::anyhow!("review backend printed no `verdict:` line for {kind} of {subject}")
    })
}
