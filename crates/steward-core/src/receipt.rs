//! Review receipts: proof that an external review actually happened.
//!
//! A receipt's existence with the required fields is the proof; its content
//! carries no verdict. The gate refuses when the receipt is absent,
//! unreadable, or names a different subject, and the caller must obtain a
//! valid receipt and retry. There is no bypass path.

use crate::error::{Result, StewardError};
use crate::paths;
use crate::types::{ReviewKind, ReviewStatus};
use crate::io;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(rename = "type")]
    pub kind: ReviewKind,
    pub id: String,
    /// Which backend produced the receipt.
    pub mode: String,
    pub timestamp: DateTime<Utc>,
}

impl Receipt {
    pub fn new(kind: ReviewKind, subject: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            kind,
            id: subject.into(),
            mode: mode.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Record a receipt at its well-known path.
pub fn write(state: &Path, receipt: &Receipt) -> Result<()> {
    io::write_json(&paths::receipt_path(state, receipt.kind, &receipt.id), receipt)
}

/// Gate check: the receipt for (kind, subject) must exist and be well-formed.
pub fn require(state: &Path, kind: ReviewKind, subject: &str) -> Result<Receipt> {
    let path = paths::receipt_path(state, kind, subject);
    let refused = |reason: String| StewardError::GateRefused {
        kind: kind.to_string(),
        subject: subject.to_string(),
        reason,
    };
    if !path.exists() {
        return Err(refused(format!("no receipt at {}", path.display())));
    }
    let content = std::fs::read_to_string(&path)?;
    let receipt: Receipt = serde_json::from_str(&content)
        .map_err(|e| refused(format!("receipt is malformed: {e}")))?;
    if receipt.kind != kind || receipt.id != subject {
        return Err(refused(format!(
            "receipt names {} review of {}, expected {} of {}",
            receipt.kind, receipt.id, kind, subject
        )));
    }
    Ok(receipt)
}

/// Delete a consumed receipt. Safe to call again after a crash between the
/// state write and the delete.
pub fn consume(state: &Path, kind: ReviewKind, subject: &str) -> Result<()> {
    match std::fs::remove_file(paths::receipt_path(state, kind, subject)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Extract the verdict from review-backend output. The last `verdict:` line
/// wins, so chatty backends may think aloud before answering; an
/// unparseable token on that line yields no verdict at all.
pub fn parse_verdict(output: &str) -> Option<ReviewStatus> {
    let token = output
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("verdict:"))?;
    token.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
