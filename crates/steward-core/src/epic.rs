use crate::error::{Result, StewardError};
use crate::ids::EpicId;
use crate::types::{EpicStatus, ReviewKind, ReviewStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Definition (versioned) and runtime (shared state)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicDef {
    pub id: EpicId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    /// Epic ids that must be `done` before this epic's tasks are offered.
    /// Kept sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on_epics: Vec<EpicId>,
    pub created_at: DateTime<Utc>,
    /// Honored only when no runtime record exists; never written back.
    #[serde(default, rename = "status", skip_serializing)]
    pub legacy_status: Option<EpicStatus>,
}

impl EpicDef {
    pub fn new(id: EpicId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            branch_name: None,
            spec: None,
            depends_on_epics: Vec::new(),
            created_at: Utc::now(),
            legacy_status: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicRuntime {
    pub status: EpicStatus,
    #[serde(default)]
    pub plan_review_status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_review_status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl EpicRuntime {
    pub fn new() -> Self {
        Self {
            status: EpicStatus::Open,
            plan_review_status: ReviewStatus::Unknown,
            plan_reviewed_at: None,
            completion_review_status: ReviewStatus::Unknown,
            completion_reviewed_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn synthesize(def: &EpicDef) -> Self {
        Self {
            status: def.legacy_status.unwrap_or(EpicStatus::Open),
            ..Self::new()
        }
    }
}

impl Default for EpicRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Merged view handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Epic {
    pub id: EpicId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on_epics: Vec<EpicId>,
    pub created_at: DateTime<Utc>,
    pub status: EpicStatus,
    pub plan_review_status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_reviewed_at: Option<DateTime<Utc>>,
    pub completion_review_status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Epic {
    pub fn merge(def: EpicDef, runtime: EpicRuntime) -> Self {
        Self {
            id: def.id,
            title: def.title,
            branch_name: def.branch_name,
            spec: def.spec,
            depends_on_epics: def.depends_on_epics,
            created_at: def.created_at,
            status: runtime.status,
            plan_review_status: runtime.plan_review_status,
            plan_reviewed_at: runtime.plan_reviewed_at,
            completion_review_status: runtime.completion_review_status,
            completion_reviewed_at: runtime.completion_reviewed_at,
            updated_at: runtime.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Transitions (pure; the store applies them under the entity lock)
// ---------------------------------------------------------------------------

/// Close an epic. `open_tasks` is the count of owned tasks not yet `done`;
/// the completion gate applies when configured for this call.
pub fn close(
    rt: &mut EpicRuntime,
    id: EpicId,
    open_tasks: usize,
    require_completion_gate: bool,
) -> Result<()> {
    if rt.status == EpicStatus::Done {
        return Err(StewardError::InvalidTransition {
            id: id.to_string(),
            from: EpicStatus::Done.as_str().to_string(),
            to: EpicStatus::Done.as_str().to_string(),
            reason: "epic is already closed".to_string(),
        });
    }
    if open_tasks > 0 {
        return Err(StewardError::EpicOpenTasks {
            epic: id.to_string(),
            open: open_tasks,
        });
    }
    if require_completion_gate && !rt.completion_review_status.is_ship() {
        return Err(StewardError::GateNotShip {
            epic: id.to_string(),
            status: rt.completion_review_status.as_str().to_string(),
        });
    }
    rt.status = EpicStatus::Done;
    rt.updated_at = Utc::now();
    Ok(())
}

/// Record a review verdict on the epic's runtime. Implementation reviews
/// attach to tasks, not epics.
pub fn apply_review(rt: &mut EpicRuntime, kind: ReviewKind, verdict: ReviewStatus) -> Result<()> {
    let now = Utc::now();
    match kind {
        ReviewKind::Plan => {
            rt.plan_review_status = verdict;
            rt.plan_reviewed_at = Some(now);
        }
        ReviewKind::Completion => {
            rt.completion_review_status = verdict;
            rt.completion_reviewed_at = Some(now);
        }
        ReviewKind::Implementation => {
            return Err(StewardError::InvalidReviewKind(
                "implementation reviews apply to tasks".to_string(),
            ));
        }
    }
    rt.updated_at = now;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn eid() -> EpicId {
        "E1".parse().unwrap()
    }

    #[test]
    fn close_with_open_tasks_rejected() {
        let mut rt = EpicRuntime::new();
        let err = close(&mut rt, eid(), 2, false).unwrap_err();
        assert_eq!(err.code(), "epic_open_tasks");
        assert_eq!(rt.status, EpicStatus::Open);
    }

    #[test]
    fn close_without_gate() {
        let mut rt = EpicRuntime::new();
        close(&mut rt, eid(), 0, false).unwrap();
        assert_eq!(rt.status, EpicStatus::Done);
    }

    #[test]
    fn close_gated_until_ship() {
        let mut rt = EpicRuntime::new();
        let err = close(&mut rt, eid(), 0, true).unwrap_err();
        assert_eq!(err.code(), "gate_not_ship");

        apply_review(&mut rt, ReviewKind::Completion, ReviewStatus::NeedsWork).unwrap();
        let err = close(&mut rt, eid(), 0, true).unwrap_err();
        assert_eq!(err.code(), "gate_not_ship");
        assert!(err.to_string().contains("needs_work"));

        apply_review(&mut rt, ReviewKind::Completion, ReviewStatus::Ship).unwrap();
        close(&mut rt, eid(), 0, true).unwrap();
        assert_eq!(rt.status, EpicStatus::Done);
    }

    #[test]
    fn double_close_rejected() {
        let mut rt = EpicRuntime::new();
        close(&mut rt, eid(), 0, false).unwrap();
        let err = close(&mut rt, eid(), 0, false).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn apply_review_sets_fields() {
        let mut rt = EpicRuntime::new();
        apply_review(&mut rt, ReviewKind::Plan, ReviewStatus::Ship).unwrap();
        assert!(rt.plan_review_status.is_ship());
        assert!(rt.plan_reviewed_at.is_some());
        assert_eq!(rt.completion_review_status, ReviewStatus::Unknown);
    }

    #[test]
    fn implementation_review_rejected_for_epics() {
        let mut rt = EpicRuntime::new();
        let err = apply_review(&mut rt, ReviewKind::Implementation, ReviewStatus::Ship).unwrap_err();
        assert_eq!(err.code(), "invalid_review_kind");
    }

    #[test]
    fn synthesize_honors_legacy_status() {
        let mut def = EpicDef::new(eid(), "e");
        def.legacy_status = Some(EpicStatus::Done);
        assert_eq!(EpicRuntime::synthesize(&def).status, EpicStatus::Done);
        assert_eq!(
            EpicRuntime::synthesize(&EpicDef::new(eid(), "e")).status,
            EpicStatus::Open
        );
    }

    #[test]
    fn runtime_defaults_parse_from_minimal_json() {
        let json = r#"{"status":"open","updated_at":"2026-01-01T00:00:00Z"}"#;
        let rt: EpicRuntime = serde_json::from_str(json).unwrap();
        assert_eq!(rt.plan_review_status, ReviewStatus::Unknown);
        assert_eq!(rt.completion_review_status, ReviewStatus::Unknown);
    }
}
