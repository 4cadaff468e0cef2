use crate::error::{Result, StewardError};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// EpicId
// ---------------------------------------------------------------------------

/// Stable epic identifier, rendered as `E<n>` with n >= 1. Numbering is
/// monotonic per repository; ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpicId(u32);

impl EpicId {
    pub fn new(number: u32) -> Result<Self> {
        if number == 0 {
            return Err(StewardError::InvalidId("E0".to_string()));
        }
        Ok(EpicId(number))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    /// The id of a task owned by this epic.
    pub fn task(self, ordinal: u32) -> Result<TaskId> {
        TaskId::new(self, ordinal)
    }
}

impl fmt::Display for EpicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

static EPIC_ID_RE: OnceLock<Regex> = OnceLock::new();

fn epic_id_re() -> &'static Regex {
    EPIC_ID_RE.get_or_init(|| Regex::new(r"^E([1-9][0-9]{0,8})$").unwrap())
}

impl FromStr for EpicId {
    type Err = StewardError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = epic_id_re()
            .captures(s)
            .ok_or_else(|| StewardError::InvalidId(s.to_string()))?;
        let n: u32 = caps[1]
            .parse()
            .map_err(|_| StewardError::InvalidId(s.to_string()))?;
        EpicId::new(n)
    }
}

// ---------------------------------------------------------------------------
// TaskId
// ---------------------------------------------------------------------------

/// Task identifier: the owning epic id plus a per-epic ordinal, rendered as
/// `E<n>.<m>`. Ordering is numeric on (epic, ordinal), which doubles as
/// creation order within an epic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    epic: EpicId,
    ordinal: u32,
}

impl TaskId {
    pub fn new(epic: EpicId, ordinal: u32) -> Result<Self> {
        if ordinal == 0 {
            return Err(StewardError::InvalidId(format!("{epic}.0")));
        }
        Ok(TaskId { epic, ordinal })
    }

    pub fn epic(self) -> EpicId {
        self.epic
    }

    pub fn ordinal(self) -> u32 {
        self.ordinal
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.epic, self.ordinal)
    }
}

static TASK_ID_RE: OnceLock<Regex> = OnceLock::new();

fn task_id_re() -> &'static Regex {
    TASK_ID_RE.get_or_init(|| Regex::new(r"^E([1-9][0-9]{0,8})\.([1-9][0-9]{0,8})$").unwrap())
}

impl FromStr for TaskId {
    type Err = StewardError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = task_id_re()
            .captures(s)
            .ok_or_else(|| StewardError::InvalidId(s.to_string()))?;
        let epic: u32 = caps[1]
            .parse()
            .map_err(|_| StewardError::InvalidId(s.to_string()))?;
        let ordinal: u32 = caps[2]
            .parse()
            .map_err(|_| StewardError::InvalidId(s.to_string()))?;
        TaskId::new(EpicId::new(epic)?, ordinal)
    }
}

// ---------------------------------------------------------------------------
// EntityId — either kind, for call sites that accept both
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    Epic(EpicId),
    Task(TaskId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Epic(id) => id.fmt(f),
            EntityId::Task(id) => id.fmt(f),
        }
    }
}

impl FromStr for EntityId {
    type Err = StewardError;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains('.') {
            Ok(EntityId::Task(s.parse()?))
        } else {
            Ok(EntityId::Epic(s.parse()?))
        }
    }
}

// ---------------------------------------------------------------------------
// Serde — ids travel as strings in every file format
// ---------------------------------------------------------------------------

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(EpicId);
string_serde!(TaskId);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
