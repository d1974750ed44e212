use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One cleaned table row, keyed by column name, values typed per the
/// schema's field kinds. Serializes directly to the store's JSON shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypedRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TypedRecord {
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn hometeam(&self) -> Option<&str> {
        self.get_str("hometeam")
    }

    pub fn timeupdated(&self) -> Option<&str> {
        self.get_str("timeupdated")
    }

    /// The (team, date) pair used for deduplication. `None` when either
    /// half is missing; such records cannot be written.
    pub fn natural_key(&self) -> Option<NaturalKey> {
        let hometeam = self.hometeam()?;
        let timeupdated = self.timeupdated()?;
        Some(NaturalKey::new(hometeam, timeupdated))
    }
}

/// Deduplication key: team plus the calendar-date part of `timeupdated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey {
    pub hometeam: String,
    pub date: String,
}

impl NaturalKey {
    /// Extracts the date part from either the ISO form
    /// (`2025-08-29T18:44:35` → `2025-08-29`) or the raw on-page form a
    /// lenient timestamp policy lets through (`29/08/2025, 18:44:35` →
    /// `29/08/2025`). Anything else is used whole.
    pub fn new(hometeam: &str, timeupdated: &str) -> Self {
        let date = if let Some((d, _)) = timeupdated.split_once('T') {
            d
        } else if let Some((d, _)) = timeupdated.split_once(',') {
            d
        } else {
            timeupdated
        };
        Self {
            hometeam: hometeam.to_string(),
            date: date.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion policy
// ---------------------------------------------------------------------------

/// What to do with a timestamp that fails both parse formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Keep the raw text as-is.
    Lenient,
    /// Null the field.
    Strict,
}

// ---------------------------------------------------------------------------
// Pass outcomes
// ---------------------------------------------------------------------------

/// Pipeline stage names, used for error classification in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticating,
    Navigating,
    SelectingSubview,
    Extracting,
    Cleaning,
    Writing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Authenticating => "authenticating",
            Stage::Navigating => "navigating",
            Stage::SelectingSubview => "selecting_subview",
            Stage::Extracting => "extracting",
            Stage::Cleaning => "cleaning",
            Stage::Writing => "writing",
        };
        write!(f, "{s}")
    }
}

/// Counts returned by the upsert writer. Per-record failures are counted,
/// never propagated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub success_count: usize,
    pub error_count: usize,
}

/// Outcome of one end-to-end pass. Consumed for logging and backoff only.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub rows_scraped: usize,
    pub rows_cleaned: usize,
    pub rows_written: usize,
    pub rows_skipped: usize,
    pub rows_failed: usize,
    pub duration: Duration,
    pub terminal_error: Option<String>,
}

impl RunResult {
    pub fn failed(stage: Stage, err: impl std::fmt::Display, duration: Duration) -> Self {
        Self {
            duration,
            terminal_error: Some(format!("{stage}: {err}")),
            ..Self::default()
        }
    }

    pub fn timed_out(duration: Duration) -> Self {
        Self {
            duration,
            terminal_error: Some(crate::error::AppError::PassTimeout.to_string()),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.terminal_error.is_none()
    }
}
