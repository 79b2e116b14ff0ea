//! Kanban domain model shared by every registry.
//!
//! # Responsibility
//! - Define the persisted records (boards, columns, tasks, tags).
//! - Own field-level validation shared by registry write paths.
//!
//! # Invariants
//! - Every record is identified by a stable UUID v4.
//! - Timestamps are Unix epoch milliseconds.
//! - Names and titles are stored trimmed and never blank.
//! - Colors are `#rrggbb` hex strings.

pub mod board;
pub mod column;
pub mod tag;
pub mod task;

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid hex color regex"));

/// Field-level validation failures for kanban records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Name/title is empty after trimming. Carries the field name.
    BlankField(&'static str),
    /// Color is not a `#rrggbb` hex string.
    InvalidColor(String),
    /// Priority string does not name a known priority.
    InvalidPriority(String),
    /// Status key is empty after trimming.
    BlankStatus,
    /// Estimate is negative or not a finite number.
    InvalidEstimate,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::InvalidColor(value) => {
                write!(f, "invalid color `{value}`; expected #rrggbb")
            }
            Self::InvalidPriority(value) => {
                write!(f, "invalid priority `{value}`; expected low|medium|high|urgent")
            }
            Self::BlankStatus => write!(f, "status must not be blank"),
            Self::InvalidEstimate => write!(f, "estimate must be a finite, non-negative number"),
        }
    }
}

impl Error for ModelValidationError {}

/// Returns the current wall clock as epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Trims `value` and rejects blank input.
pub fn normalize_name(
    value: impl Into<String>,
    field: &'static str,
) -> Result<String, ModelValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Lowercases a `#rrggbb` color, rejecting anything else.
pub fn normalize_color(value: impl Into<String>) -> Result<String, ModelValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if !HEX_COLOR_RE.is_match(trimmed) {
        return Err(ModelValidationError::InvalidColor(value));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Trims a status key, rejecting blank input.
pub fn normalize_status(value: impl Into<String>) -> Result<String, ModelValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelValidationError::BlankStatus);
    }
    Ok(trimmed.to_string())
}

/// Rejects negative or non-finite effort estimates.
pub fn validate_estimate(value: Option<f32>) -> Result<Option<f32>, ModelValidationError> {
    match value {
        Some(hours) if !hours.is_finite() || hours < 0.0 => {
            Err(ModelValidationError::InvalidEstimate)
        }
        other => Ok(other),
    }
}
