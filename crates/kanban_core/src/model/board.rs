//! Board record and its denormalized task counters.
//!
//! # Invariants
//! - `tasks_count` is a cached projection over tasks sharing the board id.
//! - Counters never go below zero; deltas are clamped.

use crate::model::task::{STATUS_ARCHIVE, STATUS_DONE, STATUS_TODO};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable board identifier.
pub type BoardId = Uuid;

/// Cached per-board task counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub total: u32,
    pub completed: u32,
    pub in_progress: u32,
}

impl TaskCounts {
    /// Applies a signed delta, clamping every counter at zero.
    pub fn apply(&mut self, delta: CountDelta) {
        self.total = clamp_add(self.total, delta.total);
        self.completed = clamp_add(self.completed, delta.completed);
        self.in_progress = clamp_add(self.in_progress, delta.in_progress);
    }

    /// Recomputes counters from the statuses of a board's tasks.
    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.apply(CountDelta::for_status(status));
        }
        counts
    }
}

/// Signed change to [`TaskCounts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountDelta {
    pub total: i64,
    pub completed: i64,
    pub in_progress: i64,
}

impl CountDelta {
    /// Contribution of one task in `status` to its board counters.
    ///
    /// - every task counts toward `total`;
    /// - `done` counts toward `completed`;
    /// - anything other than `todo`, `done` or `archive` counts toward
    ///   `in_progress`.
    pub fn for_status(status: &str) -> Self {
        Self {
            total: 1,
            completed: i64::from(status == STATUS_DONE),
            in_progress: i64::from(!matches!(
                status,
                STATUS_TODO | STATUS_DONE | STATUS_ARCHIVE
            )),
        }
    }

    /// Delta produced by moving one task from `from` to `to`.
    pub fn for_transition(from: &str, to: &str) -> Self {
        Self::for_status(to) - Self::for_status(from)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn negate(self) -> Self {
        Self::default() - self
    }
}

impl std::ops::Sub for CountDelta {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            total: self.total - rhs.total,
            completed: self.completed - rhs.completed,
            in_progress: self.in_progress - rhs.in_progress,
        }
    }
}

/// Top-level project grouping columns and tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks_count: TaskCounts,
    #[serde(default)]
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub starred: bool,
}

/// Partial board update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub starred: Option<bool>,
}

fn clamp_add(value: u32, delta: i64) -> u32 {
    (i64::from(value) + delta).clamp(0, i64::from(u32::MAX)) as u32
}
