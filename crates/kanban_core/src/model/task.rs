//! Task, subtask and status-history records.
//!
//! # Responsibility
//! - Define the canonical task record persisted under the tasks key.
//! - Provide status-transition helpers used by the task registry.
//!
//! # Invariants
//! - `status` is a free-form column status key; reserved keys are
//!   `todo`, `in-progress`, `done` and `archive`.
//! - `status_history` is append-only and ordered by `changed_at`.
//! - `completed_at` is set exactly while `status == "done"`.

use crate::model::board::BoardId;
use crate::model::tag::Tag;
use crate::model::ModelValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub const STATUS_TODO: &str = "todo";
pub const STATUS_IN_PROGRESS: &str = "in-progress";
pub const STATUS_DONE: &str = "done";
pub const STATUS_ARCHIVE: &str = "archive";

/// Stable task identifier.
pub type TaskId = Uuid;

/// Stable subtask identifier.
pub type SubTaskId = Uuid;

/// Task priority, ranked `urgent > high > medium > low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Numeric rank; larger is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Urgent => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ModelValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ModelValidationError::InvalidPriority(value.to_string())),
        }
    }
}

/// One entry of a task's status log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// `None` for the entry recorded at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    pub changed_at: i64,
}

/// Checklist item owned by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: SubTaskId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: i64,
}

/// Unit of work belonging to a board and, through `status`, a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Estimated effort in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f32>,
    #[serde(default)]
    pub priority: Priority,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    pub board_id: BoardId,
    /// Position within its column; assigned by reorder.
    #[serde(default)]
    pub order: i64,
}

impl Task {
    /// Records a status change at `now`.
    ///
    /// Returns `false` without touching the task when `status` is unchanged.
    pub fn transition_to(&mut self, status: &str, now: i64) -> bool {
        if self.status == status {
            return false;
        }

        self.status_history.push(StatusChange {
            from: Some(self.status.clone()),
            to: status.to_string(),
            changed_at: now,
        });
        self.status = status.to_string();
        self.completed_at = if status == STATUS_DONE { Some(now) } else { None };
        self.updated_at = now;
        true
    }

    /// Returns whether the task is past due at `now`.
    ///
    /// Done and archived tasks are never overdue.
    pub fn is_overdue(&self, now: i64) -> bool {
        match self.due_date {
            Some(due) => due < now && !matches!(self.status.as_str(), STATUS_DONE | STATUS_ARCHIVE),
            None => false,
        }
    }

    pub fn has_tag(&self, tag_id: Uuid) -> bool {
        self.tags.iter().any(|tag| tag.id == tag_id)
    }

    /// Returns `(completed, total)` subtask counts.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|item| item.completed).count();
        (done, self.subtasks.len())
    }
}

/// Caller input for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub board_id: BoardId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<i64>,
    pub tags: Vec<Tag>,
    pub estimate: Option<f32>,
    pub priority: Priority,
    pub status: String,
}

impl TaskDraft {
    /// Draft with `todo` status and medium priority.
    pub fn new(board_id: BoardId, title: impl Into<String>) -> Self {
        Self {
            board_id,
            title: title.into(),
            description: None,
            due_date: None,
            tags: Vec::new(),
            estimate: None,
            priority: Priority::default(),
            status: STATUS_TODO.to_string(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: i64) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial task update.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears an optional
/// field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<i64>>,
    pub tags: Option<Vec<Tag>>,
    pub estimate: Option<Option<f32>>,
    pub priority: Option<Priority>,
    pub status: Option<String>,
}
