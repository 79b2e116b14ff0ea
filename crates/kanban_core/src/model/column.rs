//! Column (status lane) record.

use crate::model::board::BoardId;
use crate::model::task::{STATUS_DONE, STATUS_IN_PROGRESS, STATUS_TODO};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable column identifier.
pub type ColumnId = Uuid;

/// Status lane within a board.
///
/// Tasks belong to a column through `status`, not by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    pub status: String,
    pub color: String,
    /// Sort key, unique within one board.
    pub order: i64,
    /// Default lanes are fixed and cannot be deleted.
    #[serde(default)]
    pub is_fixed: bool,
    pub board_id: BoardId,
}

/// Caller input for creating a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDraft {
    pub title: String,
    pub status: String,
    pub color: String,
}

impl ColumnDraft {
    pub fn new(
        title: impl Into<String>,
        status: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            status: status.into(),
            color: color.into(),
        }
    }
}

/// Partial column update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPatch {
    pub title: Option<String>,
    pub status: Option<String>,
    pub color: Option<String>,
}

/// Lanes spawned for every new board, in display order.
pub const DEFAULT_COLUMNS: [(&str, &str, &str); 3] = [
    ("To Do", STATUS_TODO, "#64748b"),
    ("In Progress", STATUS_IN_PROGRESS, "#3b82f6"),
    ("Done", STATUS_DONE, "#22c55e"),
];
