//! In-memory registries for boards, tasks, columns, tags and UI state.
//!
//! # Responsibility
//! - Own the normalized client-side state, one registry per record type.
//! - Keep cross-registry invariants (board counters, cascades) intact.
//!
//! # Invariants
//! - Cross-registry effects receive the other registry handle explicitly;
//!   registries never reach each other through globals.
//! - Update/delete/toggle on an unknown id is a silent no-op (`None`/`false`).
//! - Adds against an unknown board are rejected.
//! - Every mutation that touches tasks leaves each affected board's
//!   `tasks_count` equal to the recomputed counters.

pub mod board_store;
pub mod column_store;
pub mod tag_store;
pub mod task_store;
pub mod ui_store;

use crate::model::board::BoardId;
use crate::model::column::ColumnId;
use crate::model::ModelValidationError;
use board_store::BoardStore;
use column_store::ColumnStore;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tag_store::TagStore;
use task_store::TaskStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Rejections raised by registry write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(ModelValidationError),
    /// Target board of an add does not exist.
    BoardNotFound(BoardId),
    /// Fixed columns cannot be deleted or have their status rekeyed.
    FixedColumn(ColumnId),
    /// Another column of the board already uses this status key.
    DuplicateStatus { board_id: BoardId, status: String },
    /// A tag with the same name (case-insensitive) already exists.
    DuplicateTag(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::BoardNotFound(id) => write!(f, "board not found: {id}"),
            Self::FixedColumn(id) => write!(f, "column is fixed and cannot be changed: {id}"),
            Self::DuplicateStatus { board_id, status } => {
                write!(f, "board {board_id} already has a column with status `{status}`")
            }
            Self::DuplicateTag(name) => write!(f, "tag already exists: `{name}`"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for StoreError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// The four persisted registries, owned together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registries {
    pub boards: BoardStore,
    pub tasks: TaskStore,
    pub columns: ColumnStore,
    pub tags: TagStore,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes every board's counters from the task registry.
    pub fn recount_all(&mut self) {
        self.boards.recount_all(&self.tasks);
    }

    /// Returns ids of records violating referential invariants.
    ///
    /// Empty when every task and column points at an existing board.
    pub fn orphan_ids(&self) -> Vec<uuid::Uuid> {
        let tasks = self
            .tasks
            .tasks()
            .iter()
            .filter(|task| !self.boards.contains(task.board_id))
            .map(|task| task.id);
        let columns = self
            .columns
            .columns()
            .iter()
            .filter(|column| !self.boards.contains(column.board_id))
            .map(|column| column.id);
        tasks.chain(columns).collect()
    }
}
