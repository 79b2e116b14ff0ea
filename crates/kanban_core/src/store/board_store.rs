//! Board registry.
//!
//! # Responsibility
//! - CRUD over board records.
//! - Maintain the denormalized per-board task counters.
//! - Cascade board deletion into the task and column registries.
//!
//! # Invariants
//! - A new board always starts with the three default fixed columns.
//! - Counter deltas clamp at zero.
//! - Deleting a board removes its tasks and columns in the same call.

use crate::model::board::{Board, BoardId, BoardPatch, CountDelta, TaskCounts};
use crate::model::{normalize_name, now_epoch_ms};
use crate::store::column_store::ColumnStore;
use crate::store::task_store::TaskStore;
use crate::store::StoreResult;
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted board registry state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardStore {
    #[serde(default)]
    boards: Vec<Board>,
}

/// Summary of one cascade delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDeletion {
    pub board: Board,
    pub removed_tasks: usize,
    pub removed_columns: usize,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn get(&self, id: BoardId) -> Option<&Board> {
        self.boards.iter().find(|board| board.id == id)
    }

    pub fn contains(&self, id: BoardId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Lists boards starred first, then most recently updated.
    pub fn list(&self) -> Vec<&Board> {
        let mut items: Vec<&Board> = self.boards.iter().collect();
        items.sort_by(|a, b| {
            b.starred
                .cmp(&a.starred)
                .then(b.updated_at.cmp(&a.updated_at))
                .then(a.id.cmp(&b.id))
        });
        items
    }

    /// Creates a board with zero counters and spawns its default columns.
    pub fn add_board(
        &mut self,
        columns: &mut ColumnStore,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> StoreResult<Board> {
        let name = normalize_name(name, "board name")?;
        let now = now_epoch_ms();
        let board = Board {
            id: Uuid::new_v4(),
            name,
            description: description.into().trim().to_string(),
            tasks_count: TaskCounts::default(),
            created_at: now,
            updated_at: now,
            starred: false,
        };

        self.boards.push(board.clone());
        columns.spawn_defaults(board.id);
        Ok(board)
    }

    /// Merges present patch fields and bumps `updated_at`.
    pub fn update_board(&mut self, id: BoardId, patch: BoardPatch) -> StoreResult<Option<Board>> {
        let name = patch
            .name
            .map(|value| normalize_name(value, "board name"))
            .transpose()?;
        let Some(board) = self.boards.iter_mut().find(|board| board.id == id) else {
            return Ok(None);
        };

        if let Some(name) = name {
            board.name = name;
        }
        if let Some(description) = patch.description {
            board.description = description.trim().to_string();
        }
        if let Some(starred) = patch.starred {
            board.starred = starred;
        }
        board.updated_at = now_epoch_ms();
        Ok(Some(board.clone()))
    }

    /// Deletes a board together with its tasks and columns.
    pub fn delete_board(
        &mut self,
        id: BoardId,
        tasks: &mut TaskStore,
        columns: &mut ColumnStore,
    ) -> Option<BoardDeletion> {
        let index = self.boards.iter().position(|board| board.id == id)?;
        let board = self.boards.remove(index);
        let removed_tasks = tasks.remove_for_board(id);
        let removed_columns = columns.remove_for_board(id);

        info!(
            "event=board_delete module=store status=ok board_id={} tasks_removed={} columns_removed={}",
            id, removed_tasks, removed_columns
        );
        Some(BoardDeletion {
            board,
            removed_tasks,
            removed_columns,
        })
    }

    /// Flips the starred flag. Returns the new value.
    pub fn toggle_star(&mut self, id: BoardId) -> Option<bool> {
        let board = self.boards.iter_mut().find(|board| board.id == id)?;
        board.starred = !board.starred;
        board.updated_at = now_epoch_ms();
        Some(board.starred)
    }

    /// Applies a clamped counter delta. Returns `false` for unknown boards.
    pub fn apply_counter_delta(&mut self, id: BoardId, delta: CountDelta) -> bool {
        let Some(board) = self.boards.iter_mut().find(|board| board.id == id) else {
            return false;
        };
        if delta.is_zero() {
            return true;
        }
        board.tasks_count.apply(delta);
        board.updated_at = now_epoch_ms();
        true
    }

    /// Replaces one board's counters with values recomputed from `tasks`.
    pub fn recount(&mut self, id: BoardId, tasks: &TaskStore) -> Option<TaskCounts> {
        let board = self.boards.iter_mut().find(|board| board.id == id)?;
        let counts = TaskCounts::from_statuses(
            tasks
                .tasks()
                .iter()
                .filter(|task| task.board_id == id)
                .map(|task| task.status.as_str()),
        );
        board.tasks_count = counts;
        Some(counts)
    }

    pub fn recount_all(&mut self, tasks: &TaskStore) {
        let ids: Vec<BoardId> = self.boards.iter().map(|board| board.id).collect();
        for id in ids {
            self.recount(id, tasks);
        }
    }
}
