//! Column registry.
//!
//! # Responsibility
//! - CRUD over status lanes scoped to a board.
//! - Migrate orphaned tasks when a lane is deleted.
//!
//! # Invariants
//! - `order` is unique within a board; new lanes append after the maximum.
//! - Status keys are unique within a board.
//! - Fixed lanes cannot be deleted and their status key cannot change.
//! - Deletion fallback: the board's `todo` lane, else the first remaining
//!   lane by order, else the orphaned tasks are deleted.

use crate::model::board::BoardId;
use crate::model::column::{Column, ColumnDraft, ColumnId, ColumnPatch, DEFAULT_COLUMNS};
use crate::model::task::STATUS_TODO;
use crate::model::{normalize_color, normalize_name, normalize_status, now_epoch_ms};
use crate::store::board_store::BoardStore;
use crate::store::task_store::TaskStore;
use crate::store::{StoreError, StoreResult};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted column registry state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStore {
    #[serde(default)]
    columns: Vec<Column>,
}

/// What happened to the tasks of a deleted column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDeletion {
    pub column: Column,
    /// Status the orphaned tasks moved to; `None` when they were deleted.
    pub fallback_status: Option<String>,
    pub migrated_tasks: usize,
    pub deleted_tasks: usize,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == id)
    }

    /// Columns of one board sorted by `order`.
    pub fn for_board(&self, board_id: BoardId) -> Vec<&Column> {
        let mut items: Vec<&Column> = self
            .columns
            .iter()
            .filter(|column| column.board_id == board_id)
            .collect();
        items.sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        items
    }

    /// Creates a lane appended after the board's highest order.
    pub fn add_column(
        &mut self,
        boards: &BoardStore,
        board_id: BoardId,
        draft: ColumnDraft,
    ) -> StoreResult<Column> {
        if !boards.contains(board_id) {
            return Err(StoreError::BoardNotFound(board_id));
        }

        let title = normalize_name(draft.title, "column title")?;
        let status = normalize_status(draft.status)?;
        let color = normalize_color(draft.color)?;
        self.ensure_status_free(board_id, &status, None)?;

        let column = Column {
            id: Uuid::new_v4(),
            title,
            status,
            color,
            order: self.next_order(board_id),
            is_fixed: false,
            board_id,
        };
        self.columns.push(column.clone());
        Ok(column)
    }

    /// Updates a lane.
    ///
    /// A status rekey carries the lane's tasks along so none are orphaned.
    pub fn update_column(
        &mut self,
        tasks: &mut TaskStore,
        boards: &mut BoardStore,
        id: ColumnId,
        patch: ColumnPatch,
    ) -> StoreResult<Option<Column>> {
        let title = patch
            .title
            .map(|value| normalize_name(value, "column title"))
            .transpose()?;
        let color = patch.color.map(normalize_color).transpose()?;
        let status = patch.status.map(normalize_status).transpose()?;

        let Some(current) = self.get(id).cloned() else {
            return Ok(None);
        };
        let rekey = status.filter(|value| *value != current.status);
        if let Some(new_status) = rekey.as_deref() {
            if current.is_fixed {
                return Err(StoreError::FixedColumn(id));
            }
            self.ensure_status_free(current.board_id, new_status, Some(id))?;
        }

        let Some(column) = self.columns.iter_mut().find(|column| column.id == id) else {
            return Ok(None);
        };
        if let Some(title) = title {
            column.title = title;
        }
        if let Some(color) = color {
            column.color = color;
        }
        if let Some(new_status) = rekey {
            column.status = new_status.clone();
            tasks.migrate_status(current.board_id, &current.status, &new_status, now_epoch_ms());
            boards.recount(current.board_id, tasks);
        }
        Ok(Some(column.clone()))
    }

    /// Deletes a non-fixed lane and relocates or deletes its tasks.
    pub fn delete_column(
        &mut self,
        tasks: &mut TaskStore,
        boards: &mut BoardStore,
        id: ColumnId,
    ) -> StoreResult<Option<ColumnDeletion>> {
        let Some(index) = self.columns.iter().position(|column| column.id == id) else {
            return Ok(None);
        };
        if self.columns[index].is_fixed {
            return Err(StoreError::FixedColumn(id));
        }

        let column = self.columns.remove(index);
        let fallback_status = self.fallback_status(column.board_id);
        let (migrated_tasks, deleted_tasks) = match fallback_status.as_deref() {
            Some(fallback) => (
                tasks.migrate_status(column.board_id, &column.status, fallback, now_epoch_ms()),
                0,
            ),
            None => (0, tasks.remove_with_status(column.board_id, &column.status)),
        };
        boards.recount(column.board_id, tasks);

        info!(
            "event=column_delete module=store status=ok column_id={} tasks_migrated={} tasks_deleted={}",
            id, migrated_tasks, deleted_tasks
        );
        Ok(Some(ColumnDeletion {
            column,
            fallback_status,
            migrated_tasks,
            deleted_tasks,
        }))
    }

    /// Assigns `order = index` for each listed lane of the board.
    ///
    /// Lanes of the board missing from `ids` keep their relative order after
    /// the listed ones. Ids from other boards are ignored. Returns the number
    /// of listed lanes that were reordered.
    pub fn reorder_columns(&mut self, board_id: BoardId, ids: &[ColumnId]) -> usize {
        let mut ordered: Vec<ColumnId> = Vec::with_capacity(ids.len());
        for id in ids {
            let belongs = self
                .columns
                .iter()
                .any(|column| column.id == *id && column.board_id == board_id);
            if belongs && !ordered.contains(id) {
                ordered.push(*id);
            }
        }
        let listed = ordered.len();
        let rest: Vec<ColumnId> = self
            .for_board(board_id)
            .into_iter()
            .map(|column| column.id)
            .filter(|id| !ordered.contains(id))
            .collect();
        ordered.extend(rest);

        for (index, id) in ordered.into_iter().enumerate() {
            if let Some(column) = self.columns.iter_mut().find(|column| column.id == id) {
                column.order = index as i64;
            }
        }
        listed
    }

    pub(crate) fn spawn_defaults(&mut self, board_id: BoardId) -> Vec<Column> {
        let spawned: Vec<Column> = DEFAULT_COLUMNS
            .iter()
            .enumerate()
            .map(|(index, (title, status, color))| Column {
                id: Uuid::new_v4(),
                title: (*title).to_string(),
                status: (*status).to_string(),
                color: (*color).to_string(),
                order: index as i64,
                is_fixed: true,
                board_id,
            })
            .collect();
        self.columns.extend(spawned.iter().cloned());
        spawned
    }

    pub(crate) fn remove_for_board(&mut self, board_id: BoardId) -> usize {
        let before = self.columns.len();
        self.columns.retain(|column| column.board_id != board_id);
        before - self.columns.len()
    }

    fn next_order(&self, board_id: BoardId) -> i64 {
        self.columns
            .iter()
            .filter(|column| column.board_id == board_id)
            .map(|column| column.order)
            .max()
            .map_or(0, |max| max + 1)
    }

    fn fallback_status(&self, board_id: BoardId) -> Option<String> {
        let remaining = self.for_board(board_id);
        remaining
            .iter()
            .find(|column| column.status == STATUS_TODO)
            .or_else(|| remaining.first())
            .map(|column| column.status.clone())
    }

    fn ensure_status_free(
        &self,
        board_id: BoardId,
        status: &str,
        except: Option<ColumnId>,
    ) -> StoreResult<()> {
        let taken = self.columns.iter().any(|column| {
            column.board_id == board_id && column.status == status && Some(column.id) != except
        });
        if taken {
            return Err(StoreError::DuplicateStatus {
                board_id,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ColumnStore;
    use crate::model::column::{ColumnDraft, ColumnPatch};
    use crate::store::board_store::BoardStore;
    use crate::store::task_store::TaskStore;
    use crate::store::StoreError;
    use uuid::Uuid;

    #[test]
    fn add_column_appends_after_max_order() {
        let mut boards = BoardStore::new();
        let mut columns = ColumnStore::new();
        let board = boards.add_board(&mut columns, "Board", "").unwrap();

        let review = columns
            .add_column(&boards, board.id, ColumnDraft::new("Review", "review", "#AABBCC"))
            .unwrap();
        assert_eq!(review.order, 3);
        assert_eq!(review.color, "#aabbcc");
        assert!(!review.is_fixed);
    }

    #[test]
    fn add_column_rejects_unknown_board_and_duplicate_status() {
        let mut boards = BoardStore::new();
        let mut columns = ColumnStore::new();
        let err = columns
            .add_column(&boards, Uuid::new_v4(), ColumnDraft::new("x", "x", "#000000"))
            .unwrap_err();
        assert!(matches!(err, StoreError::BoardNotFound(_)));

        let board = boards.add_board(&mut columns, "Board", "").unwrap();
        let err = columns
            .add_column(&boards, board.id, ColumnDraft::new("Again", "done", "#000000"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateStatus { .. }));
    }

    #[test]
    fn fixed_column_status_cannot_be_rekeyed() {
        let mut boards = BoardStore::new();
        let mut columns = ColumnStore::new();
        let mut tasks = TaskStore::new();
        let board = boards.add_board(&mut columns, "Board", "").unwrap();
        let done_id = columns.for_board(board.id)[2].id;

        let err = columns
            .update_column(
                &mut tasks,
                &mut boards,
                done_id,
                ColumnPatch {
                    status: Some("shipped".to_string()),
                    ..ColumnPatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, StoreError::FixedColumn(done_id));

        let renamed = columns
            .update_column(
                &mut tasks,
                &mut boards,
                done_id,
                ColumnPatch {
                    title: Some("Shipped".to_string()),
                    ..ColumnPatch::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(renamed.title, "Shipped");
        assert_eq!(renamed.status, "done");
    }

    #[test]
    fn reorder_assigns_index_and_keeps_unlisted_after() {
        let mut boards = BoardStore::new();
        let mut columns = ColumnStore::new();
        let board = boards.add_board(&mut columns, "Board", "").unwrap();
        let ids: Vec<_> = columns.for_board(board.id).iter().map(|c| c.id).collect();

        let listed = columns.reorder_columns(board.id, &[ids[2], ids[0], Uuid::new_v4()]);
        assert_eq!(listed, 2);
        assert_eq!(columns.get(ids[2]).unwrap().order, 0);
        assert_eq!(columns.get(ids[0]).unwrap().order, 1);
        assert_eq!(columns.get(ids[1]).unwrap().order, 2);
    }
}
