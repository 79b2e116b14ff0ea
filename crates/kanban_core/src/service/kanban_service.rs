//! Kanban use-case service.
//!
//! # Responsibility
//! - Single entry point for UI-level actions over the registries.
//! - Schedule debounced snapshot writes for every successful mutation.
//! - Surface rejected actions and persistence failures as UI errors/toasts.
//!
//! # Invariants
//! - Registry state is only changed through registry operations.
//! - A failed action leaves the dirty set untouched.
//! - Persistence failures never propagate out of `flush`/`flush_due`; they are
//!   reported through the UI registry under [`PERSISTENCE_ERROR_KEY`].

use crate::config::KanbanConfig;
use crate::model::board::{Board, BoardId, BoardPatch};
use crate::model::column::{Column, ColumnDraft, ColumnId, ColumnPatch};
use crate::model::tag::{Tag, TagId, TagPatch};
use crate::model::task::{SubTask, SubTaskId, Task, TaskDraft, TaskId, TaskPatch};
use crate::persist::{
    encode_registry, export_document, import_document, load_registries, write_with_cleanup,
    ExportDocument, PersistResult, SaveScheduler, StorageKey,
};
use crate::repo::kv_repo::KvRepository;
use crate::store::board_store::BoardDeletion;
use crate::store::column_store::ColumnDeletion;
use crate::store::task_store::TaskQuery;
use crate::store::ui_store::{ToastKind, UiStore};
use crate::store::{Registries, StoreError, StoreResult};
use log::{error, info};
use std::time::Instant;

pub const PERSISTENCE_ERROR_KEY: &str = "persistence";
pub const BOARDS_ERROR_KEY: &str = "boards";
pub const TASKS_ERROR_KEY: &str = "tasks";
pub const COLUMNS_ERROR_KEY: &str = "columns";
pub const TAGS_ERROR_KEY: &str = "tags";

const BOARD_CASCADE_KEYS: [StorageKey; 3] =
    [StorageKey::Boards, StorageKey::Tasks, StorageKey::Columns];
const TASK_KEYS: [StorageKey; 2] = [StorageKey::Tasks, StorageKey::Boards];

/// Outcome of one flush attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub written: Vec<StorageKey>,
    pub failed: Vec<StorageKey>,
}

impl FlushReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Facade over registries, storage and UI notifications.
pub struct KanbanService<R: KvRepository> {
    repo: R,
    registries: Registries,
    ui: UiStore,
    scheduler: SaveScheduler,
}

impl<R: KvRepository> KanbanService<R> {
    /// Hydrates the registries from `repo`.
    pub fn open(repo: R, config: &KanbanConfig) -> PersistResult<Self> {
        let registries = load_registries(&repo)?;
        info!(
            "event=service_open module=service status=ok boards={} tasks={}",
            registries.boards.len(),
            registries.tasks.tasks().len()
        );
        Ok(Self {
            repo,
            registries,
            ui: UiStore::with_toast_limit(config.toast_limit),
            scheduler: SaveScheduler::new(config.save_debounce()),
        })
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn ui(&self) -> &UiStore {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiStore {
        &mut self.ui
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn has_pending_writes(&self) -> bool {
        self.scheduler.has_pending()
    }

    // Boards

    pub fn create_board(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> StoreResult<Board> {
        let Registries {
            boards, columns, ..
        } = &mut self.registries;
        let result = boards.add_board(columns, name, description);
        self.settle(result, BOARDS_ERROR_KEY, &[StorageKey::Boards, StorageKey::Columns])
    }

    pub fn update_board(&mut self, id: BoardId, patch: BoardPatch) -> StoreResult<Option<Board>> {
        let result = self.registries.boards.update_board(id, patch);
        self.settle_optional(result, BOARDS_ERROR_KEY, &[StorageKey::Boards])
    }

    pub fn delete_board(&mut self, id: BoardId) -> Option<BoardDeletion> {
        let Registries {
            boards,
            tasks,
            columns,
            ..
        } = &mut self.registries;
        let deletion = boards.delete_board(id, tasks, columns);
        if deletion.is_some() {
            self.mark_dirty(&BOARD_CASCADE_KEYS);
        }
        deletion
    }

    pub fn toggle_star(&mut self, id: BoardId) -> Option<bool> {
        let starred = self.registries.boards.toggle_star(id);
        if starred.is_some() {
            self.mark_dirty(&[StorageKey::Boards]);
        }
        starred
    }

    // Tasks

    pub fn create_task(&mut self, draft: TaskDraft) -> StoreResult<Task> {
        let Registries { boards, tasks, .. } = &mut self.registries;
        let result = tasks.add_task(boards, draft);
        self.settle(result, TASKS_ERROR_KEY, &TASK_KEYS)
    }

    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let Registries { boards, tasks, .. } = &mut self.registries;
        let result = tasks.update_task(boards, id, patch);
        self.settle_optional(result, TASKS_ERROR_KEY, &TASK_KEYS)
    }

    pub fn move_task(
        &mut self,
        id: TaskId,
        status: impl Into<String>,
    ) -> StoreResult<Option<Task>> {
        let Registries { boards, tasks, .. } = &mut self.registries;
        let result = tasks.move_task(boards, id, status);
        self.settle_optional(result, TASKS_ERROR_KEY, &TASK_KEYS)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Option<Task> {
        let Registries { boards, tasks, .. } = &mut self.registries;
        let removed = tasks.delete_task(boards, id);
        if removed.is_some() {
            self.mark_dirty(&TASK_KEYS);
        }
        removed
    }

    pub fn reorder_tasks(&mut self, ids: &[TaskId]) -> usize {
        let touched = self.registries.tasks.reorder_tasks(ids);
        if touched > 0 {
            self.mark_dirty(&[StorageKey::Tasks]);
        }
        touched
    }

    pub fn add_subtask(
        &mut self,
        task_id: TaskId,
        title: impl Into<String>,
    ) -> StoreResult<Option<SubTask>> {
        let result = self.registries.tasks.add_subtask(task_id, title);
        self.settle_optional(result, TASKS_ERROR_KEY, &[StorageKey::Tasks])
    }

    pub fn toggle_subtask(&mut self, task_id: TaskId, subtask_id: SubTaskId) -> Option<bool> {
        let completed = self.registries.tasks.toggle_subtask(task_id, subtask_id);
        if completed.is_some() {
            self.mark_dirty(&[StorageKey::Tasks]);
        }
        completed
    }

    pub fn delete_subtask(&mut self, task_id: TaskId, subtask_id: SubTaskId) -> bool {
        let removed = self.registries.tasks.delete_subtask(task_id, subtask_id);
        if removed {
            self.mark_dirty(&[StorageKey::Tasks]);
        }
        removed
    }

    pub fn filter_tasks(&self, query: &TaskQuery) -> Vec<&Task> {
        self.registries.tasks.filter(query)
    }

    // Columns

    pub fn create_column(&mut self, board_id: BoardId, draft: ColumnDraft) -> StoreResult<Column> {
        let Registries {
            boards, columns, ..
        } = &mut self.registries;
        let result = columns.add_column(boards, board_id, draft);
        self.settle(result, COLUMNS_ERROR_KEY, &[StorageKey::Columns])
    }

    pub fn update_column(
        &mut self,
        id: ColumnId,
        patch: ColumnPatch,
    ) -> StoreResult<Option<Column>> {
        let Registries {
            boards,
            tasks,
            columns,
            ..
        } = &mut self.registries;
        let result = columns.update_column(tasks, boards, id, patch);
        self.settle_optional(result, COLUMNS_ERROR_KEY, &BOARD_CASCADE_KEYS)
    }

    pub fn delete_column(&mut self, id: ColumnId) -> StoreResult<Option<ColumnDeletion>> {
        let Registries {
            boards,
            tasks,
            columns,
            ..
        } = &mut self.registries;
        let result = columns.delete_column(tasks, boards, id);
        self.settle_optional(result, COLUMNS_ERROR_KEY, &BOARD_CASCADE_KEYS)
    }

    pub fn reorder_columns(&mut self, board_id: BoardId, ids: &[ColumnId]) -> usize {
        let listed = self.registries.columns.reorder_columns(board_id, ids);
        if listed > 0 {
            self.mark_dirty(&[StorageKey::Columns]);
        }
        listed
    }

    // Tags

    pub fn create_tag(
        &mut self,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> StoreResult<Tag> {
        let result = self.registries.tags.add_tag(name, color);
        self.settle(result, TAGS_ERROR_KEY, &[StorageKey::Tags])
    }

    pub fn update_tag(&mut self, id: TagId, patch: TagPatch) -> StoreResult<Option<Tag>> {
        let result = self.registries.tags.update_tag(id, patch);
        self.settle_optional(result, TAGS_ERROR_KEY, &[StorageKey::Tags])
    }

    pub fn delete_tag(&mut self, id: TagId) -> Option<(Tag, usize)> {
        let Registries { tasks, tags, .. } = &mut self.registries;
        let removed = tags.delete_tag(tasks, id);
        if removed.is_some() {
            self.mark_dirty(&[StorageKey::Tags, StorageKey::Tasks]);
        }
        removed
    }

    // Persistence

    /// Writes pending keys once the idle delay has elapsed at `now`.
    pub fn flush_due(&mut self, now: Instant) -> FlushReport {
        let due = self.scheduler.take_due(now);
        self.write_keys(due)
    }

    /// Writes every pending key immediately.
    pub fn flush(&mut self) -> FlushReport {
        let pending = self.scheduler.take_all();
        self.write_keys(pending)
    }

    /// Flushes pending writes, then batches the stored blobs.
    pub fn export_snapshot(&mut self) -> PersistResult<ExportDocument> {
        self.flush();
        export_document(&self.repo)
    }

    /// Replaces storage with `document` and rehydrates the registries.
    ///
    /// Pending writes are discarded; the imported state wins. On failure the
    /// in-memory registries stay authoritative and every key is queued for
    /// a write-back.
    pub fn import_snapshot(&mut self, document: &ExportDocument) -> PersistResult<()> {
        self.ui.set_loading(PERSISTENCE_ERROR_KEY, true);
        let result = import_document(&self.repo, document);
        self.ui.set_loading(PERSISTENCE_ERROR_KEY, false);

        match result {
            Ok(registries) => {
                self.scheduler.discard();
                self.registries = registries;
                self.ui.clear_error(PERSISTENCE_ERROR_KEY);
                self.ui.push_toast(ToastKind::Success, "Data imported");
                Ok(())
            }
            Err(err) => {
                self.mark_dirty(&StorageKey::ALL);
                self.ui.set_error(PERSISTENCE_ERROR_KEY, err.to_string());
                self.ui
                    .push_toast(ToastKind::Error, format!("Import failed: {err}"));
                Err(err)
            }
        }
    }

    fn write_keys(&mut self, keys: Vec<StorageKey>) -> FlushReport {
        let mut report = FlushReport::default();
        let mut last_error = None;
        for key in keys {
            let written = encode_registry(&self.registries, key).and_then(|blob| {
                write_with_cleanup(&self.repo, key.as_str(), &blob).map_err(Into::into)
            });
            match written {
                Ok(()) => report.written.push(key),
                Err(err) => {
                    error!(
                        "event=snapshot_write module=service status=error key={} error={}",
                        key, err
                    );
                    self.ui.set_error(PERSISTENCE_ERROR_KEY, err.to_string());
                    report.failed.push(key);
                    last_error = Some(err);
                }
            }
        }

        if let Some(err) = last_error {
            self.ui
                .push_toast(ToastKind::Error, format!("Could not save changes: {err}"));
        } else if !report.written.is_empty() {
            self.ui.clear_error(PERSISTENCE_ERROR_KEY);
            info!(
                "event=snapshot_write module=service status=ok keys={}",
                report.written.len()
            );
        }
        report
    }

    fn mark_dirty(&mut self, keys: &[StorageKey]) {
        self.scheduler.mark_dirty(keys, Instant::now());
    }

    fn settle<T>(
        &mut self,
        result: StoreResult<T>,
        error_key: &str,
        keys: &[StorageKey],
    ) -> StoreResult<T> {
        match result {
            Ok(value) => {
                self.ui.clear_error(error_key);
                self.mark_dirty(keys);
                Ok(value)
            }
            Err(err) => Err(self.report_rejection(error_key, err)),
        }
    }

    fn settle_optional<T>(
        &mut self,
        result: StoreResult<Option<T>>,
        error_key: &str,
        keys: &[StorageKey],
    ) -> StoreResult<Option<T>> {
        match result {
            Ok(Some(value)) => {
                self.ui.clear_error(error_key);
                self.mark_dirty(keys);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(err) => Err(self.report_rejection(error_key, err)),
        }
    }

    fn report_rejection(&mut self, error_key: &str, err: StoreError) -> StoreError {
        self.ui.set_error(error_key, err.to_string());
        self.ui.push_toast(ToastKind::Warning, err.to_string());
        err
    }
}
