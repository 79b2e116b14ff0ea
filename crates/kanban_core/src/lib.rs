//! Core domain logic for the kanban board.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod persist;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, KanbanConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{Board, BoardId, BoardPatch, TaskCounts};
pub use model::column::{Column, ColumnDraft, ColumnId, ColumnPatch};
pub use model::tag::{Tag, TagId, TagPatch};
pub use model::task::{Priority, SubTask, Task, TaskDraft, TaskId, TaskPatch};
pub use model::ModelValidationError;
pub use persist::{ExportDocument, PersistError, PersistResult, StorageKey};
pub use repo::kv_repo::{KvError, KvRepository, KvResult, SqliteKvRepository};
pub use service::kanban_service::{FlushReport, KanbanService};
pub use store::{Registries, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
