//! Snapshot persistence for the four registries.
//!
//! # Responsibility
//! - Map each persisted registry to its fixed storage key.
//! - Encode/decode registry state as JSON blobs.
//! - Batch blobs into export documents and split them back on import.
//! - Coalesce writes behind an idle delay.
//!
//! # Invariants
//! - Each key holds exactly one registry's full state.
//! - Import validates every blob before writing any of them.
//! - Import writes all four keys in one batch, or none of them.
//! - An imported task or column always references an imported board.
//! - Rehydration recounts every board from the task registry.

pub mod scheduler;
pub mod snapshot;

use crate::repo::kv_repo::{KvEntry, KvError, KvRepository, KvResult};
use crate::store::Registries;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub use scheduler::SaveScheduler;
pub use snapshot::{
    export_document, import_document, load_registries, ExportDocument, EXPORT_VERSION,
};

pub type PersistResult<T> = Result<T, PersistError>;

/// Substrings of keys that may be dropped to recover from a full store.
pub const DISPOSABLE_KEY_MARKERS: [&str; 2] = ["cache", "temp"];

/// Fixed storage key of one persisted registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageKey {
    Boards,
    Tasks,
    Columns,
    Tags,
}

impl StorageKey {
    pub const ALL: [StorageKey; 4] = [Self::Boards, Self::Tasks, Self::Columns, Self::Tags];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boards => "kanban-boards",
            Self::Tasks => "kanban-tasks",
            Self::Columns => "kanban-columns",
            Self::Tags => "kanban-tags",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == value)
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot encoding, storage and import errors.
#[derive(Debug)]
pub enum PersistError {
    Kv(KvError),
    /// Blob under `key` is not valid registry JSON.
    Json {
        key: String,
        source: serde_json::Error,
    },
    /// Export document was produced by an unknown format version.
    UnsupportedVersion(u32),
    /// Export document carries a key outside the fixed set.
    UnknownKey(String),
    /// Tasks or columns in an export document point at boards it lacks.
    OrphanedRecords(Vec<Uuid>),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kv(err) => write!(f, "{err}"),
            Self::Json { key, source } => write!(f, "invalid JSON for `{key}`: {source}"),
            Self::UnsupportedVersion(version) => write!(
                f,
                "unsupported export version {version}; expected {EXPORT_VERSION}"
            ),
            Self::UnknownKey(key) => write!(f, "unknown storage key `{key}`"),
            Self::OrphanedRecords(ids) => write!(
                f,
                "{} task(s) or column(s) reference boards missing from the import",
                ids.len()
            ),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            Self::Json { source, .. } => Some(source),
            Self::UnsupportedVersion(_) | Self::UnknownKey(_) | Self::OrphanedRecords(_) => None,
        }
    }
}

impl From<KvError> for PersistError {
    fn from(value: KvError) -> Self {
        Self::Kv(value)
    }
}

/// Serializes the registry stored under `key`.
pub fn encode_registry(registries: &Registries, key: StorageKey) -> PersistResult<String> {
    let encoded = match key {
        StorageKey::Boards => serde_json::to_string(&registries.boards),
        StorageKey::Tasks => serde_json::to_string(&registries.tasks),
        StorageKey::Columns => serde_json::to_string(&registries.columns),
        StorageKey::Tags => serde_json::to_string(&registries.tags),
    };
    encoded.map_err(|source| PersistError::Json {
        key: key.as_str().to_string(),
        source,
    })
}

/// Replaces the registry stored under `key` with the decoded blob.
pub fn decode_registry(
    registries: &mut Registries,
    key: StorageKey,
    blob: &str,
) -> PersistResult<()> {
    let json_err = |source| PersistError::Json {
        key: key.as_str().to_string(),
        source,
    };
    match key {
        StorageKey::Boards => registries.boards = serde_json::from_str(blob).map_err(json_err)?,
        StorageKey::Tasks => registries.tasks = serde_json::from_str(blob).map_err(json_err)?,
        StorageKey::Columns => {
            registries.columns = serde_json::from_str(blob).map_err(json_err)?
        }
        StorageKey::Tags => registries.tags = serde_json::from_str(blob).map_err(json_err)?,
    }
    Ok(())
}

/// Writes one blob, freeing disposable keys and retrying once on a full
/// store.
pub fn write_with_cleanup<R: KvRepository>(repo: &R, key: &str, value: &str) -> KvResult<()> {
    retry_after_cleanup(repo, key, || repo.set(key, value))
}

/// Applies a whole batch atomically with the same single cleanup retry.
pub fn write_batch_with_cleanup<R: KvRepository>(
    repo: &R,
    entries: &[KvEntry<'_>],
) -> KvResult<()> {
    retry_after_cleanup(repo, "batch", || repo.write_batch(entries))
}

fn retry_after_cleanup<R, F>(repo: &R, label: &str, write: F) -> KvResult<()>
where
    R: KvRepository,
    F: Fn() -> KvResult<()>,
{
    match write() {
        Err(KvError::QuotaExceeded { .. }) => {
            let removed = repo.remove_matching(&DISPOSABLE_KEY_MARKERS)?;
            warn!(
                "event=storage_cleanup module=persist status=retry key={} removed_keys={}",
                label,
                removed.len()
            );
            write()
        }
        other => other,
    }
}
