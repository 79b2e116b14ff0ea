//! Export/import documents and registry rehydration.

use crate::model::now_epoch_ms;
use crate::persist::{
    decode_registry, write_batch_with_cleanup, PersistError, PersistResult, StorageKey,
};
use crate::repo::kv_repo::{KvEntry, KvRepository};
use crate::store::Registries;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const EXPORT_VERSION: u32 = 1;

/// The four registry blobs batched into one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: i64,
    /// Storage key → registry blob. Keys never written are omitted.
    pub data: BTreeMap<String, serde_json::Value>,
}

impl ExportDocument {
    pub fn from_json_str(value: &str) -> PersistResult<Self> {
        serde_json::from_str(value).map_err(|source| PersistError::Json {
            key: "export".to_string(),
            source,
        })
    }

    pub fn to_json_pretty(&self) -> PersistResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| PersistError::Json {
            key: "export".to_string(),
            source,
        })
    }
}

/// Collects every stored registry blob into one document.
pub fn export_document<R: KvRepository>(repo: &R) -> PersistResult<ExportDocument> {
    let mut data = BTreeMap::new();
    for key in StorageKey::ALL {
        let Some(blob) = repo.get(key.as_str())? else {
            continue;
        };
        let value = serde_json::from_str(&blob).map_err(|source| PersistError::Json {
            key: key.as_str().to_string(),
            source,
        })?;
        data.insert(key.as_str().to_string(), value);
    }

    info!(
        "event=snapshot_export module=persist status=ok keys={}",
        data.len()
    );
    Ok(ExportDocument {
        version: EXPORT_VERSION,
        exported_at: now_epoch_ms(),
        data,
    })
}

/// Writes a document back under the fixed keys and rehydrates from storage.
///
/// Every blob is decoded and cross-checked before anything is written, and
/// the write itself is one atomic batch. Fixed keys absent from the
/// document are removed so storage mirrors the document exactly.
pub fn import_document<R: KvRepository>(
    repo: &R,
    document: &ExportDocument,
) -> PersistResult<Registries> {
    if document.version != EXPORT_VERSION {
        return Err(PersistError::UnsupportedVersion(document.version));
    }

    let mut staged = BTreeMap::new();
    let mut scratch = Registries::new();
    for (name, value) in &document.data {
        let key = StorageKey::parse(name).ok_or_else(|| PersistError::UnknownKey(name.clone()))?;
        let blob = value.to_string();
        decode_registry(&mut scratch, key, &blob)?;
        staged.insert(key, blob);
    }

    let orphans = scratch.orphan_ids();
    if !orphans.is_empty() {
        return Err(PersistError::OrphanedRecords(orphans));
    }

    let entries: Vec<KvEntry<'_>> = StorageKey::ALL
        .iter()
        .map(|key| (key.as_str(), staged.get(key).map(String::as_str)))
        .collect();
    write_batch_with_cleanup(repo, &entries)?;

    info!(
        "event=snapshot_import module=persist status=ok keys={}",
        staged.len()
    );
    load_registries(repo)
}

/// Rebuilds the registries from storage; missing keys yield empty
/// registries. Board counters are recomputed from the loaded tasks.
pub fn load_registries<R: KvRepository>(repo: &R) -> PersistResult<Registries> {
    let mut registries = Registries::new();
    for key in StorageKey::ALL {
        if let Some(blob) = repo.get(key.as_str())? {
            decode_registry(&mut registries, key, &blob)?;
        }
    }
    registries.recount_all();
    Ok(registries)
}
