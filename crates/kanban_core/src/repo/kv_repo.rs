//! Key/value repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide a local-storage style string store keyed by fixed names.
//! - Enforce an optional byte quota so oversized writes fail explicitly.
//!
//! # Invariants
//! - Usage is measured as the UTF-8 length of every key plus its value.
//! - A rejected write leaves the previous value untouched.
//! - Overwriting a key only counts the size difference against the quota.
//! - A batch is applied in one transaction: all entries land or none do.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type KvResult<T> = Result<T, KvError>;

/// One batch entry: `Some(value)` writes the key, `None` removes it.
pub type KvEntry<'a> = (&'a str, Option<&'a str>);

/// Key/value persistence errors.
#[derive(Debug)]
pub enum KvError {
    Db(DbError),
    /// Writing `key` would push usage past the configured quota.
    QuotaExceeded {
        key: String,
        needed_bytes: u64,
        quota_bytes: u64,
    },
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded {
                key,
                needed_bytes,
                quota_bytes,
            } => write!(
                f,
                "storage quota exceeded writing `{key}`: needs {needed_bytes} bytes, quota is {quota_bytes}"
            ),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for string key/value storage.
pub trait KvRepository {
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    /// Returns whether the key existed.
    fn remove(&self, key: &str) -> KvResult<bool>;
    /// All keys, sorted.
    fn keys(&self) -> KvResult<Vec<String>>;
    /// Current usage in bytes.
    fn used_bytes(&self) -> KvResult<u64>;
    /// Applies every entry atomically. The quota is checked against the
    /// state after the whole batch.
    fn write_batch(&self, entries: &[KvEntry<'_>]) -> KvResult<()>;

    /// Removes every key containing any of `needles`. Returns removed keys.
    fn remove_matching(&self, needles: &[&str]) -> KvResult<Vec<String>> {
        let mut removed = Vec::new();
        for key in self.keys()? {
            if needles.iter().any(|needle| key.contains(needle)) && self.remove(&key)? {
                removed.push(key);
            }
        }
        Ok(removed)
    }
}

impl<R: KvRepository + ?Sized> KvRepository for &R {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> KvResult<bool> {
        (**self).remove(key)
    }

    fn keys(&self) -> KvResult<Vec<String>> {
        (**self).keys()
    }

    fn used_bytes(&self) -> KvResult<u64> {
        (**self).used_bytes()
    }

    fn write_batch(&self, entries: &[KvEntry<'_>]) -> KvResult<()> {
        (**self).write_batch(entries)
    }
}

/// SQLite-backed key/value repository.
pub struct SqliteKvRepository<'conn> {
    conn: &'conn Connection,
    quota_bytes: Option<u64>,
}

impl<'conn> SqliteKvRepository<'conn> {
    /// Repository without a quota.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            quota_bytes: None,
        }
    }

    /// Repository rejecting writes once usage would exceed `quota_bytes`.
    pub fn with_quota(conn: &'conn Connection, quota_bytes: Option<u64>) -> Self {
        Self { conn, quota_bytes }
    }

    fn entry_bytes(&self, key: &str) -> KvResult<u64> {
        let size: Option<i64> = self
            .conn
            .query_row(
                "SELECT length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))
                 FROM kv_store
                 WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(size.unwrap_or(0).max(0) as u64)
    }

    /// Rejects a write that frees `replaced` bytes and adds `incoming`.
    fn ensure_fits(&self, key: &str, replaced: u64, incoming: u64) -> KvResult<()> {
        let Some(quota_bytes) = self.quota_bytes else {
            return Ok(());
        };
        let needed_bytes = self.used_bytes()?.saturating_sub(replaced) + incoming;
        if needed_bytes > quota_bytes {
            return Err(KvError::QuotaExceeded {
                key: key.to_string(),
                needed_bytes,
                quota_bytes,
            });
        }
        Ok(())
    }
}

fn upsert(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at)
         VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at;",
        params![key, value],
    )?;
    Ok(())
}

impl KvRepository for SqliteKvRepository<'_> {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1;", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let incoming = (key.len() + value.len()) as u64;
        self.ensure_fits(key, self.entry_bytes(key)?, incoming)?;
        upsert(self.conn, key, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }

    fn keys(&self) -> KvResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_store ORDER BY key ASC;")?;
        let mut rows = stmt.query([])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }

    fn write_batch(&self, entries: &[KvEntry<'_>]) -> KvResult<()> {
        let mut replaced = 0;
        let mut incoming = 0;
        for (key, value) in entries {
            replaced += self.entry_bytes(key)?;
            if let Some(value) = value {
                incoming += (key.len() + value.len()) as u64;
            }
        }
        let written: Vec<&str> = entries
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(key, _)| *key)
            .collect();
        self.ensure_fits(&written.join(","), replaced, incoming)?;

        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            match value {
                Some(value) => upsert(&tx, key, value)?,
                None => {
                    tx.execute("DELETE FROM kv_store WHERE key = ?1;", [key])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn used_bytes(&self) -> KvResult<u64> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
             FROM kv_store;",
            [],
            |row| row.get(0),
        )?;
        Ok(used.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::{KvError, KvRepository, SqliteKvRepository};
    use crate::db::open_db_in_memory;

    #[test]
    fn set_get_remove() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteKvRepository::new(&conn);

        assert_eq!(repo.get("kanban-boards").unwrap(), None);
        repo.set("kanban-boards", "{}").unwrap();
        repo.set("kanban-boards", "{\"boards\":[]}").unwrap();
        assert_eq!(
            repo.get("kanban-boards").unwrap().as_deref(),
            Some("{\"boards\":[]}")
        );
        assert!(repo.remove("kanban-boards").unwrap());
        assert!(!repo.remove("kanban-boards").unwrap());
    }

    #[test]
    fn quota_counts_overwrites_as_difference() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteKvRepository::with_quota(&conn, Some(10));

        repo.set("k", "12345").unwrap();
        assert_eq!(repo.used_bytes().unwrap(), 6);
        repo.set("k", "123456789").unwrap();

        let err = repo.set("k", "1234567890").unwrap_err();
        assert!(matches!(
            err,
            KvError::QuotaExceeded {
                needed_bytes: 11,
                quota_bytes: 10,
                ..
            }
        ));
        assert_eq!(repo.get("k").unwrap().as_deref(), Some("123456789"));
    }

    #[test]
    fn batch_is_all_or_nothing_under_quota() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteKvRepository::with_quota(&conn, Some(24));
        repo.set("a", "1234567890").unwrap();
        repo.set("b", "12345").unwrap();

        let err = repo
            .write_batch(&[("a", None), ("c", Some("x".repeat(30).as_str()))])
            .unwrap_err();
        assert!(matches!(err, KvError::QuotaExceeded { ref key, .. } if key == "c"));
        assert_eq!(repo.get("a").unwrap().as_deref(), Some("1234567890"));
        assert_eq!(repo.get("c").unwrap(), None);

        // Removing `a` frees enough room for `c` within the same batch.
        repo.write_batch(&[("a", None), ("c", Some("123456789012"))])
            .unwrap();
        assert_eq!(repo.keys().unwrap(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(repo.used_bytes().unwrap(), 19);
    }

    #[test]
    fn remove_matching_only_touches_matching_keys() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteKvRepository::new(&conn);
        for key in ["kanban-tasks", "chart-cache", "temp-upload", "kanban-tags"] {
            repo.set(key, "x").unwrap();
        }

        let removed = repo.remove_matching(&["cache", "temp"]).unwrap();
        assert_eq!(removed, vec!["chart-cache".to_string(), "temp-upload".to_string()]);
        assert_eq!(
            repo.keys().unwrap(),
            vec!["kanban-tags".to_string(), "kanban-tasks".to_string()]
        );
    }
}
