//! Schema steps for the key/value store file.
//!
//! Each step is a named SQL script. The number of steps already applied
//! lives in `PRAGMA user_version`, so a store file opened by an older
//! binary is upgraded in place and one written by a newer binary is
//! refused instead of being misread.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "kv_store",
    sql: include_str!("0001_kv_store.sql"),
}];

/// Schema version produced by the last known step.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Schema version recorded in the store file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn steps_after(version: u32) -> impl Iterator<Item = &'static SchemaStep> {
    SCHEMA_STEPS.iter().filter(move |step| step.version > version)
}

/// Brings the store file up to [`latest_version`] in one transaction.
///
/// Returns the names of the steps that ran; empty when already current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<&'static str>> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let mut applied = Vec::new();
    let tx = conn.transaction()?;
    for step in steps_after(from_version) {
        debug!(
            "event=db_migrate_step module=db status=start version={} name={}",
            step.version, step.name
        );
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        applied.push(step.name);
    }
    tx.commit()?;

    if !applied.is_empty() {
        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
            from_version,
            latest,
            applied.join(",")
        );
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, schema_version, SCHEMA_STEPS};
    use rusqlite::Connection;

    #[test]
    fn step_versions_increase_by_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version, index as u32 + 1, "step {}", step.name);
        }
    }

    #[test]
    fn second_run_applies_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        assert_eq!(apply_migrations(&mut conn).unwrap(), vec!["kv_store"]);
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
        assert!(apply_migrations(&mut conn).unwrap().is_empty());
    }
}
