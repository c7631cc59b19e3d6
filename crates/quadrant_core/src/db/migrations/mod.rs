//! Schema versioning for the todo database.
//!
//! The schema version is stored in `PRAGMA user_version`. Step `n` of
//! [`STEPS`] upgrades a database from version `n - 1` to `n`; a file written
//! by a newer build is refused rather than opened with a schema this binary
//! does not know.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

/// Upgrade scripts; index `i` produces schema version `i + 1`.
const STEPS: &[&str] = &[include_str!("0001_init.sql")];

/// Schema version this binary writes.
pub fn latest_version() -> u32 {
    u32::try_from(STEPS.len()).unwrap_or(u32::MAX)
}

/// Brings `conn` up to [`latest_version`] in a single transaction.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is ahead of this build.
/// - `Sqlite` when a step fails; no partial upgrade is committed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }
    if from == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, script) in pending_steps(from) {
        tx.execute_batch(script)?;
        tx.pragma_update(None, "user_version", version)?;
        debug!(
            "event=db_migrate module=db status=ok from={} version={}",
            from, version
        );
    }
    tx.commit()?;
    Ok(())
}

fn pending_steps(from: u32) -> impl Iterator<Item = (u32, &'static str)> {
    (1u32..)
        .zip(STEPS.iter().copied())
        .filter(move |(version, _)| *version > from)
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{latest_version, pending_steps};

    #[test]
    fn fresh_database_runs_every_step_in_order() {
        let versions: Vec<u32> = pending_steps(0).map(|(version, _)| version).collect();
        assert_eq!(versions, (1..=latest_version()).collect::<Vec<_>>());
    }

    #[test]
    fn current_database_has_nothing_pending() {
        assert_eq!(pending_steps(latest_version()).count(), 0);
    }
}
