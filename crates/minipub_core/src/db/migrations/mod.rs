//! Record store schema steps.
//!
//! # Responsibility
//! - List the schema steps of the record store, oldest first.
//! - Bring a connection from its stored version up to `latest_version()`.
//!
//! # Invariants
//! - Step versions start at 1 and grow by one.
//! - All pending steps run in one transaction; `PRAGMA user_version` follows
//!   each step inside it, so a failed step leaves the store at its old version.
//! - A store newer than this binary is refused, never downgraded.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

/// One schema step of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStep {
    pub version: u32,
    pub name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "records",
        sql: include_str!("0001_records.sql"),
    },
    SchemaStep {
        version: 2,
        name: "seo",
        sql: include_str!("0002_seo.sql"),
    },
];

/// Schema version a freshly migrated store ends up at.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Steps still missing from a store at `stored_version`.
pub fn pending_steps(stored_version: u32) -> &'static [SchemaStep] {
    let first_pending = SCHEMA_STEPS.partition_point(|step| step.version <= stored_version);
    &SCHEMA_STEPS[first_pending..]
}

/// Runs every pending step and returns the versions that were applied.
///
/// # Side effects
/// - Emits one `db_migrate` start/ok pair per step, or an error event for the
///   step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<u32>> {
    let stored_version = stored_user_version(conn)?;
    let latest = latest_version();
    if stored_version > latest {
        error!(
            "event=db_migrate module=db status=error stored_version={stored_version} latest={latest} error_code=schema_too_new"
        );
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stored_version,
            latest_supported: latest,
        });
    }

    let pending = pending_steps(stored_version);
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let tx = conn.transaction()?;
    for step in pending {
        let started_at = Instant::now();
        info!(
            "event=db_migrate module=db status=start version={} name={}",
            step.version, step.name
        );
        let applied = tx
            .execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version));
        if let Err(err) = applied {
            error!(
                "event=db_migrate module=db status=error version={} name={} duration_ms={} error_code=db_migrate_failed error={err}",
                step.version,
                step.name,
                started_at.elapsed().as_millis()
            );
            return Err(err.into());
        }
        info!(
            "event=db_migrate module=db status=ok version={} name={} duration_ms={}",
            step.version,
            step.name,
            started_at.elapsed().as_millis()
        );
    }
    tx.commit()?;

    Ok(pending.iter().map(|step| step.version).collect())
}

fn stored_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
