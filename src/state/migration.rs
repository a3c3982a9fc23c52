use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::schema;
use crate::error::{EngineError, Result};

/// Upgrade steps past the initial schema, in order: `(version, description, sql)`.
const STEPS: &[(i32, &str, &str)] = &[(2, "Exact decimal quantities", schema::MIGRATE_V2_SQL)];

/// Bring the database up to [`schema::SCHEMA_VERSION`].
///
/// A fresh database gets the current DDL directly. An older one replays
/// every step above its recorded version, each in its own transaction.
pub fn check_and_migrate(conn: &Connection) -> Result<()> {
    let Some(current) = recorded_version(conn)? else {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(schema::CREATE_TABLES_SQL)?;
        tx.execute_batch(schema::CREATE_INDEXES_SQL)?;
        record_version(&tx, schema::SCHEMA_VERSION, "Initial schema")?;
        tx.commit()?;
        debug!(version = schema::SCHEMA_VERSION, "Created maintrack schema");
        return Ok(());
    };

    if current > schema::SCHEMA_VERSION {
        return Err(EngineError::SchemaTooNew {
            found: current,
            supported: schema::SCHEMA_VERSION,
        });
    }

    for &(version, description, sql) in STEPS.iter().filter(|(v, _, _)| *v > current) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.execute_batch(schema::CREATE_INDEXES_SQL)?;
        record_version(&tx, version, description)?;
        tx.commit()?;
        info!(to = version, description, "Migrated maintrack schema");
    }
    Ok(())
}

/// `None` when the database has never been initialized.
fn recorded_version(conn: &Connection) -> Result<Option<i32>> {
    let tracked = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    if tracked.is_none() {
        return Ok(None);
    }
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(Some(version))
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        params![version, chrono::Utc::now(), description],
    )?;
    Ok(())
}
