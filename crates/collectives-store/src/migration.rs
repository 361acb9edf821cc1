//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch that transforms the schema from version
//! N to N+1.

use rusqlite::Connection;

use collectives_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: calling it on an up-to-date database does nothing.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: share grants and retired tokens.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Active share grants, at most one per collective
        CREATE TABLE share_grants (
            token BLOB PRIMARY KEY,             -- 32 bytes
            collective_id INTEGER NOT NULL UNIQUE,
            tier INTEGER NOT NULL,              -- 0=read_only, 1=edit
            created_at INTEGER NOT NULL,        -- Unix ms
            updated_at INTEGER NOT NULL         -- Unix ms
        );

        -- Deleted tokens, kept by blake3 digest so they are never issued again
        CREATE TABLE retired_tokens (
            token_digest BLOB PRIMARY KEY,      -- 32 bytes
            retired_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}
