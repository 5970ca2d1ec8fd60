//! SQLite schema for the state store.
//!
//! Schema changes are listed in [`MIGRATIONS`], one SQL batch per version.
//! Opening a database applies whichever of them are newer than the version
//! recorded in `schema_migrations`, inside one transaction.

use rusqlite::{params, Connection, Transaction};

use crate::error::{Result, StoreError};

/// Every schema version, oldest first.
const MIGRATIONS: &[(u32, &str)] = &[(1, SCHEMA_V1)];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = 1;

/// Bring `conn` up to [`CURRENT_VERSION`]. Safe to call on every open.
///
/// Fails with [`StoreError::Migration`] if the database was written by a
/// newer schema.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let applied: u32 = conn.query_row(
        "SELECT IFNULL(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    if applied > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{applied} is newer than supported v{CURRENT_VERSION}"
        )));
    }
    if applied == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
        apply(&tx, *version, sql)?;
    }
    tx.commit()?;

    tracing::debug!(from = applied, to = CURRENT_VERSION, "migrated state schema");
    Ok(())
}

fn apply(tx: &Transaction<'_>, version: u32, sql: &str) -> Result<()> {
    tx.execute_batch(sql)
        .map_err(|e| StoreError::Migration(format!("v{version}: {e}")))?;
    tx.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, applied_at()],
    )?;
    Ok(())
}

/// v1: action log, file state, objects, sync nodes.
const SCHEMA_V1: &str = r#"
        -- Append-only action log; log_position is the insertion order
        CREATE TABLE actions (
            log_position INTEGER PRIMARY KEY AUTOINCREMENT,
            device_name TEXT NOT NULL,          -- name URI of the acting device
            seq_no INTEGER NOT NULL,
            kind TEXT NOT NULL,                 -- 'update' | 'delete'
            filename TEXT NOT NULL,
            version INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,         -- Unix ms
            fingerprint BLOB,                   -- 32 bytes, NULL for deletes
            file_mtime INTEGER NOT NULL DEFAULT 0,
            file_mode INTEGER NOT NULL DEFAULT 0,
            file_seg_num INTEGER NOT NULL DEFAULT 0,
            parent_device_name TEXT,
            parent_seq_no INTEGER
        );

        -- Current state of each tracked file
        CREATE TABLE file_state (
            filename TEXT PRIMARY KEY,
            version INTEGER NOT NULL,
            fingerprint BLOB NOT NULL,
            owner_device_name TEXT NOT NULL,
            owner_seq_no INTEGER NOT NULL,
            file_mtime INTEGER NOT NULL DEFAULT 0,
            file_mode INTEGER NOT NULL DEFAULT 0,
            file_seg_num INTEGER NOT NULL DEFAULT 0
        );

        -- Content-addressed objects
        CREATE TABLE objects (
            fingerprint BLOB PRIMARY KEY,
            content BLOB NOT NULL
        );

        -- Sync tree view
        CREATE TABLE sync_nodes (
            device_name TEXT PRIMARY KEY,
            seq_no INTEGER,                     -- NULL until the first action
            forwarding_hint TEXT
        );

        CREATE INDEX idx_actions_filename ON actions(filename, version);
        CREATE INDEX idx_actions_timestamp ON actions(timestamp, log_position);
        "#;

fn applied_at() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_fresh_database_gets_every_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables = table_names(&conn);
        for table in ["actions", "file_state", "objects", "sync_nodes", "schema_migrations"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
    }

    #[test]
    fn test_reopen_applies_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let rows: u32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, 0)",
            params![CURRENT_VERSION + 1],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
