//! SQLite implementation of the store traits.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite;
//! every call runs on the blocking pool via `tokio::task::spawn_blocking`
//! and holds the connection mutex for its duration, so an append and the
//! index update it implies are never observed half-done.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use chronostate_core::{
    ActionKind, ActionRecord, ActionRef, DeviceName, FileStateRecord, Fingerprint, Name,
    SyncNodeView, Version,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ActionLog, FileStateIndex, NewAction, ObjectStore, SyncStateSource};

/// SQLite-based store implementation.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

fn conversion_error(col: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
}

fn name_column(row: &rusqlite::Row<'_>, col: usize) -> rusqlite::Result<Name> {
    let uri: String = row.get(col)?;
    Name::parse(&uri).map_err(|e| conversion_error(col, e))
}

fn fingerprint_column(row: &rusqlite::Row<'_>, col: usize) -> rusqlite::Result<Option<Fingerprint>> {
    let bytes: Option<Vec<u8>> = row.get(col)?;
    bytes
        .map(|b| Fingerprint::try_from(b.as_slice()))
        .transpose()
        .map_err(|e| conversion_error(col, e))
}

const ACTION_COLUMNS: &str = "log_position, device_name, seq_no, kind, filename, version,
     timestamp, fingerprint, file_mtime, file_mode, file_seg_num,
     parent_device_name, parent_seq_no";

fn row_to_action(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActionRecord> {
    let kind: String = row.get(3)?;
    let kind = ActionKind::parse(&kind).ok_or_else(|| {
        conversion_error(3, StoreError::InvalidData(format!("unknown action kind {kind:?}")))
    })?;

    let parent_device: Option<String> = row.get(11)?;
    let parent_seq: Option<i64> = row.get(12)?;
    let parent = match (parent_device, parent_seq) {
        (Some(device), Some(seq_no)) => Some(ActionRef {
            device: Name::parse(&device).map_err(|e| conversion_error(11, e))?,
            seq_no: seq_no as u64,
        }),
        _ => None,
    };

    Ok(ActionRecord {
        log_position: row.get::<_, i64>(0)? as u64,
        device: name_column(row, 1)?,
        seq_no: row.get::<_, i64>(2)? as u64,
        kind,
        filename: row.get(4)?,
        version: row.get::<_, i64>(5)? as u64,
        timestamp: row.get(6)?,
        fingerprint: fingerprint_column(row, 7)?,
        mtime: row.get(8)?,
        mode: row.get::<_, i64>(9)? as u32,
        segment_count: row.get::<_, i64>(10)? as u64,
        parent,
    })
}

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileStateRecord> {
    let fingerprint = fingerprint_column(row, 2)?.ok_or_else(|| {
        conversion_error(2, StoreError::InvalidData("file_state without fingerprint".into()))
    })?;
    Ok(FileStateRecord {
        filename: row.get(0)?,
        version: row.get::<_, i64>(1)? as u64,
        fingerprint,
        owner: ActionRef {
            device: name_column(row, 3)?,
            seq_no: row.get::<_, i64>(4)? as u64,
        },
        mtime: row.get(5)?,
        mode: row.get::<_, i64>(6)? as u32,
        segment_count: row.get::<_, i64>(7)? as u64,
    })
}

const FILE_COLUMNS: &str = "filename, version, fingerprint, owner_device_name, owner_seq_no,
     file_mtime, file_mode, file_seg_num";

fn upsert_file_row(conn: &Connection, record: &FileStateRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO file_state (
            filename, version, fingerprint, owner_device_name, owner_seq_no,
            file_mtime, file_mode, file_seg_num
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.filename,
            record.version as i64,
            record.fingerprint.0.as_slice(),
            record.owner.device.to_string(),
            record.owner.seq_no as i64,
            record.mtime,
            record.mode as i64,
            record.segment_count as i64,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl ActionLog for SqliteStore {
    async fn append_action(&self, action: NewAction) -> Result<ActionRecord> {
        action.validate()?;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let device_uri = action.device.to_string();

            let parent: Option<(String, i64, i64)> = tx
                .query_row(
                    "SELECT device_name, seq_no, version FROM actions
                     WHERE filename = ?1 ORDER BY log_position DESC LIMIT 1",
                    params![action.filename],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let version = match (action.version, &parent) {
                (Some(v), _) => v,
                (None, Some((_, _, v))) => *v as u64 + 1,
                (None, None) => 0,
            };

            let seq_no = match action.seq_no {
                Some(seq) => seq,
                None => tx
                    .query_row(
                        "SELECT seq_no FROM sync_nodes WHERE device_name = ?1",
                        params![device_uri],
                        |row| row.get::<_, Option<i64>>(0),
                    )
                    .optional()?
                    .flatten()
                    .map_or(0, |seq| seq as u64 + 1),
            };

            tx.execute(
                "INSERT INTO actions (
                    device_name, seq_no, kind, filename, version, timestamp, fingerprint,
                    file_mtime, file_mode, file_seg_num, parent_device_name, parent_seq_no
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    device_uri,
                    seq_no as i64,
                    action.kind.as_str(),
                    action.filename,
                    version as i64,
                    action.timestamp,
                    action.fingerprint.as_ref().map(|f| f.0.to_vec()),
                    action.mtime,
                    action.mode as i64,
                    action.segment_count as i64,
                    parent.as_ref().map(|(d, _, _)| d.clone()),
                    parent.as_ref().map(|(_, s, _)| *s),
                ],
            )?;
            let log_position = tx.last_insert_rowid();

            let current: Option<i64> = tx
                .query_row(
                    "SELECT version FROM file_state WHERE filename = ?1",
                    params![action.filename],
                    |row| row.get(0),
                )
                .optional()?;

            let record = tx.query_row(
                &format!("SELECT {ACTION_COLUMNS} FROM actions WHERE log_position = ?1"),
                params![log_position],
                row_to_action,
            )?;

            if current.map_or(true, |v| v as u64 <= record.version) {
                match (record.kind, record.fingerprint) {
                    (ActionKind::Update, Some(fingerprint)) => {
                        upsert_file_row(
                            &tx,
                            &FileStateRecord {
                                filename: record.filename.clone(),
                                version: record.version,
                                fingerprint,
                                owner: record.action_ref(),
                                mtime: record.mtime,
                                mode: record.mode,
                                segment_count: record.segment_count,
                            },
                        )?;
                    }
                    _ => {
                        tx.execute(
                            "DELETE FROM file_state WHERE filename = ?1",
                            params![record.filename],
                        )?;
                    }
                }
            }

            tx.execute(
                "INSERT INTO sync_nodes (device_name, seq_no) VALUES (?1, ?2)
                 ON CONFLICT(device_name) DO UPDATE
                 SET seq_no = MAX(IFNULL(seq_no, excluded.seq_no), excluded.seq_no)",
                params![device_uri, seq_no as i64],
            )?;

            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn scan_actions(&self, filename: Option<&str>) -> Result<Vec<ActionRecord>> {
        let filename = filename.map(String::from);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACTION_COLUMNS} FROM actions
                 WHERE (?1 IS NULL OR filename = ?1)
                 ORDER BY timestamp DESC, log_position DESC"
            ))?;

            let actions = stmt
                .query_map(params![filename], row_to_action)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(actions)
        })
        .await
    }

    async fn action_count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM actions", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}

#[async_trait]
impl FileStateIndex for SqliteStore {
    async fn list_files(&self) -> Result<Vec<FileStateRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FILE_COLUMNS} FROM file_state ORDER BY filename"
            ))?;
            let files = stmt
                .query_map([], row_to_file)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(files)
        })
        .await
    }

    async fn get_file(&self, filename: &str) -> Result<Option<FileStateRecord>> {
        let filename = filename.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {FILE_COLUMNS} FROM file_state WHERE filename = ?1"),
                params![filename],
                row_to_file,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn upsert_file(&self, record: &FileStateRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| upsert_file_row(conn, &record)).await
    }

    async fn remove_file(&self, filename: &str) -> Result<bool> {
        let filename = filename.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM file_state WHERE filename = ?1",
                params![filename],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}

#[async_trait]
impl ObjectStore for SqliteStore {
    async fn put_object(&self, content: Bytes) -> Result<Fingerprint> {
        let fingerprint = Fingerprint::of(&content);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO objects (fingerprint, content) VALUES (?1, ?2)",
                params![fingerprint.0.as_slice(), content.as_ref()],
            )?;
            Ok(fingerprint)
        })
        .await
    }

    async fn get_object(&self, fingerprint: &Fingerprint) -> Result<Option<Bytes>> {
        let fingerprint = *fingerprint;
        self.with_conn(move |conn| {
            let content: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT content FROM objects WHERE fingerprint = ?1",
                    params![fingerprint.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(content.map(Bytes::from))
        })
        .await
    }

    async fn lookup_version(&self, filename: &str, version: Version) -> Result<Option<Fingerprint>> {
        let filename = filename.to_string();
        self.with_conn(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT fingerprint FROM actions
                     WHERE filename = ?1 AND version = ?2 AND kind = 'update'
                     ORDER BY log_position DESC LIMIT 1",
                    params![filename, version as i64],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(bytes
                .map(|b| Fingerprint::try_from(b.as_slice()))
                .transpose()?)
        })
        .await
    }
}

#[async_trait]
impl SyncStateSource for SqliteStore {
    async fn sync_nodes(&self) -> Result<Vec<SyncNodeView>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT device_name, seq_no, forwarding_hint FROM sync_nodes",
            )?;
            let mut nodes = stmt
                .query_map([], |row| {
                    let hint: Option<String> = row.get(2)?;
                    Ok(SyncNodeView {
                        device: name_column(row, 0)?,
                        seq_no: row.get::<_, Option<i64>>(1)?.map(|seq| seq as u64),
                        forwarding_hint: hint
                            .map(|h| Name::parse(&h))
                            .transpose()
                            .map_err(|e| conversion_error(2, e))?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            // URI text order is not component order.
            nodes.sort_by(|a, b| a.device.cmp(&b.device));
            Ok(nodes)
        })
        .await
    }

    async fn set_forwarding_hint(&self, device: &DeviceName, hint: Option<Name>) -> Result<()> {
        let device = device.to_string();
        let hint = hint.map(|h| h.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sync_nodes (device_name, forwarding_hint) VALUES (?1, ?2)
                 ON CONFLICT(device_name) DO UPDATE SET forwarding_hint = excluded.forwarding_hint",
                params![device, hint],
            )?;
            Ok(())
        })
        .await
    }
}
