//! SQLite-backed key/value and history store.
//!
//! One database file holds both the `kv` table (result cache payloads with
//! an expiry column) and the `history` table. Thread-safe via an internal
//! `Mutex<Connection>`; WAL mode lets other processes read concurrently.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::schema::{apply_schema, read_schema_version};
use super::{DEFAULT_HISTORY_LIMIT, HistoryEntry, HistoryStore, KeyValueStore, StoreError};

/// Persistent store backed by a single SQLite file.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
    history_limit: usize,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent
    /// directories and applying the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            history_limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    /// Keep at most `limit` history entries.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored schema version.
    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// Delete every expired key/value row. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let removed = self.lock()?.execute(
            "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now_ms()],
        )?;
        Ok(removed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::LockPoisoned("sqlite connection"))
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.lock()?;
        let row: Option<(Vec<u8>, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((_, Some(expires_at))) if expires_at <= now_ms() => {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|ttl| {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            now_ms().saturating_add(ttl_ms)
        });
        self.lock()?.execute(
            "INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, value, expires_at],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock()?.execute("DELETE FROM kv", [])?;
        Ok(())
    }
}

impl HistoryStore for SqliteStore {
    fn append(&self, query: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        // REPLACE assigns a fresh rowid, which orders same-millisecond repeats.
        conn.execute(
            "INSERT OR REPLACE INTO history (query, submitted_at) VALUES (?1, ?2)",
            params![query, now_ms()],
        )?;
        let limit = i64::try_from(self.history_limit).unwrap_or(i64::MAX);
        conn.execute(
            "DELETE FROM history WHERE rowid NOT IN \
             (SELECT rowid FROM history ORDER BY submitted_at DESC, rowid DESC LIMIT ?1)",
            params![limit],
        )?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT query, submitted_at FROM history ORDER BY submitted_at, rowid")?;
        let rows = stmt.query_map([], |row| {
            let query: String = row.get(0)?;
            let ms: i64 = row.get(1)?;
            Ok((query, ms))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (query, ms) = row?;
            entries.push(HistoryEntry {
                query,
                timestamp: DateTime::from_timestamp_millis(ms).unwrap_or_default(),
            });
        }
        Ok(entries)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock()?.execute("DELETE FROM history", [])?;
        Ok(())
    }
}
