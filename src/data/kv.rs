//! Key/value data access object

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

/// A stored key/value row
#[derive(Debug, Clone, PartialEq)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub stored_at: DateTime<Utc>,
}

/// Data access object for the `kv_entries` table
#[derive(Clone)]
pub struct KvStore {
    conn: Arc<Mutex<Connection>>,
}

impl KvStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-query; the
        // connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace a value
    pub fn put(&self, key: &str, value: &str) -> SqliteResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO kv_entries (key, value, stored_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, stored_at = ?3",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> SqliteResult<Option<String>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT value FROM kv_entries WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
    }

    /// Get the full row for a key
    pub fn entry(&self, key: &str) -> SqliteResult<Option<KvEntry>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT key, value, stored_at FROM kv_entries WHERE key = ?1",
            params![key],
            Self::row_to_entry,
        )
        .optional()
    }

    /// Count stored keys
    pub fn len(&self) -> SqliteResult<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> SqliteResult<bool> {
        Ok(self.len()? == 0)
    }

    fn row_to_entry(row: &rusqlite::Row) -> SqliteResult<KvEntry> {
        let stored_at_str: String = row.get(2)?;
        let stored_at = DateTime::parse_from_rfc3339(&stored_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Ok(KvEntry {
            key: row.get(0)?,
            value: row.get(1)?,
            stored_at,
        })
    }
}
