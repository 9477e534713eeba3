//! SQLite connection handling

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

use super::migrations;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to create data directory: {0}")]
    CreateDir(std::io::Error),
    #[error("Lock poisoned")]
    LockPoisoned,
}

/// A migrated connection shared by the key/value stores.
/// Clones share the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    /// Backing file; `None` when in memory
    pub path: Option<PathBuf>,
}

impl Database {
    /// Open the file at `path`, creating parent directories and schema as needed
    pub fn open(path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(DatabaseError::CreateDir)?;
        }
        Self::migrated(Connection::open(&path)?, Some(path))
    }

    /// Private in-memory database, gone once the last clone drops
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::migrated(Connection::open_in_memory()?, None)
    }

    fn migrated(mut conn: Connection, path: Option<PathBuf>) -> Result<Self, DatabaseError> {
        migrations::run_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Run `f` against the locked connection
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, DatabaseError> {
        let guard = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(f(&guard)?)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "Database({})", path.display()),
            None => f.write_str("Database(:memory:)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("shares.db");
        let db = Database::open(db_path.clone()).unwrap();
        assert!(db_path.exists());
        assert_eq!(db.path.as_deref(), Some(db_path.as_path()));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shares.db");
        {
            let db = Database::open(db_path.clone()).unwrap();
            db.with_connection(|conn| {
                conn.execute(
                    "INSERT INTO kv_entries (key, value, stored_at) VALUES ('k', 'v', 'now')",
                    [],
                )
            })
            .unwrap();
        }

        let db = Database::open(db_path).unwrap();
        let value: String = db
            .with_connection(|conn| {
                conn.query_row("SELECT value FROM kv_entries WHERE key = 'k'", [], |row| row.get(0))
            })
            .unwrap();
        assert_eq!(value, "v");
    }

    #[test]
    fn test_in_memory_debug() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(format!("{:?}", db), "Database(:memory:)");
    }
}
