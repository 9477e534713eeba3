//! Schema migrations tracked through SQLite's `user_version` pragma.
//!
//! `STEPS[i]` brings the schema from version `i` to `i + 1`; a database at
//! version `n` only runs the steps after it.

use rusqlite::Connection;

/// Schema steps in application order. Append only.
const STEPS: &[(&str, &str)] = &[
    (
        "create_kv_entries",
        "CREATE TABLE IF NOT EXISTS kv_entries (
             key TEXT PRIMARY KEY,
             value TEXT NOT NULL,
             stored_at TEXT NOT NULL
         );",
    ),
    (
        "index_kv_entries_stored_at",
        "CREATE INDEX IF NOT EXISTS idx_kv_entries_stored_at ON kv_entries(stored_at);",
    ),
];

/// Schema version a fully migrated database reports
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Apply every step the database has not seen yet, each in its own transaction.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let current = schema_version(conn)? as usize;

    for (index, (name, sql)) in STEPS.iter().enumerate().skip(current) {
        let version = index as u32 + 1;
        tracing::info!(version, name, "Applying schema step");

        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .and_then(|_| tx.pragma_update(None, "user_version", version))
            .map_err(|e| {
                tracing::error!(version, name, error = %e, "Schema step failed");
                e
            })?;
        tx.commit()?;
    }
    tracing::debug!(version = latest_version(), "Schema up to date");
    Ok(())
}
