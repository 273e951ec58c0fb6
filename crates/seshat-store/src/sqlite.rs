//! SQLite store adapter.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OpenFlags, params};
use tracing::info;

use crate::{DataStore, Result, StoreError};

/// Durable [`DataStore`] backed by a single SQLite database.
///
/// One row per key, upserted on every save. Uses WAL mode so reads during
/// a save burst don't block. All calls hop through `spawn_blocking`; the
/// async caller never waits on disk I/O directly.
pub struct SqliteStore {
    /// The SQLite connection (wrapped in Mutex for thread safety).
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the database file and the schema if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;

        info!("Record store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;

        info!("In-memory record store created");
        Ok(store)
    }

    /// Initialize the database with schema and pragmas.
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // WAL mode so autosave bursts don't starve readers
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                payload BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Number of records currently stored.
    pub fn record_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare("SELECT payload FROM records WHERE key = ?1")?;
            let mut rows = stmt.query(params![key])?;

            if let Some(row) = rows.next()? {
                Ok(Some(row.get(0)?))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {e}")))?
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();
        let updated_at = Utc::now().to_rfc3339();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT OR REPLACE INTO records (key, payload, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {e}")))?
    }
}
