//! SQLite-backed session storage

use super::schema::{DEVICE_ID_KEY, SCHEMA, SCHEMA_VERSION};
use super::{SessionStorage, StoreError, StoreResult};
use crate::transcript::Session;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe database handle
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        self.lock()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Store a raw document, bypassing serialization. Used to seed legacy
    /// shapes in tests.
    #[cfg(test)]
    pub(crate) fn put_raw(&self, id: &str, document: &Value) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (id, language, document, schema_version, updated_at)
             VALUES (?1, 'en', ?2, 0, ?3)",
            params![id, document.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for SqliteStorage {
    async fn device_id(&self) -> StoreResult<String> {
        let conn = self.lock()?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT value FROM device WHERE key = ?1",
                params![DEVICE_ID_KEY],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO device (key, value) VALUES (?1, ?2)",
            params![DEVICE_ID_KEY, id],
        )?;
        tracing::info!(device_id = %id, "Generated device identifier");
        Ok(id)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Value>> {
        let conn = self.lock()?;
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        document
            .map(|d| serde_json::from_str(&d).map_err(StoreError::from))
            .transpose()
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        let document = serde_json::to_string(session)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (id, language, document, schema_version, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                language = excluded.language,
                document = excluded.document,
                schema_version = excluded.schema_version,
                updated_at = excluded.updated_at",
            params![
                session.id,
                session.language.code(),
                document,
                SCHEMA_VERSION,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.lock()?
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(())
    }
}
