// ==========================================
// Pharmaflow - key/value configuration store
// ==========================================
// Small operational knobs live in the config_kv table so managers can change
// them without a redeploy. Values are stored as TEXT and parsed on read.
// ==========================================

use crate::repository::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.ensure_tables()?;
        Ok(manager)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let manager = Self { conn };
        manager.ensure_tables()?;
        Ok(manager)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_tables(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let now = chrono::Local::now().naive_local();
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    /// Integer knob with a default; a malformed stored value falls back to
    /// the default with a warning instead of failing the caller.
    pub fn get_i64_or(&self, key: &str, default: i64) -> RepositoryResult<i64> {
        match self.get(key)? {
            Some(raw) => match raw.parse::<i64>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(key, raw, "config value is not an integer, using default");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }
}
