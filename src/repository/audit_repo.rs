// ==========================================
// Pharmaflow - audit log repository
// ==========================================
// Append-only trail of workflow and scoring actions.
// ==========================================

use crate::domain::audit::AuditLog;
use crate::domain::types::AuditAction;
use crate::repository::enum_from_db;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

struct LogRow {
    log_id: String,
    worker_id: Option<String>,
    action: String,
    description: String,
    recorded_at: chrono::NaiveDateTime,
    details_json: Option<String>,
}

fn log_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<LogRow> {
    Ok(LogRow {
        log_id: row.get(0)?,
        worker_id: row.get(1)?,
        action: row.get(2)?,
        description: row.get(3)?,
        recorded_at: row.get(4)?,
        details_json: row.get(5)?,
    })
}

fn log_from_raw(raw: LogRow) -> RepositoryResult<AuditLog> {
    Ok(AuditLog {
        log_id: raw.log_id,
        worker_id: raw.worker_id,
        action: enum_from_db("action", &raw.action, AuditAction::parse)?,
        description: raw.description,
        recorded_at: raw.recorded_at,
        details_json: raw.details_json,
    })
}

const LOG_COLUMNS: &str = "log_id, worker_id, action, description, recorded_at, details_json";

pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_tables()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_tables()?;
        Ok(repo)
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
            CREATE TABLE IF NOT EXISTS audit_log (
              log_id TEXT PRIMARY KEY,
              worker_id TEXT,
              action TEXT NOT NULL,
              description TEXT NOT NULL,
              recorded_at TEXT NOT NULL,
              details_json TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_recorded ON audit_log(recorded_at);
            "#,
        )?;
        Ok(())
    }

    pub fn append(&self, log: &AuditLog) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO audit_log (log_id, worker_id, action, description, recorded_at, \
             details_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                log.log_id,
                log.worker_id,
                log.action.as_str(),
                log.description,
                log.recorded_at,
                log.details_json,
            ],
        )?;
        Ok(())
    }

    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<AuditLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM audit_log ORDER BY recorded_at DESC LIMIT ?1"
        ))?;
        let raws = stmt
            .query_map(params![limit], log_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(log_from_raw).collect()
    }
}
