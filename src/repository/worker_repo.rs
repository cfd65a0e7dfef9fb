// ==========================================
// Pharmaflow - worker repository
// ==========================================

use crate::domain::types::WorkerRole;
use crate::domain::worker::Worker;
use crate::repository::enum_from_db;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

struct WorkerRow {
    worker_id: String,
    username: String,
    full_name: String,
    role: String,
    active: bool,
    created_at: chrono::NaiveDateTime,
}

fn worker_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<WorkerRow> {
    Ok(WorkerRow {
        worker_id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        role: row.get(3)?,
        active: row.get::<_, i32>(4)? != 0,
        created_at: row.get(5)?,
    })
}

fn worker_from_raw(raw: WorkerRow) -> RepositoryResult<Worker> {
    Ok(Worker {
        worker_id: raw.worker_id,
        username: raw.username,
        full_name: raw.full_name,
        role: enum_from_db("role", &raw.role, WorkerRole::parse)?,
        active: raw.active,
        created_at: raw.created_at,
    })
}

const WORKER_COLUMNS: &str = "worker_id, username, full_name, role, active, created_at";

pub struct WorkerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkerRepository {
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
            CREATE TABLE IF NOT EXISTS worker (
              worker_id TEXT PRIMARY KEY,
              username TEXT NOT NULL UNIQUE,
              full_name TEXT NOT NULL DEFAULT '',
              role TEXT NOT NULL,
              active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, worker: &Worker) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO worker (worker_id, username, full_name, role, active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                worker.worker_id,
                worker.username,
                worker.full_name,
                worker.role.as_str(),
                worker.active as i32,
                worker.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, worker_id: &str) -> RepositoryResult<Option<Worker>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {WORKER_COLUMNS} FROM worker WHERE worker_id = ?1"),
                params![worker_id],
                worker_from_row,
            )
            .optional()?;
        raw.map(worker_from_raw).transpose()
    }

    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Worker>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {WORKER_COLUMNS} FROM worker WHERE username = ?1"),
                params![username],
                worker_from_row,
            )
            .optional()?;
        raw.map(worker_from_raw).transpose()
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<Worker>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker WHERE active = 1 ORDER BY username ASC"
        ))?;
        let raws = stmt
            .query_map([], worker_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(worker_from_raw).collect()
    }

    /// Fetch a worker that must exist, converting absence into NotFound.
    pub fn require(&self, worker_id: &str) -> RepositoryResult<Worker> {
        self.find_by_id(worker_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Worker".to_string(),
                id: worker_id.to_string(),
            })
    }
}
