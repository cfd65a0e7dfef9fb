// ==========================================
// Pharmaflow - stage history & checklist run repositories
// ==========================================
// stage_history is the per-stage work record: opened on claim, closed
// exactly once on completion. checklist_run tracks which check items were
// marked during a history.
// ==========================================

use crate::domain::order::{ChecklistRun, StageHistory};
use crate::repository::decimal_from_db;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// StageHistoryRepository
// ==========================================
struct HistoryRow {
    history_id: String,
    order_id: String,
    stage_id: String,
    worker_id: String,
    started_at: NaiveDateTime,
    finished_at: Option<NaiveDateTime>,
    scoring_config_id: Option<String>,
    produced_qty: i64,
    points: String,
    notes: String,
}

fn history_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<HistoryRow> {
    Ok(HistoryRow {
        history_id: row.get(0)?,
        order_id: row.get(1)?,
        stage_id: row.get(2)?,
        worker_id: row.get(3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        scoring_config_id: row.get(6)?,
        produced_qty: row.get(7)?,
        points: row.get(8)?,
        notes: row.get(9)?,
    })
}

fn history_from_raw(raw: HistoryRow) -> RepositoryResult<StageHistory> {
    Ok(StageHistory {
        history_id: raw.history_id,
        order_id: raw.order_id,
        stage_id: raw.stage_id,
        worker_id: raw.worker_id,
        started_at: raw.started_at,
        finished_at: raw.finished_at,
        scoring_config_id: raw.scoring_config_id,
        produced_qty: raw.produced_qty,
        points: decimal_from_db("points", &raw.points)?,
        notes: raw.notes,
    })
}

const HISTORY_COLUMNS: &str = "history_id, order_id, stage_id, worker_id, started_at, \
     finished_at, scoring_config_id, produced_qty, points, notes";

pub struct StageHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StageHistoryRepository {
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
            CREATE TABLE IF NOT EXISTS stage_history (
              history_id TEXT PRIMARY KEY,
              order_id TEXT NOT NULL REFERENCES work_order(order_id),
              stage_id TEXT NOT NULL REFERENCES stage(stage_id),
              worker_id TEXT NOT NULL REFERENCES worker(worker_id),
              started_at TEXT NOT NULL,
              finished_at TEXT,
              scoring_config_id TEXT,
              produced_qty INTEGER NOT NULL DEFAULT 0,
              points TEXT NOT NULL DEFAULT '0',
              notes TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_history_order_stage
              ON stage_history(order_id, stage_id);
            CREATE INDEX IF NOT EXISTS idx_history_worker
              ON stage_history(worker_id, finished_at);
            "#,
        )?;
        Ok(())
    }

    /// Open a new history. At most one open record may exist per
    /// (order, stage, worker); callers check with `find_open` first.
    pub fn open(&self, history: &StageHistory) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO stage_history (history_id, order_id, stage_id, worker_id, \
             started_at, finished_at, scoring_config_id, produced_qty, points, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                history.history_id,
                history.order_id,
                history.stage_id,
                history.worker_id,
                history.started_at,
                history.finished_at,
                history.scoring_config_id,
                history.produced_qty,
                history.points.to_string(),
                history.notes,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, history_id: &str) -> RepositoryResult<Option<StageHistory>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {HISTORY_COLUMNS} FROM stage_history WHERE history_id = ?1"),
                params![history_id],
                history_from_row,
            )
            .optional()?;
        raw.map(history_from_raw).transpose()
    }

    /// Open history for an order at a stage, if any.
    pub fn find_open(
        &self,
        order_id: &str,
        stage_id: &str,
    ) -> RepositoryResult<Option<StageHistory>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {HISTORY_COLUMNS} FROM stage_history \
                     WHERE order_id = ?1 AND stage_id = ?2 AND finished_at IS NULL \
                     ORDER BY started_at DESC LIMIT 1"
                ),
                params![order_id, stage_id],
                history_from_row,
            )
            .optional()?;
        raw.map(history_from_raw).transpose()
    }

    /// Whether the order has a closed history at the given stage (progression
    /// gate for the following stage).
    pub fn has_closed(&self, order_id: &str, stage_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM stage_history \
             WHERE order_id = ?1 AND stage_id = ?2 AND finished_at IS NOT NULL",
            params![order_id, stage_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Close a history, recording score and the config version that produced
    /// it. The `finished_at IS NULL` guard makes a double close fail instead
    /// of overwriting the record.
    pub fn close(
        &self,
        history_id: &str,
        finished_at: NaiveDateTime,
        scoring_config_id: Option<&str>,
        produced_qty: i64,
        points: Decimal,
        notes: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE stage_history SET finished_at = ?2, scoring_config_id = ?3, \
             produced_qty = ?4, points = ?5, notes = ?6 \
             WHERE history_id = ?1 AND finished_at IS NULL",
            params![
                history_id,
                finished_at,
                scoring_config_id,
                produced_qty,
                points.to_string(),
                notes,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "stage history {history_id} is already closed or missing"
            )));
        }
        Ok(())
    }

    /// Discard an open history (order released back to the pool). Closed
    /// histories are never deleted.
    pub fn delete_open(&self, history_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM stage_history WHERE history_id = ?1 AND finished_at IS NULL",
            params![history_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "stage history {history_id} is closed or missing, not discarding"
            )));
        }
        Ok(())
    }

    pub fn list_for_order(&self, order_id: &str) -> RepositoryResult<Vec<StageHistory>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM stage_history \
             WHERE order_id = ?1 ORDER BY started_at ASC"
        ))?;
        let raws = stmt
            .query_map(params![order_id], history_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(history_from_raw).collect()
    }
}

// ==========================================
// ChecklistRunRepository
// ==========================================
struct RunRow {
    run_id: String,
    history_id: String,
    checklist_id: String,
    marked: bool,
    points: String,
    marked_at: Option<NaiveDateTime>,
}

fn run_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<RunRow> {
    Ok(RunRow {
        run_id: row.get(0)?,
        history_id: row.get(1)?,
        checklist_id: row.get(2)?,
        marked: row.get::<_, i32>(3)? != 0,
        points: row.get(4)?,
        marked_at: row.get(5)?,
    })
}

fn run_from_raw(raw: RunRow) -> RepositoryResult<ChecklistRun> {
    Ok(ChecklistRun {
        run_id: raw.run_id,
        history_id: raw.history_id,
        checklist_id: raw.checklist_id,
        marked: raw.marked,
        points: decimal_from_db("points", &raw.points)?,
        marked_at: raw.marked_at,
    })
}

const RUN_COLUMNS: &str = "run_id, history_id, checklist_id, marked, points, marked_at";

pub struct ChecklistRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChecklistRunRepository {
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
            CREATE TABLE IF NOT EXISTS checklist_run (
              run_id TEXT PRIMARY KEY,
              history_id TEXT NOT NULL REFERENCES stage_history(history_id),
              checklist_id TEXT NOT NULL REFERENCES checklist(checklist_id),
              marked INTEGER NOT NULL DEFAULT 0,
              points TEXT NOT NULL DEFAULT '0',
              marked_at TEXT,
              UNIQUE(history_id, checklist_id)
            );

            CREATE INDEX IF NOT EXISTS idx_run_history ON checklist_run(history_id);
            "#,
        )?;
        Ok(())
    }

    /// Fetch the run for a check item in a history, creating an unmarked one
    /// on first access.
    pub fn get_or_create(
        &self,
        run_id_if_new: &str,
        history_id: &str,
        checklist_id: &str,
    ) -> RepositoryResult<ChecklistRun> {
        {
            let conn = self.get_conn()?;
            conn.execute(
                "INSERT OR IGNORE INTO checklist_run \
                 (run_id, history_id, checklist_id, marked, points, marked_at) \
                 VALUES (?1, ?2, ?3, 0, '0', NULL)",
                params![run_id_if_new, history_id, checklist_id],
            )?;
        }
        self.find(history_id, checklist_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "ChecklistRun".to_string(),
                id: format!("{history_id}/{checklist_id}"),
            })
    }

    pub fn find(
        &self,
        history_id: &str,
        checklist_id: &str,
    ) -> RepositoryResult<Option<ChecklistRun>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM checklist_run \
                     WHERE history_id = ?1 AND checklist_id = ?2"
                ),
                params![history_id, checklist_id],
                run_from_row,
            )
            .optional()?;
        raw.map(run_from_raw).transpose()
    }

    pub fn set_marked(
        &self,
        run_id: &str,
        marked: bool,
        points: Decimal,
        marked_at: Option<NaiveDateTime>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE checklist_run SET marked = ?2, points = ?3, marked_at = ?4 \
             WHERE run_id = ?1",
            params![run_id, marked as i32, points.to_string(), marked_at],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ChecklistRun".to_string(),
                id: run_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn marked_count(&self, history_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM checklist_run WHERE history_id = ?1 AND marked = 1",
            params![history_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn list_for_history(&self, history_id: &str) -> RepositoryResult<Vec<ChecklistRun>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM checklist_run WHERE history_id = ?1"
        ))?;
        let raws = stmt
            .query_map(params![history_id], run_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(run_from_raw).collect()
    }

    /// Whether the worker already marked this check item on the given day
    /// (daily-counted shipping points are awarded on the first mark only).
    pub fn has_marked_on_day(
        &self,
        worker_id: &str,
        checklist_id: &str,
        day: NaiveDate,
    ) -> RepositoryResult<bool> {
        let day_start = day.and_hms_opt(0, 0, 0).ok_or_else(|| {
            RepositoryError::InternalError(format!("invalid day {day}"))
        })?;
        let day_end = day_start + chrono::Duration::days(1);
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM checklist_run r \
             JOIN stage_history h ON h.history_id = r.history_id \
             WHERE h.worker_id = ?1 AND r.checklist_id = ?2 AND r.marked = 1 \
               AND r.marked_at >= ?3 AND r.marked_at < ?4",
            params![worker_id, checklist_id, day_start, day_end],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
