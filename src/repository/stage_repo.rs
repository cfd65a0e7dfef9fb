// ==========================================
// Pharmaflow - stage & checklist repositories
// ==========================================
// Responsibility:
// - stage table: the ordered pipeline definition
// - checklist table: per-stage check items
// ==========================================

use crate::domain::stage::{Checklist, Stage};
use crate::domain::types::StageGroup;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{decimal_from_db, enum_from_db};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// Raw row shapes: strings out of SQLite, converted into domain types after
// the statement is done.
struct StageRow {
    stage_id: String,
    name: String,
    sequence: i32,
    group: String,
    active: bool,
    generates_points: bool,
    has_checklists: bool,
    has_quantity_scoring: bool,
    fixed_points: String,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

fn stage_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<StageRow> {
    Ok(StageRow {
        stage_id: row.get(0)?,
        name: row.get(1)?,
        sequence: row.get(2)?,
        group: row.get(3)?,
        active: row.get::<_, i32>(4)? != 0,
        generates_points: row.get::<_, i32>(5)? != 0,
        has_checklists: row.get::<_, i32>(6)? != 0,
        has_quantity_scoring: row.get::<_, i32>(7)? != 0,
        fixed_points: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn stage_from_raw(raw: StageRow) -> RepositoryResult<Stage> {
    Ok(Stage {
        stage_id: raw.stage_id,
        name: raw.name,
        sequence: raw.sequence,
        group: enum_from_db("stage_group", &raw.group, StageGroup::parse)?,
        active: raw.active,
        generates_points: raw.generates_points,
        has_checklists: raw.has_checklists,
        has_quantity_scoring: raw.has_quantity_scoring,
        fixed_points: decimal_from_db("fixed_points", &raw.fixed_points)?,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

const STAGE_COLUMNS: &str = "stage_id, name, sequence, stage_group, active, generates_points, \
     has_checklists, has_quantity_scoring, fixed_points, created_at, updated_at";

// ==========================================
// StageRepository
// ==========================================
pub struct StageRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StageRepository {
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
            CREATE TABLE IF NOT EXISTS stage (
              stage_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              sequence INTEGER NOT NULL,
              stage_group TEXT NOT NULL,
              active INTEGER NOT NULL DEFAULT 1,
              generates_points INTEGER NOT NULL DEFAULT 1,
              has_checklists INTEGER NOT NULL DEFAULT 0,
              has_quantity_scoring INTEGER NOT NULL DEFAULT 0,
              fixed_points TEXT NOT NULL DEFAULT '0',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stage_sequence ON stage(sequence);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, stage: &Stage) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO stage (stage_id, name, sequence, stage_group, active, generates_points, \
             has_checklists, has_quantity_scoring, fixed_points, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                stage.stage_id,
                stage.name,
                stage.sequence,
                stage.group.as_str(),
                stage.active as i32,
                stage.generates_points as i32,
                stage.has_checklists as i32,
                stage.has_quantity_scoring as i32,
                stage.fixed_points.to_string(),
                stage.created_at,
                stage.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, stage_id: &str) -> RepositoryResult<Option<Stage>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {STAGE_COLUMNS} FROM stage WHERE stage_id = ?1"),
                params![stage_id],
                stage_from_row,
            )
            .optional()?;
        raw.map(stage_from_raw).transpose()
    }

    /// First active stage of the pipeline (where ingested orders start).
    pub fn first_active(&self) -> RepositoryResult<Option<Stage>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {STAGE_COLUMNS} FROM stage WHERE active = 1 \
                     ORDER BY sequence ASC LIMIT 1"
                ),
                [],
                stage_from_row,
            )
            .optional()?;
        raw.map(stage_from_raw).transpose()
    }

    /// Next active stage strictly after the given sequence.
    pub fn next_after(&self, sequence: i32) -> RepositoryResult<Option<Stage>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {STAGE_COLUMNS} FROM stage WHERE active = 1 AND sequence > ?1 \
                     ORDER BY sequence ASC LIMIT 1"
                ),
                params![sequence],
                stage_from_row,
            )
            .optional()?;
        raw.map(stage_from_raw).transpose()
    }

    /// Active stage immediately before the given sequence, if any.
    pub fn previous_before(&self, sequence: i32) -> RepositoryResult<Option<Stage>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {STAGE_COLUMNS} FROM stage WHERE active = 1 AND sequence < ?1 \
                     ORDER BY sequence DESC LIMIT 1"
                ),
                params![sequence],
                stage_from_row,
            )
            .optional()?;
        raw.map(stage_from_raw).transpose()
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<Stage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STAGE_COLUMNS} FROM stage WHERE active = 1 ORDER BY sequence ASC"
        ))?;
        let raws = stmt
            .query_map([], stage_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(stage_from_raw).collect()
    }

    /// Active shipping-group stage; the queue discipline treats it specially.
    pub fn shipping_stage(&self) -> RepositoryResult<Option<Stage>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {STAGE_COLUMNS} FROM stage \
                     WHERE active = 1 AND stage_group = ?1 ORDER BY sequence ASC LIMIT 1"
                ),
                params![StageGroup::Shipping.as_str()],
                stage_from_row,
            )
            .optional()?;
        raw.map(stage_from_raw).transpose()
    }
}

// ==========================================
// ChecklistRepository
// ==========================================
struct ChecklistRow {
    checklist_id: String,
    stage_id: String,
    name: String,
    description: String,
    points: String,
    required: bool,
    active: bool,
    position: i32,
    created_at: chrono::NaiveDateTime,
}

fn checklist_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<ChecklistRow> {
    Ok(ChecklistRow {
        checklist_id: row.get(0)?,
        stage_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        points: row.get(4)?,
        required: row.get::<_, i32>(5)? != 0,
        active: row.get::<_, i32>(6)? != 0,
        position: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn checklist_from_raw(raw: ChecklistRow) -> RepositoryResult<Checklist> {
    Ok(Checklist {
        checklist_id: raw.checklist_id,
        stage_id: raw.stage_id,
        name: raw.name,
        description: raw.description,
        points: decimal_from_db("points", &raw.points)?,
        required: raw.required,
        active: raw.active,
        position: raw.position,
        created_at: raw.created_at,
    })
}

const CHECKLIST_COLUMNS: &str =
    "checklist_id, stage_id, name, description, points, required, active, position, created_at";

pub struct ChecklistRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChecklistRepository {
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
            CREATE TABLE IF NOT EXISTS checklist (
              checklist_id TEXT PRIMARY KEY,
              stage_id TEXT NOT NULL REFERENCES stage(stage_id),
              name TEXT NOT NULL,
              description TEXT NOT NULL DEFAULT '',
              points TEXT NOT NULL DEFAULT '0',
              required INTEGER NOT NULL DEFAULT 1,
              active INTEGER NOT NULL DEFAULT 1,
              position INTEGER NOT NULL DEFAULT 0,
              created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_checklist_stage ON checklist(stage_id);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, checklist: &Checklist) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO checklist (checklist_id, stage_id, name, description, points, \
             required, active, position, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                checklist.checklist_id,
                checklist.stage_id,
                checklist.name,
                checklist.description,
                checklist.points.to_string(),
                checklist.required as i32,
                checklist.active as i32,
                checklist.position,
                checklist.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, checklist_id: &str) -> RepositoryResult<Option<Checklist>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {CHECKLIST_COLUMNS} FROM checklist WHERE checklist_id = ?1"),
                params![checklist_id],
                checklist_from_row,
            )
            .optional()?;
        raw.map(checklist_from_raw).transpose()
    }

    pub fn list_active_for_stage(&self, stage_id: &str) -> RepositoryResult<Vec<Checklist>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHECKLIST_COLUMNS} FROM checklist \
             WHERE stage_id = ?1 AND active = 1 ORDER BY position ASC, name ASC"
        ))?;
        let raws = stmt
            .query_map(params![stage_id], checklist_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(checklist_from_raw).collect()
    }

    /// Lookup by exact name within a stage (used by route finalization).
    pub fn find_by_name(
        &self,
        stage_id: &str,
        name: &str,
    ) -> RepositoryResult<Option<Checklist>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {CHECKLIST_COLUMNS} FROM checklist \
                     WHERE stage_id = ?1 AND name = ?2 AND active = 1 LIMIT 1"
                ),
                params![stage_id, name],
                checklist_from_row,
            )
            .optional()?;
        raw.map(checklist_from_raw).transpose()
    }
}
