// ==========================================
// Pharmaflow - score ledger, penalty, fixed rule & bonus repositories
// ==========================================
// score_entry is append-only: no UPDATE or DELETE exists for it anywhere in
// the crate. Monthly totals are always recomputed from the ledger.
// ==========================================

use crate::domain::scoring::{
    FixedMonthlyRule, FixedRuleApplication, MonthlyBonus, Penalty, ScoreEntry,
};
use crate::domain::types::{ApplicationMode, PayoutStatus, ScoreSource};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{decimal_from_db, enum_from_db};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ScoreLedgerRepository
// ==========================================
struct EntryRow {
    entry_id: String,
    worker_id: String,
    order_id: Option<String>,
    stage_id: Option<String>,
    points: String,
    source: String,
    recorded_at: NaiveDateTime,
    month_ref: NaiveDate,
    note: String,
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<EntryRow> {
    Ok(EntryRow {
        entry_id: row.get(0)?,
        worker_id: row.get(1)?,
        order_id: row.get(2)?,
        stage_id: row.get(3)?,
        points: row.get(4)?,
        source: row.get(5)?,
        recorded_at: row.get(6)?,
        month_ref: row.get(7)?,
        note: row.get(8)?,
    })
}

fn entry_from_raw(raw: EntryRow) -> RepositoryResult<ScoreEntry> {
    Ok(ScoreEntry {
        entry_id: raw.entry_id,
        worker_id: raw.worker_id,
        order_id: raw.order_id,
        stage_id: raw.stage_id,
        points: decimal_from_db("points", &raw.points)?,
        source: enum_from_db("source", &raw.source, ScoreSource::parse)?,
        recorded_at: raw.recorded_at,
        month_ref: raw.month_ref,
        note: raw.note,
    })
}

const ENTRY_COLUMNS: &str = "entry_id, worker_id, order_id, stage_id, points, source, \
     recorded_at, month_ref, note";

pub struct ScoreLedgerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScoreLedgerRepository {
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
            CREATE TABLE IF NOT EXISTS score_entry (
              entry_id TEXT PRIMARY KEY,
              worker_id TEXT NOT NULL REFERENCES worker(worker_id),
              order_id TEXT REFERENCES work_order(order_id),
              stage_id TEXT REFERENCES stage(stage_id),
              points TEXT NOT NULL,
              source TEXT NOT NULL,
              recorded_at TEXT NOT NULL,
              month_ref TEXT NOT NULL,
              note TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_entry_worker_month
              ON score_entry(worker_id, month_ref);
            "#,
        )?;
        Ok(())
    }

    pub fn append(&self, entry: &ScoreEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO score_entry (entry_id, worker_id, order_id, stage_id, points, \
             source, recorded_at, month_ref, note) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.entry_id,
                entry.worker_id,
                entry.order_id,
                entry.stage_id,
                entry.points.to_string(),
                entry.source.as_str(),
                entry.recorded_at,
                entry.month_ref,
                entry.note,
            ],
        )?;
        Ok(())
    }

    /// Sum of a worker's entries for a month, summed in Rust so TEXT decimals
    /// never lose precision.
    pub fn month_total(&self, worker_id: &str, month_ref: NaiveDate) -> RepositoryResult<Decimal> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT points FROM score_entry WHERE worker_id = ?1 AND month_ref = ?2",
        )?;
        let raws = stmt
            .query_map(params![worker_id, month_ref], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        let mut total = Decimal::ZERO;
        for raw in raws {
            total += Decimal::from_str(&raw).map_err(|e| RepositoryError::FieldValueError {
                field: "points".to_string(),
                message: format!("invalid decimal '{raw}': {e}"),
            })?;
        }
        Ok(total)
    }

    pub fn list_month(
        &self,
        worker_id: &str,
        month_ref: NaiveDate,
    ) -> RepositoryResult<Vec<ScoreEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM score_entry \
             WHERE worker_id = ?1 AND month_ref = ?2 ORDER BY recorded_at ASC"
        ))?;
        let raws = stmt
            .query_map(params![worker_id, month_ref], entry_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(entry_from_raw).collect()
    }

    /// Workers with at least one entry in the month (month close iterates
    /// these).
    pub fn workers_with_entries(&self, month_ref: NaiveDate) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT worker_id FROM score_entry WHERE month_ref = ?1 ORDER BY worker_id",
        )?;
        let ids = stmt
            .query_map(params![month_ref], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(ids)
    }
}

// ==========================================
// PenaltyRepository
// ==========================================
struct PenaltyRow {
    penalty_id: String,
    worker_id: String,
    reason: String,
    points: String,
    justification: String,
    applied_by: String,
    applied_at: NaiveDateTime,
    reverted: bool,
    reverted_at: Option<NaiveDateTime>,
    reverted_by: Option<String>,
}

fn penalty_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<PenaltyRow> {
    Ok(PenaltyRow {
        penalty_id: row.get(0)?,
        worker_id: row.get(1)?,
        reason: row.get(2)?,
        points: row.get(3)?,
        justification: row.get(4)?,
        applied_by: row.get(5)?,
        applied_at: row.get(6)?,
        reverted: row.get::<_, i32>(7)? != 0,
        reverted_at: row.get(8)?,
        reverted_by: row.get(9)?,
    })
}

fn penalty_from_raw(raw: PenaltyRow) -> RepositoryResult<Penalty> {
    Ok(Penalty {
        penalty_id: raw.penalty_id,
        worker_id: raw.worker_id,
        reason: raw.reason,
        points: decimal_from_db("points", &raw.points)?,
        justification: raw.justification,
        applied_by: raw.applied_by,
        applied_at: raw.applied_at,
        reverted: raw.reverted,
        reverted_at: raw.reverted_at,
        reverted_by: raw.reverted_by,
    })
}

const PENALTY_COLUMNS: &str = "penalty_id, worker_id, reason, points, justification, \
     applied_by, applied_at, reverted, reverted_at, reverted_by";

pub struct PenaltyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PenaltyRepository {
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
            CREATE TABLE IF NOT EXISTS penalty (
              penalty_id TEXT PRIMARY KEY,
              worker_id TEXT NOT NULL REFERENCES worker(worker_id),
              reason TEXT NOT NULL,
              points TEXT NOT NULL,
              justification TEXT NOT NULL DEFAULT '',
              applied_by TEXT NOT NULL,
              applied_at TEXT NOT NULL,
              reverted INTEGER NOT NULL DEFAULT 0,
              reverted_at TEXT,
              reverted_by TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_penalty_worker ON penalty(worker_id);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, penalty: &Penalty) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO penalty (penalty_id, worker_id, reason, points, justification, \
             applied_by, applied_at, reverted, reverted_at, reverted_by) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                penalty.penalty_id,
                penalty.worker_id,
                penalty.reason,
                penalty.points.to_string(),
                penalty.justification,
                penalty.applied_by,
                penalty.applied_at,
                penalty.reverted as i32,
                penalty.reverted_at,
                penalty.reverted_by,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, penalty_id: &str) -> RepositoryResult<Option<Penalty>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {PENALTY_COLUMNS} FROM penalty WHERE penalty_id = ?1"),
                params![penalty_id],
                penalty_from_row,
            )
            .optional()?;
        raw.map(penalty_from_raw).transpose()
    }

    /// Mark reverted; fails if already reverted so the offsetting ledger
    /// entry is written at most once.
    pub fn mark_reverted(
        &self,
        penalty_id: &str,
        reverted_by: &str,
        reverted_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE penalty SET reverted = 1, reverted_at = ?2, reverted_by = ?3 \
             WHERE penalty_id = ?1 AND reverted = 0",
            params![penalty_id, reverted_at, reverted_by],
        )?;
        if affected == 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "penalty {penalty_id} is already reverted or missing"
            )));
        }
        Ok(())
    }

    pub fn list_for_worker(&self, worker_id: &str) -> RepositoryResult<Vec<Penalty>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PENALTY_COLUMNS} FROM penalty \
             WHERE worker_id = ?1 ORDER BY applied_at DESC"
        ))?;
        let raws = stmt
            .query_map(params![worker_id], penalty_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(penalty_from_raw).collect()
    }
}

// ==========================================
// FixedRuleRepository
// ==========================================
struct FixedRuleRow {
    rule_id: String,
    name: String,
    amount: String,
    active: bool,
    mode: String,
    condition: String,
    stage_id: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

fn fixed_rule_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<FixedRuleRow> {
    Ok(FixedRuleRow {
        rule_id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        active: row.get::<_, i32>(3)? != 0,
        mode: row.get(4)?,
        condition: row.get(5)?,
        stage_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn fixed_rule_from_raw(raw: FixedRuleRow) -> RepositoryResult<FixedMonthlyRule> {
    Ok(FixedMonthlyRule {
        rule_id: raw.rule_id,
        name: raw.name,
        amount: decimal_from_db("amount", &raw.amount)?,
        active: raw.active,
        mode: enum_from_db("mode", &raw.mode, ApplicationMode::parse)?,
        condition: raw.condition,
        stage_id: raw.stage_id,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

const FIXED_RULE_COLUMNS: &str = "rule_id, name, amount, active, mode, condition, stage_id, \
     created_at, updated_at";

pub struct FixedRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FixedRuleRepository {
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
            CREATE TABLE IF NOT EXISTS fixed_monthly_rule (
              rule_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              amount TEXT NOT NULL,
              active INTEGER NOT NULL DEFAULT 1,
              mode TEXT NOT NULL,
              condition TEXT NOT NULL DEFAULT '',
              stage_id TEXT REFERENCES stage(stage_id),
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS fixed_rule_application (
              application_id TEXT PRIMARY KEY,
              rule_id TEXT NOT NULL REFERENCES fixed_monthly_rule(rule_id),
              worker_id TEXT NOT NULL REFERENCES worker(worker_id),
              month_ref TEXT NOT NULL,
              points TEXT NOT NULL,
              applied_at TEXT NOT NULL,
              applied_by TEXT,
              justification TEXT NOT NULL DEFAULT '',
              UNIQUE(rule_id, worker_id, month_ref)
            );
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, rule: &FixedMonthlyRule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO fixed_monthly_rule (rule_id, name, amount, active, mode, condition, \
             stage_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                rule.rule_id,
                rule.name,
                rule.amount.to_string(),
                rule.active as i32,
                rule.mode.as_str(),
                rule.condition,
                rule.stage_id,
                rule.created_at,
                rule.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, rule_id: &str) -> RepositoryResult<Option<FixedMonthlyRule>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {FIXED_RULE_COLUMNS} FROM fixed_monthly_rule WHERE rule_id = ?1"),
                params![rule_id],
                fixed_rule_from_row,
            )
            .optional()?;
        raw.map(fixed_rule_from_raw).transpose()
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<FixedMonthlyRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FIXED_RULE_COLUMNS} FROM fixed_monthly_rule \
             WHERE active = 1 ORDER BY name ASC"
        ))?;
        let raws = stmt
            .query_map([], fixed_rule_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(fixed_rule_from_raw).collect()
    }

    /// Record an application. UNIQUE(rule, worker, month) blocks a second
    /// award of the same rule in one month.
    pub fn record_application(&self, app: &FixedRuleApplication) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO fixed_rule_application (application_id, rule_id, worker_id, month_ref, \
             points, applied_at, applied_by, justification) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                app.application_id,
                app.rule_id,
                app.worker_id,
                app.month_ref,
                app.points.to_string(),
                app.applied_at,
                app.applied_by,
                app.justification,
            ],
        )?;
        Ok(())
    }

    pub fn has_application(
        &self,
        rule_id: &str,
        worker_id: &str,
        month_ref: NaiveDate,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fixed_rule_application \
             WHERE rule_id = ?1 AND worker_id = ?2 AND month_ref = ?3",
            params![rule_id, worker_id, month_ref],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

// ==========================================
// MonthlyBonusRepository
// ==========================================
struct BonusRow {
    bonus_id: String,
    worker_id: String,
    month_ref: NaiveDate,
    total_points: String,
    amount: String,
    payout_status: String,
    computed_at: NaiveDateTime,
    paid_at: Option<NaiveDateTime>,
}

fn bonus_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<BonusRow> {
    Ok(BonusRow {
        bonus_id: row.get(0)?,
        worker_id: row.get(1)?,
        month_ref: row.get(2)?,
        total_points: row.get(3)?,
        amount: row.get(4)?,
        payout_status: row.get(5)?,
        computed_at: row.get(6)?,
        paid_at: row.get(7)?,
    })
}

fn bonus_from_raw(raw: BonusRow) -> RepositoryResult<MonthlyBonus> {
    Ok(MonthlyBonus {
        bonus_id: raw.bonus_id,
        worker_id: raw.worker_id,
        month_ref: raw.month_ref,
        total_points: decimal_from_db("total_points", &raw.total_points)?,
        amount: decimal_from_db("amount", &raw.amount)?,
        payout_status: enum_from_db("payout_status", &raw.payout_status, PayoutStatus::parse)?,
        computed_at: raw.computed_at,
        paid_at: raw.paid_at,
    })
}

const BONUS_COLUMNS: &str = "bonus_id, worker_id, month_ref, total_points, amount, \
     payout_status, computed_at, paid_at";

pub struct MonthlyBonusRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MonthlyBonusRepository {
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
            CREATE TABLE IF NOT EXISTS monthly_bonus (
              bonus_id TEXT PRIMARY KEY,
              worker_id TEXT NOT NULL REFERENCES worker(worker_id),
              month_ref TEXT NOT NULL,
              total_points TEXT NOT NULL,
              amount TEXT NOT NULL,
              payout_status TEXT NOT NULL,
              computed_at TEXT NOT NULL,
              paid_at TEXT,
              UNIQUE(worker_id, month_ref)
            );
            "#,
        )?;
        Ok(())
    }

    /// Insert or recompute the month's record. Recomputation keeps the
    /// original id and resets the payout to PENDING.
    pub fn upsert(&self, bonus: &MonthlyBonus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO monthly_bonus (bonus_id, worker_id, month_ref, total_points, amount, \
             payout_status, computed_at, paid_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(worker_id, month_ref) DO UPDATE SET \
               total_points = excluded.total_points, amount = excluded.amount, \
               payout_status = excluded.payout_status, computed_at = excluded.computed_at, \
               paid_at = excluded.paid_at",
            params![
                bonus.bonus_id,
                bonus.worker_id,
                bonus.month_ref,
                bonus.total_points.to_string(),
                bonus.amount.to_string(),
                bonus.payout_status.as_str(),
                bonus.computed_at,
                bonus.paid_at,
            ],
        )?;
        Ok(())
    }

    pub fn find(
        &self,
        worker_id: &str,
        month_ref: NaiveDate,
    ) -> RepositoryResult<Option<MonthlyBonus>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {BONUS_COLUMNS} FROM monthly_bonus \
                     WHERE worker_id = ?1 AND month_ref = ?2"
                ),
                params![worker_id, month_ref],
                bonus_from_row,
            )
            .optional()?;
        raw.map(bonus_from_raw).transpose()
    }

    pub fn set_payout_status(
        &self,
        bonus_id: &str,
        status: PayoutStatus,
        paid_at: Option<NaiveDateTime>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE monthly_bonus SET payout_status = ?2, paid_at = ?3 WHERE bonus_id = ?1",
            params![bonus_id, status.as_str(), paid_at],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MonthlyBonus".to_string(),
                id: bonus_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn list_month(&self, month_ref: NaiveDate) -> RepositoryResult<Vec<MonthlyBonus>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BONUS_COLUMNS} FROM monthly_bonus \
             WHERE month_ref = ?1 ORDER BY worker_id ASC"
        ))?;
        let raws = stmt
            .query_map(params![month_ref], bonus_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(bonus_from_raw).collect()
    }
}
