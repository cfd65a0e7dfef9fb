// ==========================================
// Pharmaflow - scoring rule repositories
// ==========================================
// Four rule tables drive point computation:
// - activity_score_rule: quantity-band lookup per stage/activity/product type
// - production_rule: per-unit production scoring, versioned
// - scoring_config: per-stage fallback (fixed + per-check), versioned
// - bonus_tier: monthly point bands -> bonus amount
// ==========================================

use crate::domain::scoring::BonusTier;
use crate::domain::stage::{ActivityScoreRule, ProductionRule, ScoringConfig};
use crate::domain::types::ActivityKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{decimal_from_db, enum_from_db, opt_decimal_from_db};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// ActivityScoreRuleRepository
// ==========================================
struct ActivityRuleRow {
    rule_id: String,
    stage_id: String,
    product_type_id: Option<String>,
    activity: String,
    band_min: i64,
    band_max: i64,
    points: String,
    active: bool,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

fn activity_rule_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<ActivityRuleRow> {
    Ok(ActivityRuleRow {
        rule_id: row.get(0)?,
        stage_id: row.get(1)?,
        product_type_id: row.get(2)?,
        activity: row.get(3)?,
        band_min: row.get(4)?,
        band_max: row.get(5)?,
        points: row.get(6)?,
        active: row.get::<_, i32>(7)? != 0,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn activity_rule_from_raw(raw: ActivityRuleRow) -> RepositoryResult<ActivityScoreRule> {
    Ok(ActivityScoreRule {
        rule_id: raw.rule_id,
        stage_id: raw.stage_id,
        product_type_id: raw.product_type_id,
        activity: enum_from_db("activity", &raw.activity, ActivityKind::parse)?,
        band_min: raw.band_min,
        band_max: raw.band_max,
        points: decimal_from_db("points", &raw.points)?,
        active: raw.active,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

const ACTIVITY_RULE_COLUMNS: &str = "rule_id, stage_id, product_type_id, activity, band_min, \
     band_max, points, active, created_at, updated_at";

pub struct ActivityScoreRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActivityScoreRuleRepository {
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
            CREATE TABLE IF NOT EXISTS activity_score_rule (
              rule_id TEXT PRIMARY KEY,
              stage_id TEXT NOT NULL REFERENCES stage(stage_id),
              product_type_id TEXT REFERENCES product_type(product_type_id),
              activity TEXT NOT NULL,
              band_min INTEGER NOT NULL,
              band_max INTEGER NOT NULL,
              points TEXT NOT NULL,
              active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activity_rule_lookup
              ON activity_score_rule(stage_id, activity, product_type_id);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, rule: &ActivityScoreRule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO activity_score_rule (rule_id, stage_id, product_type_id, activity, \
             band_min, band_max, points, active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                rule.rule_id,
                rule.stage_id,
                rule.product_type_id,
                rule.activity.as_str(),
                rule.band_min,
                rule.band_max,
                rule.points.to_string(),
                rule.active as i32,
                rule.created_at,
                rule.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Band lookup. Rules keyed to a specific product type win over generic
    /// rules; among matches, the narrowest band wins.
    pub fn find_matching(
        &self,
        stage_id: &str,
        activity: ActivityKind,
        product_type_id: Option<&str>,
        quantity: i64,
    ) -> RepositoryResult<Option<ActivityScoreRule>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {ACTIVITY_RULE_COLUMNS} FROM activity_score_rule \
                     WHERE stage_id = ?1 AND activity = ?2 AND active = 1 \
                       AND band_min <= ?3 AND band_max >= ?3 \
                       AND (product_type_id = ?4 OR product_type_id IS NULL) \
                     ORDER BY (product_type_id IS NULL) ASC, (band_max - band_min) ASC \
                     LIMIT 1"
                ),
                params![stage_id, activity.as_str(), quantity, product_type_id],
                activity_rule_from_row,
            )
            .optional()?;
        raw.map(activity_rule_from_raw).transpose()
    }

    pub fn list_for_stage(&self, stage_id: &str) -> RepositoryResult<Vec<ActivityScoreRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTIVITY_RULE_COLUMNS} FROM activity_score_rule \
             WHERE stage_id = ?1 ORDER BY activity ASC, band_min ASC"
        ))?;
        let raws = stmt
            .query_map(params![stage_id], activity_rule_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(activity_rule_from_raw).collect()
    }
}

// ==========================================
// ProductionRuleRepository
// ==========================================
struct ProductionRuleRow {
    rule_id: String,
    stage_id: String,
    band_min: i64,
    band_max: i64,
    points_per_unit: String,
    fixed_points: String,
    active: bool,
    version: String,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

fn production_rule_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<ProductionRuleRow> {
    Ok(ProductionRuleRow {
        rule_id: row.get(0)?,
        stage_id: row.get(1)?,
        band_min: row.get(2)?,
        band_max: row.get(3)?,
        points_per_unit: row.get(4)?,
        fixed_points: row.get(5)?,
        active: row.get::<_, i32>(6)? != 0,
        version: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn production_rule_from_raw(raw: ProductionRuleRow) -> RepositoryResult<ProductionRule> {
    Ok(ProductionRule {
        rule_id: raw.rule_id,
        stage_id: raw.stage_id,
        band_min: raw.band_min,
        band_max: raw.band_max,
        points_per_unit: decimal_from_db("points_per_unit", &raw.points_per_unit)?,
        fixed_points: decimal_from_db("fixed_points", &raw.fixed_points)?,
        active: raw.active,
        version: raw.version,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

const PRODUCTION_RULE_COLUMNS: &str = "rule_id, stage_id, band_min, band_max, points_per_unit, \
     fixed_points, active, version, created_at, updated_at";

pub struct ProductionRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionRuleRepository {
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
            CREATE TABLE IF NOT EXISTS production_rule (
              rule_id TEXT PRIMARY KEY,
              stage_id TEXT NOT NULL REFERENCES stage(stage_id),
              band_min INTEGER NOT NULL,
              band_max INTEGER NOT NULL,
              points_per_unit TEXT NOT NULL,
              fixed_points TEXT NOT NULL DEFAULT '0',
              active INTEGER NOT NULL DEFAULT 1,
              version TEXT NOT NULL,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_production_rule_stage
              ON production_rule(stage_id, band_min);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, rule: &ProductionRule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO production_rule (rule_id, stage_id, band_min, band_max, \
             points_per_unit, fixed_points, active, version, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                rule.rule_id,
                rule.stage_id,
                rule.band_min,
                rule.band_max,
                rule.points_per_unit.to_string(),
                rule.fixed_points.to_string(),
                rule.active as i32,
                rule.version,
                rule.created_at,
                rule.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Newest active rule whose band contains the quantity.
    pub fn find_matching(
        &self,
        stage_id: &str,
        quantity: i64,
    ) -> RepositoryResult<Option<ProductionRule>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {PRODUCTION_RULE_COLUMNS} FROM production_rule \
                     WHERE stage_id = ?1 AND active = 1 \
                       AND band_min <= ?2 AND band_max >= ?2 \
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![stage_id, quantity],
                production_rule_from_row,
            )
            .optional()?;
        raw.map(production_rule_from_raw).transpose()
    }
}

// ==========================================
// ScoringConfigRepository
// ==========================================
struct ScoringConfigRow {
    config_id: String,
    stage_id: String,
    fixed_points: String,
    per_check_points: String,
    min_points: String,
    max_points: Option<String>,
    active: bool,
    version: String,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

fn scoring_config_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<ScoringConfigRow> {
    Ok(ScoringConfigRow {
        config_id: row.get(0)?,
        stage_id: row.get(1)?,
        fixed_points: row.get(2)?,
        per_check_points: row.get(3)?,
        min_points: row.get(4)?,
        max_points: row.get(5)?,
        active: row.get::<_, i32>(6)? != 0,
        version: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn scoring_config_from_raw(raw: ScoringConfigRow) -> RepositoryResult<ScoringConfig> {
    Ok(ScoringConfig {
        config_id: raw.config_id,
        stage_id: raw.stage_id,
        fixed_points: decimal_from_db("fixed_points", &raw.fixed_points)?,
        per_check_points: decimal_from_db("per_check_points", &raw.per_check_points)?,
        min_points: decimal_from_db("min_points", &raw.min_points)?,
        max_points: opt_decimal_from_db("max_points", raw.max_points)?,
        active: raw.active,
        version: raw.version,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

const SCORING_CONFIG_COLUMNS: &str = "config_id, stage_id, fixed_points, per_check_points, \
     min_points, max_points, active, version, created_at, updated_at";

pub struct ScoringConfigRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScoringConfigRepository {
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
            CREATE TABLE IF NOT EXISTS scoring_config (
              config_id TEXT PRIMARY KEY,
              stage_id TEXT NOT NULL REFERENCES stage(stage_id),
              fixed_points TEXT NOT NULL DEFAULT '0',
              per_check_points TEXT NOT NULL DEFAULT '0',
              min_points TEXT NOT NULL DEFAULT '0',
              max_points TEXT,
              active INTEGER NOT NULL DEFAULT 1,
              version TEXT NOT NULL,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_scoring_config_stage
              ON scoring_config(stage_id, active);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, config: &ScoringConfig) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO scoring_config (config_id, stage_id, fixed_points, per_check_points, \
             min_points, max_points, active, version, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                config.config_id,
                config.stage_id,
                config.fixed_points.to_string(),
                config.per_check_points.to_string(),
                config.min_points.to_string(),
                config.max_points.map(|p| p.to_string()),
                config.active as i32,
                config.version,
                config.created_at,
                config.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Newest active config for a stage; histories record which version
    /// scored them.
    pub fn active_for_stage(&self, stage_id: &str) -> RepositoryResult<Option<ScoringConfig>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {SCORING_CONFIG_COLUMNS} FROM scoring_config \
                     WHERE stage_id = ?1 AND active = 1 \
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![stage_id],
                scoring_config_from_row,
            )
            .optional()?;
        raw.map(scoring_config_from_raw).transpose()
    }

    pub fn find_by_id(&self, config_id: &str) -> RepositoryResult<Option<ScoringConfig>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {SCORING_CONFIG_COLUMNS} FROM scoring_config WHERE config_id = ?1"
                ),
                params![config_id],
                scoring_config_from_row,
            )
            .optional()?;
        raw.map(scoring_config_from_raw).transpose()
    }
}

// ==========================================
// BonusTierRepository
// ==========================================
struct BonusTierRow {
    tier_id: String,
    band_min: String,
    band_max: Option<String>,
    amount: String,
    active: bool,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

fn bonus_tier_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<BonusTierRow> {
    Ok(BonusTierRow {
        tier_id: row.get(0)?,
        band_min: row.get(1)?,
        band_max: row.get(2)?,
        amount: row.get(3)?,
        active: row.get::<_, i32>(4)? != 0,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn bonus_tier_from_raw(raw: BonusTierRow) -> RepositoryResult<BonusTier> {
    Ok(BonusTier {
        tier_id: raw.tier_id,
        band_min: decimal_from_db("band_min", &raw.band_min)?,
        band_max: opt_decimal_from_db("band_max", raw.band_max)?,
        amount: decimal_from_db("amount", &raw.amount)?,
        active: raw.active,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

const BONUS_TIER_COLUMNS: &str =
    "tier_id, band_min, band_max, amount, active, created_at, updated_at";

pub struct BonusTierRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BonusTierRepository {
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
            CREATE TABLE IF NOT EXISTS bonus_tier (
              tier_id TEXT PRIMARY KEY,
              band_min TEXT NOT NULL,
              band_max TEXT,
              amount TEXT NOT NULL,
              active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, tier: &BonusTier) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO bonus_tier (tier_id, band_min, band_max, amount, active, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tier.tier_id,
                tier.band_min.to_string(),
                tier.band_max.map(|p| p.to_string()),
                tier.amount.to_string(),
                tier.active as i32,
                tier.created_at,
                tier.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<BonusTier>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BONUS_TIER_COLUMNS} FROM bonus_tier WHERE active = 1 \
             ORDER BY CAST(band_min AS REAL) ASC"
        ))?;
        let raws = stmt
            .query_map([], bonus_tier_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(bonus_tier_from_raw).collect()
    }

    /// Tier whose band contains the monthly total. Band comparison is done
    /// in Rust since bands are stored as TEXT decimals.
    pub fn find_for_points(&self, points: Decimal) -> RepositoryResult<Option<BonusTier>> {
        let tiers = self.list_active()?;
        Ok(tiers.into_iter().find(|t| t.contains(points)))
    }
}
