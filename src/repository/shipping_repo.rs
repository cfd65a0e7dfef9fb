// ==========================================
// Pharmaflow - shipping configuration repository
// ==========================================
// One row per dispatch method; the method column is UNIQUE so updating a
// method's rules replaces its single row.
// ==========================================

use crate::domain::shipping::ShippingConfig;
use crate::domain::types::{SedexCountMode, ShippingMethod};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{decimal_from_db, enum_from_db};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

struct ConfigRow {
    config_id: String,
    method: String,
    points_per_route: String,
    daily_fixed_points: String,
    sedex_count_mode: String,
    sedex_points: String,
    active: bool,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

fn config_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<ConfigRow> {
    Ok(ConfigRow {
        config_id: row.get(0)?,
        method: row.get(1)?,
        points_per_route: row.get(2)?,
        daily_fixed_points: row.get(3)?,
        sedex_count_mode: row.get(4)?,
        sedex_points: row.get(5)?,
        active: row.get::<_, i32>(6)? != 0,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn config_from_raw(raw: ConfigRow) -> RepositoryResult<ShippingConfig> {
    Ok(ShippingConfig {
        config_id: raw.config_id,
        method: enum_from_db("method", &raw.method, ShippingMethod::parse)?,
        points_per_route: decimal_from_db("points_per_route", &raw.points_per_route)?,
        daily_fixed_points: decimal_from_db("daily_fixed_points", &raw.daily_fixed_points)?,
        sedex_count_mode: enum_from_db(
            "sedex_count_mode",
            &raw.sedex_count_mode,
            SedexCountMode::parse,
        )?,
        sedex_points: decimal_from_db("sedex_points", &raw.sedex_points)?,
        active: raw.active,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

const CONFIG_COLUMNS: &str = "config_id, method, points_per_route, daily_fixed_points, \
     sedex_count_mode, sedex_points, active, created_at, updated_at";

pub struct ShippingConfigRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShippingConfigRepository {
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
            CREATE TABLE IF NOT EXISTS shipping_config (
              config_id TEXT PRIMARY KEY,
              method TEXT NOT NULL UNIQUE,
              points_per_route TEXT NOT NULL DEFAULT '0',
              daily_fixed_points TEXT NOT NULL DEFAULT '0',
              sedex_count_mode TEXT NOT NULL,
              sedex_points TEXT NOT NULL DEFAULT '0',
              active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn upsert(&self, config: &ShippingConfig) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO shipping_config (config_id, method, points_per_route, \
             daily_fixed_points, sedex_count_mode, sedex_points, active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(method) DO UPDATE SET \
               points_per_route = excluded.points_per_route, \
               daily_fixed_points = excluded.daily_fixed_points, \
               sedex_count_mode = excluded.sedex_count_mode, \
               sedex_points = excluded.sedex_points, \
               active = excluded.active, updated_at = excluded.updated_at",
            params![
                config.config_id,
                config.method.as_str(),
                config.points_per_route.to_string(),
                config.daily_fixed_points.to_string(),
                config.sedex_count_mode.as_str(),
                config.sedex_points.to_string(),
                config.active as i32,
                config.created_at,
                config.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_for_method(
        &self,
        method: ShippingMethod,
    ) -> RepositoryResult<Option<ShippingConfig>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {CONFIG_COLUMNS} FROM shipping_config \
                     WHERE method = ?1 AND active = 1"
                ),
                params![method.as_str()],
                config_from_row,
            )
            .optional()?;
        raw.map(config_from_raw).transpose()
    }
}
