// ==========================================
// Pharmaflow - product type & work order repositories
// ==========================================
// The work_order table is the pipeline's moving part: current stage,
// assignment and queue status all live here and are updated by the
// workflow engine only.
// ==========================================

use crate::domain::order::{ProductType, WorkOrder};
use crate::domain::types::{
    LabKind, OrderStatus, ProductKind, QueueStatus, ShippingMethod,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{enum_from_db, opt_decimal_from_db};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// ProductTypeRepository
// ==========================================
struct ProductTypeRow {
    product_type_id: String,
    kind: String,
    name: String,
    lab: Option<String>,
    active: bool,
    created_at: NaiveDateTime,
}

fn product_type_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<ProductTypeRow> {
    Ok(ProductTypeRow {
        product_type_id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        lab: row.get(3)?,
        active: row.get::<_, i32>(4)? != 0,
        created_at: row.get(5)?,
    })
}

fn product_type_from_raw(raw: ProductTypeRow) -> RepositoryResult<ProductType> {
    Ok(ProductType {
        product_type_id: raw.product_type_id,
        kind: enum_from_db("kind", &raw.kind, ProductKind::parse)?,
        name: raw.name,
        lab: match raw.lab {
            Some(s) => Some(enum_from_db("lab", &s, LabKind::parse)?),
            None => None,
        },
        active: raw.active,
        created_at: raw.created_at,
    })
}

const PRODUCT_TYPE_COLUMNS: &str = "product_type_id, kind, name, lab, active, created_at";

pub struct ProductTypeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductTypeRepository {
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
            CREATE TABLE IF NOT EXISTS product_type (
              product_type_id TEXT PRIMARY KEY,
              kind TEXT NOT NULL,
              name TEXT NOT NULL,
              lab TEXT,
              active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_product_type_kind ON product_type(kind);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, product_type: &ProductType) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO product_type (product_type_id, kind, name, lab, active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product_type.product_type_id,
                product_type.kind.as_str(),
                product_type.name,
                product_type.lab.map(|l| l.as_str()),
                product_type.active as i32,
                product_type.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, product_type_id: &str) -> RepositoryResult<Option<ProductType>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {PRODUCT_TYPE_COLUMNS} FROM product_type WHERE product_type_id = ?1"
                ),
                params![product_type_id],
                product_type_from_row,
            )
            .optional()?;
        raw.map(product_type_from_raw).transpose()
    }

    /// Active product type for an automatically identified kind.
    pub fn find_by_kind(&self, kind: ProductKind) -> RepositoryResult<Option<ProductType>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {PRODUCT_TYPE_COLUMNS} FROM product_type \
                     WHERE kind = ?1 AND active = 1 LIMIT 1"
                ),
                params![kind.as_str()],
                product_type_from_row,
            )
            .optional()?;
        raw.map(product_type_from_raw).transpose()
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<ProductType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_TYPE_COLUMNS} FROM product_type WHERE active = 1 ORDER BY name ASC"
        ))?;
        let raws = stmt
            .query_map([], product_type_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(product_type_from_raw).collect()
    }
}

// ==========================================
// WorkOrderRepository
// ==========================================
struct WorkOrderRow {
    order_id: String,
    order_code: String,
    name: String,
    quantity: i64,
    product_type_id: Option<String>,
    source_id: Option<i64>,
    source_order_id: Option<i64>,
    source_web_id: Option<i64>,
    description: String,
    unit_price: Option<String>,
    total_price: Option<String>,
    source_updated_date: Option<chrono::NaiveDate>,
    source_updated_time: Option<chrono::NaiveTime>,
    identified_kind: Option<String>,
    current_stage_id: Option<String>,
    status: String,
    assigned_worker_id: Option<String>,
    queue_status: String,
    shipping_method: Option<String>,
    general_info: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    completed_at: Option<NaiveDateTime>,
}

fn order_from_row(row: &rusqlite::Row<'_>) -> SqliteResult<WorkOrderRow> {
    Ok(WorkOrderRow {
        order_id: row.get(0)?,
        order_code: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        product_type_id: row.get(4)?,
        source_id: row.get(5)?,
        source_order_id: row.get(6)?,
        source_web_id: row.get(7)?,
        description: row.get(8)?,
        unit_price: row.get(9)?,
        total_price: row.get(10)?,
        source_updated_date: row.get(11)?,
        source_updated_time: row.get(12)?,
        identified_kind: row.get(13)?,
        current_stage_id: row.get(14)?,
        status: row.get(15)?,
        assigned_worker_id: row.get(16)?,
        queue_status: row.get(17)?,
        shipping_method: row.get(18)?,
        general_info: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
        completed_at: row.get(22)?,
    })
}

fn order_from_raw(raw: WorkOrderRow) -> RepositoryResult<WorkOrder> {
    Ok(WorkOrder {
        order_id: raw.order_id,
        order_code: raw.order_code,
        name: raw.name,
        quantity: raw.quantity,
        product_type_id: raw.product_type_id,
        source_id: raw.source_id,
        source_order_id: raw.source_order_id,
        source_web_id: raw.source_web_id,
        description: raw.description,
        unit_price: opt_decimal_from_db("unit_price", raw.unit_price)?,
        total_price: opt_decimal_from_db("total_price", raw.total_price)?,
        source_updated_date: raw.source_updated_date,
        source_updated_time: raw.source_updated_time,
        identified_kind: match raw.identified_kind {
            Some(s) => Some(enum_from_db("identified_kind", &s, ProductKind::parse)?),
            None => None,
        },
        current_stage_id: raw.current_stage_id,
        status: enum_from_db("status", &raw.status, OrderStatus::parse)?,
        assigned_worker_id: raw.assigned_worker_id,
        queue_status: enum_from_db("queue_status", &raw.queue_status, QueueStatus::parse)?,
        shipping_method: match raw.shipping_method {
            Some(s) => Some(enum_from_db("shipping_method", &s, ShippingMethod::parse)?),
            None => None,
        },
        general_info: raw.general_info,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        completed_at: raw.completed_at,
    })
}

const ORDER_COLUMNS: &str = "order_id, order_code, name, quantity, product_type_id, source_id, \
     source_order_id, source_web_id, description, unit_price, total_price, source_updated_date, \
     source_updated_time, identified_kind, current_stage_id, status, assigned_worker_id, \
     queue_status, shipping_method, general_info, created_at, updated_at, completed_at";

/// Listing filter for workboard queries.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub stage_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub unassigned_only: bool,
    /// Case-insensitive substring match on code or name.
    pub search: Option<String>,
}

pub struct WorkOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkOrderRepository {
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
            CREATE TABLE IF NOT EXISTS work_order (
              order_id TEXT PRIMARY KEY,
              order_code TEXT NOT NULL,
              name TEXT NOT NULL,
              quantity INTEGER NOT NULL DEFAULT 0,
              product_type_id TEXT REFERENCES product_type(product_type_id),
              source_id INTEGER UNIQUE,
              source_order_id INTEGER,
              source_web_id INTEGER,
              description TEXT NOT NULL DEFAULT '',
              unit_price TEXT,
              total_price TEXT,
              source_updated_date TEXT,
              source_updated_time TEXT,
              identified_kind TEXT,
              current_stage_id TEXT REFERENCES stage(stage_id),
              status TEXT NOT NULL,
              assigned_worker_id TEXT REFERENCES worker(worker_id),
              queue_status TEXT NOT NULL,
              shipping_method TEXT,
              general_info TEXT NOT NULL DEFAULT '',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL,
              completed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_order_stage_status
              ON work_order(current_stage_id, status);
            CREATE INDEX IF NOT EXISTS idx_order_assignee
              ON work_order(assigned_worker_id, status);
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, order: &WorkOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO work_order (order_id, order_code, name, quantity, product_type_id, \
             source_id, source_order_id, source_web_id, description, unit_price, total_price, \
             source_updated_date, source_updated_time, identified_kind, current_stage_id, \
             status, assigned_worker_id, queue_status, shipping_method, general_info, \
             created_at, updated_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                order.order_id,
                order.order_code,
                order.name,
                order.quantity,
                order.product_type_id,
                order.source_id,
                order.source_order_id,
                order.source_web_id,
                order.description,
                order.unit_price.map(|p| p.to_string()),
                order.total_price.map(|p| p.to_string()),
                order.source_updated_date,
                order.source_updated_time,
                order.identified_kind.map(|k| k.as_str()),
                order.current_stage_id,
                order.status.as_str(),
                order.assigned_worker_id,
                order.queue_status.as_str(),
                order.shipping_method.map(|m| m.as_str()),
                order.general_info,
                order.created_at,
                order.updated_at,
                order.completed_at,
            ],
        )?;
        Ok(())
    }

    /// Full-row update; the engines mutate a loaded order and write it back.
    pub fn update(&self, order: &WorkOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE work_order SET order_code = ?2, name = ?3, quantity = ?4, \
             product_type_id = ?5, source_id = ?6, source_order_id = ?7, source_web_id = ?8, \
             description = ?9, unit_price = ?10, total_price = ?11, source_updated_date = ?12, \
             source_updated_time = ?13, identified_kind = ?14, current_stage_id = ?15, \
             status = ?16, assigned_worker_id = ?17, queue_status = ?18, shipping_method = ?19, \
             general_info = ?20, created_at = ?21, updated_at = ?22, completed_at = ?23 \
             WHERE order_id = ?1",
            params![
                order.order_id,
                order.order_code,
                order.name,
                order.quantity,
                order.product_type_id,
                order.source_id,
                order.source_order_id,
                order.source_web_id,
                order.description,
                order.unit_price.map(|p| p.to_string()),
                order.total_price.map(|p| p.to_string()),
                order.source_updated_date,
                order.source_updated_time,
                order.identified_kind.map(|k| k.as_str()),
                order.current_stage_id,
                order.status.as_str(),
                order.assigned_worker_id,
                order.queue_status.as_str(),
                order.shipping_method.map(|m| m.as_str()),
                order.general_info,
                order.created_at,
                order.updated_at,
                order.completed_at,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "WorkOrder".to_string(),
                id: order.order_id.clone(),
            });
        }
        Ok(())
    }

    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<WorkOrder>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM work_order WHERE order_id = ?1"),
                params![order_id],
                order_from_row,
            )
            .optional()?;
        raw.map(order_from_raw).transpose()
    }

    /// Lookup by the external system's unique item id (ingest upsert key).
    pub fn find_by_source_id(&self, source_id: i64) -> RepositoryResult<Option<WorkOrder>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM work_order WHERE source_id = ?1"),
                params![source_id],
                order_from_row,
            )
            .optional()?;
        raw.map(order_from_raw).transpose()
    }

    pub fn list(&self, filter: &OrderFilter) -> RepositoryResult<Vec<WorkOrder>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM work_order WHERE 1 = 1");
        let mut values: Vec<Value> = Vec::new();

        if let Some(stage_id) = &filter.stage_id {
            sql.push_str(" AND current_stage_id = ?");
            values.push(Value::Text(stage_id.clone()));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if filter.unassigned_only {
            sql.push_str(" AND assigned_worker_id IS NULL");
        }
        if let Some(search) = &filter.search {
            sql.push_str(" AND (order_code LIKE ? OR name LIKE ?)");
            let pattern = format!("%{search}%");
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }
        sql.push_str(" ORDER BY created_at ASC");

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
            .query_map(params_from_iter(values), order_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(order_from_raw).collect()
    }

    /// Orders a worker currently holds in the flow, active first.
    pub fn list_assigned(&self, worker_id: &str) -> RepositoryResult<Vec<WorkOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM work_order \
             WHERE assigned_worker_id = ?1 AND status = ?2 \
             ORDER BY queue_status ASC, updated_at ASC"
        ))?;
        let raws = stmt
            .query_map(
                params![worker_id, OrderStatus::InFlow.as_str()],
                order_from_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(order_from_raw).collect()
    }

    /// In-flow orders held by a worker, optionally excluding one stage
    /// (shipping claims do not count toward the concurrent-claim limit).
    pub fn count_assigned(
        &self,
        worker_id: &str,
        exclude_stage_id: Option<&str>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = match exclude_stage_id {
            Some(stage_id) => conn.query_row(
                "SELECT COUNT(*) FROM work_order \
                 WHERE assigned_worker_id = ?1 AND status = ?2 \
                   AND (current_stage_id IS NULL OR current_stage_id != ?3)",
                params![worker_id, OrderStatus::InFlow.as_str(), stage_id],
                |row| row.get::<_, i64>(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM work_order \
                 WHERE assigned_worker_id = ?1 AND status = ?2",
                params![worker_id, OrderStatus::InFlow.as_str()],
                |row| row.get::<_, i64>(0),
            )?,
        };
        Ok(count)
    }

    /// Demote every other ACTIVE order of the worker to PENDING, skipping the
    /// shipping stage where multiple active dispatches are allowed.
    pub fn demote_other_actives(
        &self,
        worker_id: &str,
        except_order_id: &str,
        shipping_stage_id: Option<&str>,
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = match shipping_stage_id {
            Some(stage_id) => conn.execute(
                "UPDATE work_order SET queue_status = ?1, updated_at = ?2 \
                 WHERE assigned_worker_id = ?3 AND queue_status = ?4 AND order_id != ?5 \
                   AND (current_stage_id IS NULL OR current_stage_id != ?6)",
                params![
                    QueueStatus::Pending.as_str(),
                    now,
                    worker_id,
                    QueueStatus::Active.as_str(),
                    except_order_id,
                    stage_id,
                ],
            )?,
            None => conn.execute(
                "UPDATE work_order SET queue_status = ?1, updated_at = ?2 \
                 WHERE assigned_worker_id = ?3 AND queue_status = ?4 AND order_id != ?5",
                params![
                    QueueStatus::Pending.as_str(),
                    now,
                    worker_id,
                    QueueStatus::Active.as_str(),
                    except_order_id,
                ],
            )?,
        };
        Ok(affected)
    }

    /// Whether the worker already has an ACTIVE order outside the shipping
    /// stage.
    pub fn has_active_outside(
        &self,
        worker_id: &str,
        shipping_stage_id: Option<&str>,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = match shipping_stage_id {
            Some(stage_id) => conn.query_row(
                "SELECT COUNT(*) FROM work_order \
                 WHERE assigned_worker_id = ?1 AND status = ?2 AND queue_status = ?3 \
                   AND (current_stage_id IS NULL OR current_stage_id != ?4)",
                params![
                    worker_id,
                    OrderStatus::InFlow.as_str(),
                    QueueStatus::Active.as_str(),
                    stage_id,
                ],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM work_order \
                 WHERE assigned_worker_id = ?1 AND status = ?2 AND queue_status = ?3",
                params![
                    worker_id,
                    OrderStatus::InFlow.as_str(),
                    QueueStatus::Active.as_str(),
                ],
                |row| row.get(0),
            )?,
        };
        Ok(count > 0)
    }
}
