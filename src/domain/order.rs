// ==========================================
// Pharmaflow - work order domain model
// ==========================================
// A work order ("pedido") flows through the stage pipeline; stage histories
// record who worked each stage and what it was worth.
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::{LabKind, OrderStatus, ProductKind, QueueStatus, ShippingMethod};

// ==========================================
// ProductType
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductType {
    pub product_type_id: String,
    pub kind: ProductKind,
    pub name: String,
    pub lab: Option<LabKind>,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

// ==========================================
// WorkOrder
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub order_id: String,
    /// Reference code derived from the external ids (not unique).
    pub order_code: String,
    pub name: String,
    pub quantity: i64,
    pub product_type_id: Option<String>,

    // ===== External source fields =====
    /// Unique item id in the source system.
    pub source_id: Option<i64>,
    pub source_order_id: Option<i64>,
    pub source_web_id: Option<i64>,
    pub description: String,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub source_updated_date: Option<NaiveDate>,
    pub source_updated_time: Option<NaiveTime>,
    /// Kind identified automatically from the description; None means the
    /// description matched no keyword and a manual fix is needed.
    pub identified_kind: Option<ProductKind>,

    // ===== Workflow fields =====
    pub current_stage_id: Option<String>,
    pub status: OrderStatus,
    pub assigned_worker_id: Option<String>,
    pub queue_status: QueueStatus,
    pub shipping_method: Option<ShippingMethod>,
    pub general_info: String,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

impl WorkOrder {
    pub fn is_in_flow(&self) -> bool {
        self.status == OrderStatus::InFlow
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_worker_id.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.queue_status == QueueStatus::Active
    }
}

// ==========================================
// StageHistory
// ==========================================
// One open record per worker per order per stage; closed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHistory {
    pub history_id: String,
    pub order_id: String,
    pub stage_id: String,
    pub worker_id: String,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    /// Scoring config version captured when the history closed.
    pub scoring_config_id: Option<String>,
    pub produced_qty: i64,
    pub points: Decimal,
    pub notes: String,
}

impl StageHistory {
    pub fn is_open(&self) -> bool {
        self.finished_at.is_none()
    }

    /// Minutes between start and finish; None while still open.
    pub fn elapsed_minutes(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_minutes())
    }
}

// ==========================================
// ChecklistRun
// ==========================================
// Execution of one checklist item inside a stage history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistRun {
    pub run_id: String,
    pub history_id: String,
    pub checklist_id: String,
    pub marked: bool,
    pub points: Decimal,
    pub marked_at: Option<NaiveDateTime>,
}
