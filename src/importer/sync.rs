// ==========================================
// Pharmaflow - order synchronization
// ==========================================
// Upsert of normalized records into work_order, keyed by source_id.
// New orders enter the pipeline at the first stage; updates touch source
// fields only and never move an order's workflow position.
// ==========================================

use crate::domain::audit::AuditLog;
use crate::domain::order::WorkOrder;
use crate::domain::types::{AuditAction, OrderStatus, QueueStatus};
use crate::importer::classify;
use crate::importer::order_source::{OrderRecord, OrderSource};
use crate::repository::{
    AuditLogRepository, ProductTypeRepository, RepositoryResult, StageRepository,
    WorkOrderRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome counts of one synchronization pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: usize,
}

pub struct OrderSyncService {
    orders: WorkOrderRepository,
    product_types: ProductTypeRepository,
    stages: StageRepository,
    audit: AuditLogRepository,
}

impl OrderSyncService {
    pub fn new(
        orders: WorkOrderRepository,
        product_types: ProductTypeRepository,
        stages: StageRepository,
        audit: AuditLogRepository,
    ) -> Self {
        Self {
            orders,
            product_types,
            stages,
            audit,
        }
    }

    /// Fetch from a source and upsert everything it returned.
    pub async fn sync_from(&self, source: &dyn OrderSource) -> anyhow::Result<SyncSummary> {
        let records = source.fetch_records().await?;
        Ok(self.sync_records(&records)?)
    }

    pub fn sync_records(&self, records: &[OrderRecord]) -> RepositoryResult<SyncSummary> {
        let mut summary = SyncSummary::default();
        for record in records {
            match self.upsert_record(record) {
                Ok(UpsertOutcome::Created) => summary.created += 1,
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Ok(UpsertOutcome::Unchanged) => summary.unchanged += 1,
                Err(e) => {
                    warn!(source_id = record.source_id, error = %e, "record skipped");
                    summary.errors += 1;
                }
            }
        }
        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            errors = summary.errors,
            "order sync finished"
        );
        self.audit.append(&AuditLog {
            log_id: Uuid::new_v4().to_string(),
            worker_id: None,
            action: AuditAction::SyncOrders,
            description: format!(
                "sync: {} created, {} updated, {} unchanged, {} errors",
                summary.created, summary.updated, summary.unchanged, summary.errors
            ),
            recorded_at: chrono::Local::now().naive_local(),
            details_json: None,
        })?;
        Ok(summary)
    }

    fn upsert_record(&self, record: &OrderRecord) -> RepositoryResult<UpsertOutcome> {
        match self.orders.find_by_source_id(record.source_id)? {
            Some(existing) => self.apply_changes(existing, record),
            None => {
                self.create_order(record)?;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    fn create_order(&self, record: &OrderRecord) -> RepositoryResult<()> {
        let identified_kind = classify::identify_kind(&record.description);
        let quantity = record
            .quantity
            .or_else(|| classify::extract_quantity(&record.description))
            .unwrap_or(0);
        let product_type_id = match identified_kind {
            Some(kind) => self
                .product_types
                .find_by_kind(kind)?
                .map(|pt| pt.product_type_id),
            None => None,
        };
        let first_stage = self.stages.first_active()?;

        let order_code = match (record.source_order_id, record.source_web_id) {
            (Some(order_id), Some(web_id)) => format!("{order_id}-{web_id}"),
            (Some(order_id), None) => order_id.to_string(),
            _ => format!("SRC-{}", record.source_id),
        };

        let now = chrono::Local::now().naive_local();
        self.orders.insert(&WorkOrder {
            order_id: Uuid::new_v4().to_string(),
            order_code,
            name: record.name.clone(),
            quantity,
            product_type_id,
            source_id: Some(record.source_id),
            source_order_id: record.source_order_id,
            source_web_id: record.source_web_id,
            description: record.description.clone(),
            unit_price: record.unit_price,
            total_price: record.total_price,
            source_updated_date: record.updated_date,
            source_updated_time: record.updated_time,
            identified_kind,
            current_stage_id: first_stage.map(|s| s.stage_id),
            status: OrderStatus::InFlow,
            assigned_worker_id: None,
            queue_status: QueueStatus::Pending,
            shipping_method: None,
            general_info: String::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Field-by-field change detection; only source-owned fields move.
    fn apply_changes(
        &self,
        mut order: WorkOrder,
        record: &OrderRecord,
    ) -> RepositoryResult<UpsertOutcome> {
        let mut changed = false;

        if order.name != record.name {
            order.name = record.name.clone();
            changed = true;
        }
        if order.description != record.description {
            order.description = record.description.clone();
            order.identified_kind = classify::identify_kind(&order.description);
            changed = true;
        }
        if let Some(quantity) = record
            .quantity
            .or_else(|| classify::extract_quantity(&record.description))
        {
            if order.quantity != quantity {
                order.quantity = quantity;
                changed = true;
            }
        }
        if order.unit_price != record.unit_price {
            order.unit_price = record.unit_price;
            changed = true;
        }
        if order.total_price != record.total_price {
            order.total_price = record.total_price;
            changed = true;
        }
        if order.source_updated_date != record.updated_date {
            order.source_updated_date = record.updated_date;
            changed = true;
        }
        if order.source_updated_time != record.updated_time {
            order.source_updated_time = record.updated_time;
            changed = true;
        }

        if changed {
            order.updated_at = chrono::Local::now().naive_local();
            self.orders.update(&order)?;
            Ok(UpsertOutcome::Updated)
        } else {
            Ok(UpsertOutcome::Unchanged)
        }
    }
}

enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}
