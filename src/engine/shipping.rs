// ==========================================
// Pharmaflow - shipping route engine
// ==========================================
// Route building at the shipping stage: orders are selected onto a draft
// (the method is recorded on the order), then the route is finalized in one
// pass that claims, marks, scores, closes and advances every order on it.
// ==========================================

use crate::domain::audit::AuditLog;
use crate::domain::order::{StageHistory, WorkOrder};
use crate::domain::stage::Stage;
use crate::domain::types::{
    AuditAction, OrderStatus, QueueStatus, ScoreSource, SedexCountMode, ShippingMethod,
};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::ScoringEngine;
use crate::engine::workflow::advance_order;
use crate::repository::{
    AuditLogRepository, ChecklistRepository, ChecklistRunRepository, OrderFilter,
    ShippingConfigRepository, StageHistoryRepository, StageRepository, WorkOrderRepository,
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of a finalized route.
#[derive(Debug)]
pub struct RouteOutcome {
    pub dispatched: usize,
    pub total_points: Decimal,
}

pub struct ShippingEngine {
    orders: WorkOrderRepository,
    stages: StageRepository,
    checklists: ChecklistRepository,
    histories: StageHistoryRepository,
    runs: ChecklistRunRepository,
    configs: ShippingConfigRepository,
    scoring: ScoringEngine,
    audit: AuditLogRepository,
}

impl ShippingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orders: WorkOrderRepository,
        stages: StageRepository,
        checklists: ChecklistRepository,
        histories: StageHistoryRepository,
        runs: ChecklistRunRepository,
        configs: ShippingConfigRepository,
        scoring: ScoringEngine,
        audit: AuditLogRepository,
    ) -> Self {
        Self {
            orders,
            stages,
            checklists,
            histories,
            runs,
            configs,
            scoring,
            audit,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn shipping_stage(&self) -> EngineResult<Stage> {
        self.stages
            .shipping_stage()?
            .ok_or_else(|| EngineError::Config("no active shipping stage".to_string()))
    }

    fn load_order_at_shipping(&self, order_id: &str, stage: &Stage) -> EngineResult<WorkOrder> {
        let order = self
            .orders
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "WorkOrder".to_string(),
                id: order_id.to_string(),
            })?;
        if order.status != OrderStatus::InFlow {
            return Err(EngineError::OrderNotInFlow(order_id.to_string()));
        }
        if order.current_stage_id.as_deref() != Some(stage.stage_id.as_str()) {
            return Err(EngineError::NotAtShippingStage(order_id.to_string()));
        }
        Ok(order)
    }

    // ==========================================
    // Route draft
    // ==========================================
    /// Put an order on the draft by recording the dispatch method on it.
    pub fn select_order(
        &self,
        worker_id: &str,
        order_id: &str,
        method: ShippingMethod,
    ) -> EngineResult<WorkOrder> {
        let stage = self.shipping_stage()?;
        let mut order = self.load_order_at_shipping(order_id, &stage)?;
        if let Some(assignee) = order.assigned_worker_id.as_deref() {
            if assignee != worker_id {
                return Err(EngineError::AlreadyAssigned(order_id.to_string()));
            }
        }
        order.shipping_method = Some(method);
        order.updated_at = Self::now();
        self.orders.update(&order)?;
        debug!(order_id, worker_id, method = %method, "order added to route draft");
        self.record_audit(
            worker_id,
            AuditAction::SelectShippingMethod,
            format!("order {} -> {}", order.order_code, method),
        )?;
        Ok(order)
    }

    /// Take an order off the draft; the recorded method is cleared.
    pub fn deselect_order(&self, worker_id: &str, order_id: &str) -> EngineResult<WorkOrder> {
        let stage = self.shipping_stage()?;
        let mut order = self.load_order_at_shipping(order_id, &stage)?;
        order.shipping_method = None;
        order.updated_at = Self::now();
        self.orders.update(&order)?;
        debug!(order_id, worker_id, "order removed from route draft");
        Ok(order)
    }

    /// Drop the whole draft for a method: clears it from every in-flow order
    /// at the shipping stage.
    pub fn cancel_route(&self, worker_id: &str, method: ShippingMethod) -> EngineResult<usize> {
        let stage = self.shipping_stage()?;
        let drafted = self.list_draft(&stage, method)?;
        let now = Self::now();
        let count = drafted.len();
        for mut order in drafted {
            order.shipping_method = None;
            order.updated_at = now;
            self.orders.update(&order)?;
        }
        info!(worker_id, method = %method, count, "route draft cancelled");
        Ok(count)
    }

    fn list_draft(&self, stage: &Stage, method: ShippingMethod) -> EngineResult<Vec<WorkOrder>> {
        let orders = self.orders.list(&OrderFilter {
            stage_id: Some(stage.stage_id.clone()),
            status: Some(OrderStatus::InFlow),
            ..OrderFilter::default()
        })?;
        Ok(orders
            .into_iter()
            .filter(|o| o.shipping_method == Some(method))
            .collect())
    }

    // ==========================================
    // Finalize
    // ==========================================
    /// Dispatch a route. Per order: claim if unassigned, open or reuse the
    /// history, mark the method's check item, score, close and advance.
    /// Motoboy pays per order plus a once-a-day duty bonus; Sedex pays per
    /// dispatch or once per worker-day depending on configuration.
    pub fn finalize_route(
        &self,
        worker_id: &str,
        method: ShippingMethod,
        order_ids: &[String],
    ) -> EngineResult<RouteOutcome> {
        if order_ids.is_empty() {
            return Err(EngineError::EmptyRoute);
        }
        let stage = self.shipping_stage()?;
        let config = self
            .configs
            .find_for_method(method)?
            .ok_or_else(|| EngineError::ShippingNotConfigured(method.to_string()))?;
        let checklist = self
            .checklists
            .find_by_name(&stage.stage_id, method.checklist_name())?
            .ok_or_else(|| {
                EngineError::ChecklistNotConfigured(method.checklist_name().to_string())
            })?;

        let now = Self::now();
        let first_dispatch_today =
            !self
                .runs
                .has_marked_on_day(worker_id, &checklist.checklist_id, now.date())?;

        let mut total_points = Decimal::ZERO;
        let mut sedex_daily_pending = matches!(
            (method, config.sedex_count_mode),
            (ShippingMethod::Sedex, SedexCountMode::PerDay)
        ) && first_dispatch_today;

        for order_id in order_ids {
            let mut order = self.load_order_at_shipping(order_id, &stage)?;

            match order.assigned_worker_id.as_deref() {
                Some(assignee) if assignee != worker_id => {
                    return Err(EngineError::AlreadyAssigned(order_id.clone()));
                }
                Some(_) => {}
                None => {
                    order.assigned_worker_id = Some(worker_id.to_string());
                    order.queue_status = QueueStatus::Active;
                }
            }
            order.shipping_method = Some(method);

            let history = match self
                .histories
                .find_open(order_id, &stage.stage_id)?
                .filter(|h| h.worker_id == worker_id)
            {
                Some(h) => h,
                None => {
                    let history = StageHistory {
                        history_id: Uuid::new_v4().to_string(),
                        order_id: order_id.clone(),
                        stage_id: stage.stage_id.clone(),
                        worker_id: worker_id.to_string(),
                        started_at: now,
                        finished_at: None,
                        scoring_config_id: None,
                        produced_qty: 0,
                        points: Decimal::ZERO,
                        notes: String::new(),
                    };
                    self.histories.open(&history)?;
                    history
                }
            };

            let run = self.runs.get_or_create(
                &Uuid::new_v4().to_string(),
                &history.history_id,
                &checklist.checklist_id,
            )?;
            self.runs
                .set_marked(&run.run_id, true, checklist.points, Some(now))?;

            let method_points = match method {
                ShippingMethod::Motoboy => config.points_per_route,
                ShippingMethod::Sedex => match config.sedex_count_mode {
                    SedexCountMode::PerDispatch => config.sedex_points,
                    SedexCountMode::PerDay => {
                        if sedex_daily_pending {
                            sedex_daily_pending = false;
                            config.sedex_points
                        } else {
                            Decimal::ZERO
                        }
                    }
                },
            };
            let points = method_points + stage.fixed_points;

            self.histories.close(
                &history.history_id,
                now,
                None,
                order.quantity,
                points,
                "",
            )?;
            if points > Decimal::ZERO {
                self.scoring.award(
                    worker_id,
                    Some(order_id),
                    Some(&stage.stage_id),
                    points,
                    ScoreSource::Shipping,
                    &format!("{} dispatch of order {}", method, order.order_code),
                )?;
            }
            total_points += points;

            advance_order(&self.stages, &self.orders, &mut order, &stage, now)?;
        }

        // Motoboy duty bonus, once per worker-day.
        if method == ShippingMethod::Motoboy
            && first_dispatch_today
            && config.daily_fixed_points > Decimal::ZERO
        {
            self.scoring.award(
                worker_id,
                None,
                Some(&stage.stage_id),
                config.daily_fixed_points,
                ScoreSource::Shipping,
                "motoboy daily duty",
            )?;
            total_points += config.daily_fixed_points;
        }

        info!(
            worker_id,
            method = %method,
            dispatched = order_ids.len(),
            %total_points,
            "route finalized"
        );
        self.record_audit(
            worker_id,
            AuditAction::FinalizeRoute,
            format!("{} route with {} orders", method, order_ids.len()),
        )?;
        Ok(RouteOutcome {
            dispatched: order_ids.len(),
            total_points,
        })
    }

    fn record_audit(
        &self,
        worker_id: &str,
        action: AuditAction,
        description: String,
    ) -> EngineResult<()> {
        self.audit.append(&AuditLog {
            log_id: Uuid::new_v4().to_string(),
            worker_id: Some(worker_id.to_string()),
            action,
            description,
            recorded_at: Self::now(),
            details_json: None,
        })?;
        Ok(())
    }
}
