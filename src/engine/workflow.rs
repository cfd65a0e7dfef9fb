// ==========================================
// Pharmaflow - stage workflow engine
// ==========================================
// Claim / queue / checklist / completion rules for orders moving through
// the pipeline. All mutations of work_order assignment fields happen here
// (plus the shipping and quality engines, which reuse the advance step).
// ==========================================

use crate::config::{ConfigManager, DEFAULT_MAX_CONCURRENT_CLAIMS, KEY_MAX_CONCURRENT_CLAIMS};
use crate::domain::audit::AuditLog;
use crate::domain::order::{ChecklistRun, StageHistory, WorkOrder};
use crate::domain::stage::Stage;
use crate::domain::types::{
    ActivityKind, AuditAction, OrderStatus, QueueStatus, ScoreSource,
};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::ScoringEngine;
use crate::repository::{
    AuditLogRepository, ChecklistRepository, ChecklistRunRepository, StageHistoryRepository,
    StageRepository, WorkOrderRepository,
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of a stage completion: the updated order and the points awarded.
#[derive(Debug)]
pub struct CompletionOutcome {
    pub order: WorkOrder,
    pub points: Decimal,
}

pub struct WorkflowEngine {
    orders: WorkOrderRepository,
    stages: StageRepository,
    checklists: ChecklistRepository,
    histories: StageHistoryRepository,
    runs: ChecklistRunRepository,
    scoring: ScoringEngine,
    audit: AuditLogRepository,
    config: ConfigManager,
}

impl WorkflowEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orders: WorkOrderRepository,
        stages: StageRepository,
        checklists: ChecklistRepository,
        histories: StageHistoryRepository,
        runs: ChecklistRunRepository,
        scoring: ScoringEngine,
        audit: AuditLogRepository,
        config: ConfigManager,
    ) -> Self {
        Self {
            orders,
            stages,
            checklists,
            histories,
            runs,
            scoring,
            audit,
            config,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn load_order(&self, order_id: &str) -> EngineResult<WorkOrder> {
        self.orders
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "WorkOrder".to_string(),
                id: order_id.to_string(),
            })
    }

    fn load_current_stage(&self, order: &WorkOrder) -> EngineResult<Stage> {
        let stage_id = order
            .current_stage_id
            .as_deref()
            .ok_or_else(|| EngineError::OrderNotInFlow(order.order_id.clone()))?;
        self.stages
            .find_by_id(stage_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Stage".to_string(),
                id: stage_id.to_string(),
            })
    }

    fn shipping_stage_id(&self) -> EngineResult<Option<String>> {
        Ok(self.stages.shipping_stage()?.map(|s| s.stage_id))
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

    // ==========================================
    // claim
    // ==========================================
    /// Worker takes an unassigned order at its current stage and a stage
    /// history opens. Outside shipping the claim count is capped and the
    /// single-active-item rule decides the queue status.
    pub fn claim(&self, worker_id: &str, order_id: &str) -> EngineResult<WorkOrder> {
        let mut order = self.load_order(order_id)?;
        if !order.is_in_flow() {
            return Err(EngineError::OrderNotInFlow(order_id.to_string()));
        }
        if order.is_assigned() {
            return Err(EngineError::AlreadyAssigned(order_id.to_string()));
        }
        let stage = self.load_current_stage(&order)?;

        // Progression gate: the preceding stage must have closed.
        if let Some(prev) = self.stages.previous_before(stage.sequence)? {
            if !self.histories.has_closed(order_id, &prev.stage_id)? {
                return Err(EngineError::PreviousStageIncomplete(prev.stage_id));
            }
        }

        let shipping_id = self.shipping_stage_id()?;
        if !stage.is_shipping() {
            let limit = self
                .config
                .get_i64_or(KEY_MAX_CONCURRENT_CLAIMS, DEFAULT_MAX_CONCURRENT_CLAIMS)?;
            let count = self.orders.count_assigned(worker_id, shipping_id.as_deref())?;
            if count >= limit {
                return Err(EngineError::ClaimLimitReached {
                    worker_id: worker_id.to_string(),
                    count,
                    limit,
                });
            }
        }

        // Shipping claims are always active; elsewhere the first claim is
        // active and later ones queue up pending.
        let queue_status = if stage.is_shipping() {
            QueueStatus::Active
        } else if self
            .orders
            .has_active_outside(worker_id, shipping_id.as_deref())?
        {
            QueueStatus::Pending
        } else {
            QueueStatus::Active
        };

        if self.histories.find_open(order_id, &stage.stage_id)?.is_some() {
            return Err(EngineError::Repository(
                crate::repository::RepositoryError::BusinessRuleViolation(format!(
                    "order {order_id} already has an open history at stage {}",
                    stage.stage_id
                )),
            ));
        }

        let now = Self::now();
        self.histories.open(&StageHistory {
            history_id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            stage_id: stage.stage_id.clone(),
            worker_id: worker_id.to_string(),
            started_at: now,
            finished_at: None,
            scoring_config_id: None,
            produced_qty: 0,
            points: Decimal::ZERO,
            notes: String::new(),
        })?;

        order.assigned_worker_id = Some(worker_id.to_string());
        order.queue_status = queue_status;
        order.updated_at = now;
        self.orders.update(&order)?;

        info!(
            order_id,
            worker_id,
            stage = %stage.name,
            queue = %order.queue_status,
            "order claimed"
        );
        self.record_audit(
            worker_id,
            AuditAction::ClaimStage,
            format!("claimed order {} at stage {}", order.order_code, stage.name),
        )?;
        Ok(order)
    }

    // ==========================================
    // toggle_queue
    // ==========================================
    /// Flip the caller's order between Active and Pending. Activating demotes
    /// every other active non-shipping order the worker holds; shipping
    /// orders never toggle.
    pub fn toggle_queue(&self, worker_id: &str, order_id: &str) -> EngineResult<WorkOrder> {
        let mut order = self.load_order(order_id)?;
        self.ensure_assignee(&order, worker_id)?;
        let stage = self.load_current_stage(&order)?;
        if stage.is_shipping() {
            return Err(EngineError::QueueToggleAtShipping);
        }

        let now = Self::now();
        match order.queue_status {
            QueueStatus::Active => {
                order.queue_status = QueueStatus::Pending;
            }
            QueueStatus::Pending => {
                let shipping_id = self.shipping_stage_id()?;
                self.orders.demote_other_actives(
                    worker_id,
                    order_id,
                    shipping_id.as_deref(),
                    now,
                )?;
                order.queue_status = QueueStatus::Active;
            }
        }
        order.updated_at = now;
        self.orders.update(&order)?;

        debug!(order_id, worker_id, queue = %order.queue_status, "queue toggled");
        self.record_audit(
            worker_id,
            AuditAction::ToggleQueue,
            format!("order {} queue -> {}", order.order_code, order.queue_status),
        )?;
        Ok(order)
    }

    // ==========================================
    // set_checklist
    // ==========================================
    /// Mark or unmark a check item on the caller's open history. Marking
    /// records the item's points and timestamp; unmarking zeroes them.
    pub fn set_checklist(
        &self,
        worker_id: &str,
        order_id: &str,
        checklist_id: &str,
        marked: bool,
    ) -> EngineResult<ChecklistRun> {
        let order = self.load_order(order_id)?;
        self.ensure_assignee(&order, worker_id)?;
        let stage = self.load_current_stage(&order)?;

        let checklist = self
            .checklists
            .find_by_id(checklist_id)?
            .filter(|c| c.stage_id == stage.stage_id && c.active)
            .ok_or_else(|| EngineError::NotFound {
                entity: "Checklist".to_string(),
                id: checklist_id.to_string(),
            })?;

        let history = self
            .histories
            .find_open(order_id, &stage.stage_id)?
            .filter(|h| h.worker_id == worker_id)
            .ok_or_else(|| EngineError::NoOpenHistory {
                order_id: order_id.to_string(),
                stage_id: stage.stage_id.clone(),
            })?;

        let run = self.runs.get_or_create(
            &Uuid::new_v4().to_string(),
            &history.history_id,
            checklist_id,
        )?;
        let (points, marked_at) = if marked {
            (checklist.points, Some(Self::now()))
        } else {
            (Decimal::ZERO, None)
        };
        self.runs.set_marked(&run.run_id, marked, points, marked_at)?;

        self.record_audit(
            worker_id,
            AuditAction::MarkChecklist,
            format!(
                "checklist '{}' {} on order {}",
                checklist.name,
                if marked { "marked" } else { "unmarked" },
                order.order_code
            ),
        )?;
        self.runs
            .find(&history.history_id, checklist_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "ChecklistRun".to_string(),
                id: run.run_id,
            })
    }

    // ==========================================
    // complete_stage
    // ==========================================
    /// Close the caller's open history with computed points and move the
    /// order forward. Quality-control stages refuse this path; they complete
    /// through form submission.
    pub fn complete_stage(
        &self,
        worker_id: &str,
        order_id: &str,
        produced_qty: Option<i64>,
        activity: Option<ActivityKind>,
        notes: &str,
    ) -> EngineResult<CompletionOutcome> {
        let mut order = self.load_order(order_id)?;
        self.ensure_assignee(&order, worker_id)?;
        let stage = self.load_current_stage(&order)?;
        if stage.is_quality_control() {
            return Err(EngineError::QualityFormRequired);
        }
        if order.queue_status != QueueStatus::Active {
            return Err(EngineError::PendingCannotComplete(order_id.to_string()));
        }

        let history = self
            .histories
            .find_open(order_id, &stage.stage_id)?
            .filter(|h| h.worker_id == worker_id)
            .ok_or_else(|| EngineError::NoOpenHistory {
                order_id: order_id.to_string(),
                stage_id: stage.stage_id.clone(),
            })?;

        let quantity = produced_qty.unwrap_or(order.quantity);
        let activity = activity.unwrap_or_else(|| ActivityKind::default_for_group(stage.group));

        let (points, scoring_config_id) = if stage.generates_points {
            self.scoring.compute_stage_points(
                &stage,
                order.product_type_id.as_deref(),
                activity,
                quantity,
                &history.history_id,
            )?
        } else {
            (Decimal::ZERO, None)
        };

        let now = Self::now();
        self.histories.close(
            &history.history_id,
            now,
            scoring_config_id.as_deref(),
            quantity,
            points,
            notes,
        )?;

        if points > Decimal::ZERO {
            let source = if stage.group == crate::domain::types::StageGroup::Production {
                ScoreSource::Production
            } else {
                ScoreSource::Stage
            };
            self.scoring.award(
                worker_id,
                Some(order_id),
                Some(&stage.stage_id),
                points,
                source,
                &format!("stage {} on order {}", stage.name, order.order_code),
            )?;
        }

        advance_order(&self.stages, &self.orders, &mut order, &stage, now)?;

        info!(
            order_id,
            worker_id,
            stage = %stage.name,
            %points,
            status = %order.status,
            "stage completed"
        );
        self.record_audit(
            worker_id,
            AuditAction::CompleteStage,
            format!(
                "completed stage {} on order {} ({points} pts)",
                stage.name, order.order_code
            ),
        )?;
        Ok(CompletionOutcome { order, points })
    }

    // ==========================================
    // release
    // ==========================================
    /// Give an order back to the pool without closing the stage; the open
    /// history is discarded.
    pub fn release(&self, worker_id: &str, order_id: &str) -> EngineResult<WorkOrder> {
        let mut order = self.load_order(order_id)?;
        self.ensure_assignee(&order, worker_id)?;
        let stage = self.load_current_stage(&order)?;

        if let Some(history) = self
            .histories
            .find_open(order_id, &stage.stage_id)?
            .filter(|h| h.worker_id == worker_id)
        {
            self.histories.delete_open(&history.history_id)?;
        }

        order.assigned_worker_id = None;
        order.queue_status = QueueStatus::Pending;
        order.updated_at = Self::now();
        self.orders.update(&order)?;

        info!(order_id, worker_id, "order released");
        self.record_audit(
            worker_id,
            AuditAction::ReleaseStage,
            format!("released order {} at stage {}", order.order_code, stage.name),
        )?;
        Ok(order)
    }

    fn ensure_assignee(&self, order: &WorkOrder, worker_id: &str) -> EngineResult<()> {
        if !order.is_in_flow() {
            return Err(EngineError::OrderNotInFlow(order.order_id.clone()));
        }
        match order.assigned_worker_id.as_deref() {
            Some(assignee) if assignee == worker_id => Ok(()),
            _ => Err(EngineError::NotAssignee {
                worker_id: worker_id.to_string(),
                order_id: order.order_id.clone(),
            }),
        }
    }
}

/// Move an order past a just-closed stage: either onto the next active stage
/// (unassigned, queue reset) or to terminal completion. Shared with the
/// shipping and quality engines.
pub(crate) fn advance_order(
    stages: &StageRepository,
    orders: &WorkOrderRepository,
    order: &mut WorkOrder,
    closed_stage: &Stage,
    now: NaiveDateTime,
) -> EngineResult<()> {
    match stages.next_after(closed_stage.sequence)? {
        Some(next) => {
            order.current_stage_id = Some(next.stage_id);
            order.assigned_worker_id = None;
            order.queue_status = QueueStatus::Active;
        }
        None => {
            order.status = OrderStatus::Completed;
            order.completed_at = Some(now);
            order.current_stage_id = None;
            order.assigned_worker_id = None;
        }
    }
    order.updated_at = now;
    orders.update(order)?;
    Ok(())
}
