// ==========================================
// Pharmaflow - workboard read models
// ==========================================
// Query facade for the outer shell: what can be claimed, what a worker
// holds, and the worker's month at a glance. Read-only, no HTTP here.
// ==========================================

use crate::domain::order::WorkOrder;
use crate::domain::scoring::{MonthlyBonus, Penalty};
use crate::domain::types::OrderStatus;
use crate::engine::scoring_core;
use crate::repository::{
    BonusTierRepository, MonthlyBonusRepository, OrderFilter, PenaltyRepository,
    RepositoryResult, ScoreLedgerRepository, StageRepository, WorkOrderRepository,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// An order a worker could claim, with its stage resolved for display.
#[derive(Debug, Serialize)]
pub struct AvailableOrder {
    pub order: WorkOrder,
    pub stage_name: String,
    pub stage_sequence: i32,
}

/// A worker's month at a glance.
#[derive(Debug, Serialize)]
pub struct MonthProfile {
    pub worker_id: String,
    pub month_ref: NaiveDate,
    pub total_points: Decimal,
    /// Bonus amount the current total would earn.
    pub projected_bonus: Option<Decimal>,
    pub bonus: Option<MonthlyBonus>,
    pub penalties: Vec<Penalty>,
}

pub struct WorkboardApi {
    orders: WorkOrderRepository,
    stages: StageRepository,
    ledger: ScoreLedgerRepository,
    tiers: BonusTierRepository,
    penalties: PenaltyRepository,
    bonuses: MonthlyBonusRepository,
}

impl WorkboardApi {
    pub fn new(
        orders: WorkOrderRepository,
        stages: StageRepository,
        ledger: ScoreLedgerRepository,
        tiers: BonusTierRepository,
        penalties: PenaltyRepository,
        bonuses: MonthlyBonusRepository,
    ) -> Self {
        Self {
            orders,
            stages,
            ledger,
            tiers,
            penalties,
            bonuses,
        }
    }

    /// Unassigned in-flow orders, optionally narrowed to one stage or a
    /// code/name search.
    pub fn available_orders(
        &self,
        stage_id: Option<&str>,
        search: Option<&str>,
    ) -> RepositoryResult<Vec<AvailableOrder>> {
        let stage_names: HashMap<String, (String, i32)> = self
            .stages
            .list_active()?
            .into_iter()
            .map(|s| (s.stage_id, (s.name, s.sequence)))
            .collect();

        let orders = self.orders.list(&OrderFilter {
            stage_id: stage_id.map(String::from),
            status: Some(OrderStatus::InFlow),
            unassigned_only: true,
            search: search.map(String::from),
        })?;

        Ok(orders
            .into_iter()
            .map(|order| {
                let (stage_name, stage_sequence) = order
                    .current_stage_id
                    .as_deref()
                    .and_then(|id| stage_names.get(id).cloned())
                    .unwrap_or_else(|| ("?".to_string(), 0));
                AvailableOrder {
                    order,
                    stage_name,
                    stage_sequence,
                }
            })
            .collect())
    }

    /// Orders the worker currently holds, active first.
    pub fn worker_orders(&self, worker_id: &str) -> RepositoryResult<Vec<WorkOrder>> {
        self.orders.list_assigned(worker_id)
    }

    pub fn completed_orders(&self) -> RepositoryResult<Vec<WorkOrder>> {
        self.orders.list(&OrderFilter {
            status: Some(OrderStatus::Completed),
            ..OrderFilter::default()
        })
    }

    /// Points, projected bonus, payout record and penalties for a month.
    pub fn month_profile(
        &self,
        worker_id: &str,
        month_ref: NaiveDate,
    ) -> RepositoryResult<MonthProfile> {
        let total_points = self.ledger.month_total(worker_id, month_ref)?;
        let tiers = self.tiers.list_active()?;
        let projected_bonus =
            scoring_core::pick_bonus_tier(&tiers, total_points).map(|t| t.amount);
        let bonus = self.bonuses.find(worker_id, month_ref)?;
        let penalties = self
            .penalties
            .list_for_worker(worker_id)?
            .into_iter()
            .filter(|p| scoring_core::month_ref_for(p.applied_at.date()) == month_ref)
            .collect();
        Ok(MonthProfile {
            worker_id: worker_id.to_string(),
            month_ref,
            total_points,
            projected_bonus,
            bonus,
            penalties,
        })
    }
}
