// ==========================================
// Pharmaflow - monthly bonus engine
// ==========================================
// Month close: recompute every worker's total from the ledger, look up the
// bonus tier and upsert the (worker, month) record with a pending payout.
// ==========================================

use crate::domain::audit::AuditLog;
use crate::domain::scoring::MonthlyBonus;
use crate::domain::types::{AuditAction, PayoutStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{
    AuditLogRepository, BonusTierRepository, MonthlyBonusRepository, ScoreLedgerRepository,
    WorkerRepository,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

pub struct BonusEngine {
    ledger: ScoreLedgerRepository,
    tiers: BonusTierRepository,
    bonuses: MonthlyBonusRepository,
    workers: WorkerRepository,
    audit: AuditLogRepository,
}

impl BonusEngine {
    pub fn new(
        ledger: ScoreLedgerRepository,
        tiers: BonusTierRepository,
        bonuses: MonthlyBonusRepository,
        workers: WorkerRepository,
        audit: AuditLogRepository,
    ) -> Self {
        Self {
            ledger,
            tiers,
            bonuses,
            workers,
            audit,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn ensure_manager(&self, worker_id: &str) -> EngineResult<()> {
        let worker = self.workers.require(worker_id)?;
        if !worker.role.is_manager() {
            return Err(EngineError::NotAuthorized(worker_id.to_string()));
        }
        Ok(())
    }

    /// Close a month: one bonus record per worker with ledger activity.
    /// Re-running recomputes totals and resets payouts to pending.
    pub fn close_month(
        &self,
        manager_id: &str,
        month_ref: NaiveDate,
    ) -> EngineResult<Vec<MonthlyBonus>> {
        self.ensure_manager(manager_id)?;
        let now = Self::now();
        let mut result = Vec::new();

        for worker_id in self.ledger.workers_with_entries(month_ref)? {
            let total = self.ledger.month_total(&worker_id, month_ref)?;
            let amount = self
                .tiers
                .find_for_points(total)?
                .map(|t| t.amount)
                .unwrap_or(Decimal::ZERO);

            // Keep the existing id on recomputation.
            let bonus_id = match self.bonuses.find(&worker_id, month_ref)? {
                Some(existing) => existing.bonus_id,
                None => Uuid::new_v4().to_string(),
            };
            let bonus = MonthlyBonus {
                bonus_id,
                worker_id: worker_id.clone(),
                month_ref,
                total_points: total,
                amount,
                payout_status: PayoutStatus::Pending,
                computed_at: now,
                paid_at: None,
            };
            self.bonuses.upsert(&bonus)?;
            result.push(bonus);
        }

        info!(
            month = %month_ref,
            manager_id,
            workers = result.len(),
            "month closed"
        );
        self.audit.append(&AuditLog {
            log_id: Uuid::new_v4().to_string(),
            worker_id: Some(manager_id.to_string()),
            action: AuditAction::CloseMonth,
            description: format!("closed month {month_ref} for {} workers", result.len()),
            recorded_at: now,
            details_json: None,
        })?;
        Ok(result)
    }

    pub fn mark_paid(
        &self,
        manager_id: &str,
        worker_id: &str,
        month_ref: NaiveDate,
    ) -> EngineResult<MonthlyBonus> {
        self.set_status(manager_id, worker_id, month_ref, PayoutStatus::Paid)
    }

    pub fn cancel(
        &self,
        manager_id: &str,
        worker_id: &str,
        month_ref: NaiveDate,
    ) -> EngineResult<MonthlyBonus> {
        self.set_status(manager_id, worker_id, month_ref, PayoutStatus::Cancelled)
    }

    fn set_status(
        &self,
        manager_id: &str,
        worker_id: &str,
        month_ref: NaiveDate,
        status: PayoutStatus,
    ) -> EngineResult<MonthlyBonus> {
        self.ensure_manager(manager_id)?;
        let bonus = self
            .bonuses
            .find(worker_id, month_ref)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "MonthlyBonus".to_string(),
                id: format!("{worker_id}/{month_ref}"),
            })?;
        let paid_at = match status {
            PayoutStatus::Paid => Some(Self::now()),
            _ => None,
        };
        self.bonuses
            .set_payout_status(&bonus.bonus_id, status, paid_at)?;
        self.bonuses
            .find(worker_id, month_ref)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "MonthlyBonus".to_string(),
                id: format!("{worker_id}/{month_ref}"),
            })
    }
}
