// ==========================================
// Pharmaflow - scoring engine
// ==========================================
// Point computation for stage completion plus ledger bookkeeping: awards,
// penalties and fixed monthly rules. The ledger is append-only; a penalty
// reversal writes an offsetting entry.
// ==========================================

use crate::domain::scoring::{FixedRuleApplication, Penalty, ScoreEntry};
use crate::domain::stage::Stage;
use crate::domain::types::{ActivityKind, ApplicationMode, ScoreSource, StageGroup};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring_core;
use crate::repository::{
    ActivityScoreRuleRepository, ChecklistRunRepository, FixedRuleRepository, PenaltyRepository,
    ProductionRuleRepository, ScoreLedgerRepository, ScoringConfigRepository, WorkerRepository,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

pub struct ScoringEngine {
    activity_rules: ActivityScoreRuleRepository,
    production_rules: ProductionRuleRepository,
    scoring_configs: ScoringConfigRepository,
    runs: ChecklistRunRepository,
    ledger: ScoreLedgerRepository,
    penalties: PenaltyRepository,
    fixed_rules: FixedRuleRepository,
    workers: WorkerRepository,
}

impl ScoringEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        activity_rules: ActivityScoreRuleRepository,
        production_rules: ProductionRuleRepository,
        scoring_configs: ScoringConfigRepository,
        runs: ChecklistRunRepository,
        ledger: ScoreLedgerRepository,
        penalties: PenaltyRepository,
        fixed_rules: FixedRuleRepository,
        workers: WorkerRepository,
    ) -> Self {
        Self {
            activity_rules,
            production_rules,
            scoring_configs,
            runs,
            ledger,
            penalties,
            fixed_rules,
            workers,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    // ==========================================
    // Stage point computation
    // ==========================================
    /// Cascade: production rule (production stages) or activity table
    /// (quantity-scored stages); fallback to the stage's checklist config;
    /// the stage's own fixed points are always added on top. Returns the
    /// points and the scoring config version used, if any.
    pub fn compute_stage_points(
        &self,
        stage: &Stage,
        product_type_id: Option<&str>,
        activity: ActivityKind,
        quantity: i64,
        history_id: &str,
    ) -> EngineResult<(Decimal, Option<String>)> {
        let mut points = Decimal::ZERO;
        let mut config_id = None;
        let mut rule_matched = false;

        if stage.group == StageGroup::Production {
            if let Some(rule) = self.production_rules.find_matching(&stage.stage_id, quantity)? {
                points += scoring_core::production_points(&rule, quantity);
                rule_matched = true;
                debug!(rule_id = %rule.rule_id, quantity, %points, "production rule matched");
            }
        } else if stage.has_quantity_scoring {
            if let Some(rule) = self.activity_rules.find_matching(
                &stage.stage_id,
                activity,
                product_type_id,
                quantity,
            )? {
                points += rule.points;
                rule_matched = true;
                debug!(rule_id = %rule.rule_id, quantity, %points, "activity rule matched");
            }
        }

        if !rule_matched {
            if let Some(config) = self.scoring_configs.active_for_stage(&stage.stage_id)? {
                let marked = self.runs.marked_count(history_id)?;
                points += scoring_core::checklist_points(&config, marked);
                config_id = Some(config.config_id);
            }
        }

        points += stage.fixed_points;
        Ok((points, config_id))
    }

    // ==========================================
    // Ledger
    // ==========================================
    /// Append a ledger entry dated now, grouped under the current month.
    pub fn award(
        &self,
        worker_id: &str,
        order_id: Option<&str>,
        stage_id: Option<&str>,
        points: Decimal,
        source: ScoreSource,
        note: &str,
    ) -> EngineResult<ScoreEntry> {
        let now = Self::now();
        let entry = ScoreEntry {
            entry_id: Uuid::new_v4().to_string(),
            worker_id: worker_id.to_string(),
            order_id: order_id.map(String::from),
            stage_id: stage_id.map(String::from),
            points,
            source,
            recorded_at: now,
            month_ref: scoring_core::month_ref_for(now.date()),
            note: note.to_string(),
        };
        self.ledger.append(&entry)?;
        debug!(worker_id, %points, source = %source, "ledger entry appended");
        Ok(entry)
    }

    pub fn month_total(&self, worker_id: &str, month_ref: NaiveDate) -> EngineResult<Decimal> {
        Ok(self.ledger.month_total(worker_id, month_ref)?)
    }

    pub fn list_month(
        &self,
        worker_id: &str,
        month_ref: NaiveDate,
    ) -> EngineResult<Vec<ScoreEntry>> {
        Ok(self.ledger.list_month(worker_id, month_ref)?)
    }

    // ==========================================
    // Penalties
    // ==========================================
    /// Manager-gated: records the penalty and appends a negated ledger entry.
    pub fn apply_penalty(
        &self,
        manager_id: &str,
        worker_id: &str,
        reason: &str,
        points: Decimal,
        justification: &str,
    ) -> EngineResult<Penalty> {
        self.ensure_manager(manager_id)?;
        let penalty = Penalty {
            penalty_id: Uuid::new_v4().to_string(),
            worker_id: worker_id.to_string(),
            reason: reason.to_string(),
            points,
            justification: justification.to_string(),
            applied_by: manager_id.to_string(),
            applied_at: Self::now(),
            reverted: false,
            reverted_at: None,
            reverted_by: None,
        };
        self.penalties.insert(&penalty)?;
        self.award(
            worker_id,
            None,
            None,
            -points,
            ScoreSource::Penalty,
            &format!("penalty: {reason}"),
        )?;
        info!(worker_id, manager_id, %points, reason, "penalty applied");
        Ok(penalty)
    }

    /// Reverse a penalty at most once by appending the offsetting entry.
    pub fn revert_penalty(&self, manager_id: &str, penalty_id: &str) -> EngineResult<Penalty> {
        self.ensure_manager(manager_id)?;
        let penalty = self
            .penalties
            .find_by_id(penalty_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Penalty".to_string(),
                id: penalty_id.to_string(),
            })?;
        if penalty.reverted {
            return Err(EngineError::PenaltyAlreadyReverted(penalty_id.to_string()));
        }
        self.penalties
            .mark_reverted(penalty_id, manager_id, Self::now())?;
        self.award(
            &penalty.worker_id,
            None,
            None,
            penalty.points,
            ScoreSource::Penalty,
            &format!("penalty reverted: {}", penalty.reason),
        )?;
        info!(penalty_id, manager_id, "penalty reverted");
        self.penalties
            .find_by_id(penalty_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Penalty".to_string(),
                id: penalty_id.to_string(),
            })
    }

    // ==========================================
    // Fixed monthly rules
    // ==========================================
    /// Apply a fixed monthly award once per (rule, worker, month). Manual
    /// rules require a manager as the applier.
    pub fn apply_fixed_rule(
        &self,
        rule_id: &str,
        worker_id: &str,
        month_ref: NaiveDate,
        applied_by: Option<&str>,
        justification: &str,
    ) -> EngineResult<FixedRuleApplication> {
        let rule = self
            .fixed_rules
            .find_by_id(rule_id)?
            .filter(|r| r.active)
            .ok_or_else(|| EngineError::NotFound {
                entity: "FixedMonthlyRule".to_string(),
                id: rule_id.to_string(),
            })?;
        if rule.mode == ApplicationMode::Manual {
            let manager_id = applied_by.ok_or_else(|| {
                EngineError::Config("manual fixed rules require an applier".to_string())
            })?;
            self.ensure_manager(manager_id)?;
        }
        if self.fixed_rules.has_application(rule_id, worker_id, month_ref)? {
            return Err(EngineError::FixedRuleAlreadyApplied {
                rule_id: rule_id.to_string(),
                worker_id: worker_id.to_string(),
            });
        }

        let app = FixedRuleApplication {
            application_id: Uuid::new_v4().to_string(),
            rule_id: rule_id.to_string(),
            worker_id: worker_id.to_string(),
            month_ref,
            points: rule.amount,
            applied_at: Self::now(),
            applied_by: applied_by.map(String::from),
            justification: justification.to_string(),
        };
        self.fixed_rules.record_application(&app)?;
        self.award(
            worker_id,
            None,
            rule.stage_id.as_deref(),
            rule.amount,
            ScoreSource::Monthly,
            &format!("fixed rule: {}", rule.name),
        )?;
        info!(rule_id, worker_id, amount = %rule.amount, "fixed monthly rule applied");
        Ok(app)
    }

    fn ensure_manager(&self, worker_id: &str) -> EngineResult<()> {
        let worker = self.workers.require(worker_id)?;
        if !worker.role.is_manager() {
            return Err(EngineError::NotAuthorized(worker_id.to_string()));
        }
        Ok(())
    }
}
