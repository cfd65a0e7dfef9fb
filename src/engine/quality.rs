// ==========================================
// Pharmaflow - quality-control form engine
// ==========================================
// Dynamic Q&A submission. A form submitted against an order the worker
// holds at a quality-control stage also closes that stage and advances the
// order; standalone forms just earn the configured points.
// ==========================================

use crate::domain::audit::AuditLog;
use crate::domain::order::{StageHistory, WorkOrder};
use crate::domain::quality::{QcAnswer, QcForm};
use crate::domain::stage::Stage;
use crate::domain::types::{AuditAction, QueueStatus, ScoreSource};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::ScoringEngine;
use crate::engine::workflow::advance_order;
use crate::repository::{
    AuditLogRepository, QcConfigRepository, QcFormRepository, QcQuestionRepository,
    StageHistoryRepository, StageRepository, WorkOrderRepository,
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

/// One answer in a submission.
#[derive(Debug, Clone)]
pub struct AnswerInput {
    pub question_id: String,
    pub answer_text: String,
    pub option_id: Option<String>,
}

/// A form as submitted by a worker.
#[derive(Debug, Clone)]
pub struct FormSubmission {
    pub item_name: String,
    pub item_code: String,
    /// Order held by the worker at a quality-control stage, if the form
    /// concludes that stage.
    pub order_id: Option<String>,
    pub answers: Vec<AnswerInput>,
}

pub struct QualityEngine {
    questions: QcQuestionRepository,
    forms: QcFormRepository,
    configs: QcConfigRepository,
    orders: WorkOrderRepository,
    stages: StageRepository,
    histories: StageHistoryRepository,
    scoring: ScoringEngine,
    audit: AuditLogRepository,
}

impl QualityEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        questions: QcQuestionRepository,
        forms: QcFormRepository,
        configs: QcConfigRepository,
        orders: WorkOrderRepository,
        stages: StageRepository,
        histories: StageHistoryRepository,
        scoring: ScoringEngine,
        audit: AuditLogRepository,
    ) -> Self {
        Self {
            questions,
            forms,
            configs,
            orders,
            stages,
            histories,
            scoring,
            audit,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    /// Validate answers against the active question set, persist the form
    /// and award the per-form points.
    pub fn submit_form(
        &self,
        worker_id: &str,
        submission: FormSubmission,
    ) -> EngineResult<QcForm> {
        // Every required active question needs a text or option answer.
        for entry in self.questions.list_active()? {
            if !entry.question.required {
                continue;
            }
            let answered = submission.answers.iter().any(|a| {
                a.question_id == entry.question.question_id
                    && (!a.answer_text.trim().is_empty() || a.option_id.is_some())
            });
            if !answered {
                return Err(EngineError::RequiredAnswerMissing(
                    entry.question.prompt.clone(),
                ));
            }
        }

        let points = self
            .configs
            .active()?
            .map(|c| c.points_per_form)
            .unwrap_or(Decimal::ZERO);

        // A targeted order is validated up front; a refused submission must
        // persist nothing and award nothing.
        let held = match submission.order_id.as_deref() {
            Some(order_id) => Some(self.locate_quality_stage(worker_id, order_id)?),
            None => None,
        };

        let now = Self::now();
        let form = QcForm {
            form_id: Uuid::new_v4().to_string(),
            worker_id: worker_id.to_string(),
            item_name: submission.item_name.clone(),
            item_code: submission.item_code.clone(),
            points,
            submitted_at: now,
            order_id: submission.order_id.clone(),
        };
        self.forms.insert(&form)?;
        for answer in &submission.answers {
            self.forms.insert_answer(&QcAnswer {
                answer_id: Uuid::new_v4().to_string(),
                form_id: form.form_id.clone(),
                question_id: answer.question_id.clone(),
                answer_text: answer.answer_text.clone(),
                option_id: answer.option_id.clone(),
            })?;
        }

        if points > Decimal::ZERO {
            self.scoring.award(
                worker_id,
                submission.order_id.as_deref(),
                None,
                points,
                ScoreSource::QualityControl,
                &format!("quality form for {}", submission.item_name),
            )?;
        }

        // Conclude the held quality-control stage, if the form targets one.
        if let Some((mut order, stage, history)) = held {
            self.histories.close(
                &history.history_id,
                now,
                None,
                order.quantity,
                points,
                "quality form",
            )?;
            advance_order(&self.stages, &self.orders, &mut order, &stage, now)?;
        }

        info!(worker_id, item = %submission.item_name, %points, "quality form submitted");
        self.audit.append(&AuditLog {
            log_id: Uuid::new_v4().to_string(),
            worker_id: Some(worker_id.to_string()),
            action: AuditAction::SubmitQcForm,
            description: format!("quality form for {}", submission.item_name),
            recorded_at: now,
            details_json: None,
        })?;
        Ok(form)
    }

    /// All the checks for concluding a quality-control stage through a form,
    /// with nothing written yet: the order must be held by the worker, active,
    /// at a quality-control stage, with an open history.
    fn locate_quality_stage(
        &self,
        worker_id: &str,
        order_id: &str,
    ) -> EngineResult<(WorkOrder, Stage, StageHistory)> {
        let order = self
            .orders
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "WorkOrder".to_string(),
                id: order_id.to_string(),
            })?;
        if !order.is_in_flow() {
            return Err(EngineError::OrderNotInFlow(order_id.to_string()));
        }
        if order.assigned_worker_id.as_deref() != Some(worker_id) {
            return Err(EngineError::NotAssignee {
                worker_id: worker_id.to_string(),
                order_id: order_id.to_string(),
            });
        }
        let stage_id = order
            .current_stage_id
            .clone()
            .ok_or_else(|| EngineError::OrderNotInFlow(order_id.to_string()))?;
        let stage = self
            .stages
            .find_by_id(&stage_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Stage".to_string(),
                id: stage_id.clone(),
            })?;
        if !stage.is_quality_control() {
            return Err(EngineError::Config(format!(
                "order {order_id} is not held at a quality-control stage"
            )));
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
        Ok((order, stage, history))
    }
}
