// ==========================================
// Pharmaflow - engine layer error type
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// Business rule failures surfaced by the engines.
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== Claim rules =====
    #[error("order {0} is already assigned")]
    AlreadyAssigned(String),

    #[error("previous stage {0} has no closed history for this order")]
    PreviousStageIncomplete(String),

    #[error("worker {worker_id} already holds {count} orders (limit {limit})")]
    ClaimLimitReached {
        worker_id: String,
        count: i64,
        limit: i64,
    },

    #[error("order {0} is not in the flow")]
    OrderNotInFlow(String),

    // ===== Completion rules =====
    #[error("worker {worker_id} is not assigned to order {order_id}")]
    NotAssignee { worker_id: String, order_id: String },

    #[error("order {0} is pending in the queue; activate it before completing")]
    PendingCannotComplete(String),

    #[error("no open stage history for order {order_id} at stage {stage_id}")]
    NoOpenHistory { order_id: String, stage_id: String },

    #[error("quality-control stages complete through form submission only")]
    QualityFormRequired,

    // ===== Queue rules =====
    #[error("queue status cannot be toggled at the shipping stage")]
    QueueToggleAtShipping,

    // ===== Shipping rules =====
    #[error("order {0} is not at the shipping stage")]
    NotAtShippingStage(String),

    #[error("no active shipping configuration for method {0}")]
    ShippingNotConfigured(String),

    #[error("checklist item '{0}' is not configured for the shipping stage")]
    ChecklistNotConfigured(String),

    #[error("route has no orders selected")]
    EmptyRoute,

    // ===== Quality rules =====
    #[error("required question {0} has no answer")]
    RequiredAnswerMissing(String),

    // ===== Scoring rules =====
    #[error("penalty {0} was already reverted")]
    PenaltyAlreadyReverted(String),

    #[error("fixed rule {rule_id} already applied to worker {worker_id} this month")]
    FixedRuleAlreadyApplied { rule_id: String, worker_id: String },

    #[error("worker {0} is not allowed to perform this action")]
    NotAuthorized(String),

    // ===== Lookups =====
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type EngineResult<T> = Result<T, EngineError>;
