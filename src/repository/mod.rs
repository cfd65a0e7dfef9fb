// ==========================================
// Pharmaflow - data repository layer
// ==========================================
// Responsibility: data access only, no business logic.
// Constraint: every query is parameterized.
// Decimals are stored as TEXT and parsed on read so points and currency
// never round.
// ==========================================

pub mod audit_repo;
pub mod error;
pub mod history_repo;
pub mod order_repo;
pub mod quality_repo;
pub mod rule_repo;
pub mod score_repo;
pub mod shipping_repo;
pub mod stage_repo;
pub mod worker_repo;

pub use audit_repo::AuditLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::{ChecklistRunRepository, StageHistoryRepository};
pub use order_repo::{OrderFilter, ProductTypeRepository, WorkOrderRepository};
pub use quality_repo::{QcConfigRepository, QcFormRepository, QcQuestionRepository};
pub use rule_repo::{
    ActivityScoreRuleRepository, BonusTierRepository, ProductionRuleRepository,
    ScoringConfigRepository,
};
pub use score_repo::{
    FixedRuleRepository, MonthlyBonusRepository, PenaltyRepository, ScoreLedgerRepository,
};
pub use shipping_repo::ShippingConfigRepository;
pub use stage_repo::{ChecklistRepository, StageRepository};
pub use worker_repo::WorkerRepository;

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a TEXT decimal column.
pub(crate) fn decimal_from_db(field: &str, raw: &str) -> RepositoryResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("invalid decimal '{raw}': {e}"),
    })
}

/// Parse an optional TEXT decimal column.
pub(crate) fn opt_decimal_from_db(
    field: &str,
    raw: Option<String>,
) -> RepositoryResult<Option<Decimal>> {
    match raw {
        Some(s) => Ok(Some(decimal_from_db(field, &s)?)),
        None => Ok(None),
    }
}

/// Map a stored enum string through its `parse`, failing loudly on unknowns.
pub(crate) fn enum_from_db<T>(
    field: &str,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> RepositoryResult<T> {
    parse(raw).ok_or_else(|| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("unknown value '{raw}'"),
    })
}
