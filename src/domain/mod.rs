// ==========================================
// Pharmaflow - domain layer
// ==========================================
// Entities and value types; no persistence, no business orchestration.
// ==========================================

pub mod audit;
pub mod order;
pub mod quality;
pub mod scoring;
pub mod shipping;
pub mod stage;
pub mod types;
pub mod worker;

pub use audit::AuditLog;
pub use order::{ChecklistRun, ProductType, StageHistory, WorkOrder};
pub use quality::{QcAnswer, QcConfig, QcForm, QcOption, QcQuestion, QcQuestionWithOptions};
pub use scoring::{
    BonusTier, FixedMonthlyRule, FixedRuleApplication, MonthlyBonus, Penalty, ScoreEntry,
};
pub use shipping::ShippingConfig;
pub use stage::{ActivityScoreRule, Checklist, ProductionRule, ScoringConfig, Stage};
pub use worker::Worker;
