// ==========================================
// Pharmaflow - engine layer
// ==========================================
// Business rules over the repositories. scoring_core holds the pure math;
// the engines do the loading, guarding and writing.
// ==========================================

pub mod bonus;
pub mod error;
pub mod quality;
pub mod scoring;
pub mod scoring_core;
pub mod shipping;
pub mod workflow;

pub use bonus::BonusEngine;
pub use error::{EngineError, EngineResult};
pub use quality::{AnswerInput, FormSubmission, QualityEngine};
pub use scoring::ScoringEngine;
pub use shipping::{RouteOutcome, ShippingEngine};
pub use workflow::{CompletionOutcome, WorkflowEngine};
