// ==========================================
// Pharmaflow - quality-control form domain model
// ==========================================
// Dynamic Q&A: questions are configuration, answers are captured per
// submitted form.
// ==========================================

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::QcFieldKind;

// ==========================================
// QcQuestion
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcQuestion {
    pub question_id: String,
    pub prompt: String,
    pub field_kind: QcFieldKind,
    pub description: String,
    pub position: i32,
    pub required: bool,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

// ==========================================
// QcOption
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcOption {
    pub option_id: String,
    pub question_id: String,
    pub label: String,
    pub position: i32,
}

/// A question together with its selectable options, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcQuestionWithOptions {
    pub question: QcQuestion,
    pub options: Vec<QcOption>,
}

// ==========================================
// QcForm
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcForm {
    pub form_id: String,
    pub worker_id: String,
    pub item_name: String,
    pub item_code: String,
    pub points: Decimal,
    pub submitted_at: NaiveDateTime,
    /// Set when the form was submitted against an order held at a
    /// quality-control stage.
    pub order_id: Option<String>,
}

// ==========================================
// QcAnswer
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcAnswer {
    pub answer_id: String,
    pub form_id: String,
    pub question_id: String,
    pub answer_text: String,
    pub option_id: Option<String>,
}

// ==========================================
// QcConfig
// ==========================================
// Points awarded per submitted form (configuration, not per-question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcConfig {
    pub config_id: String,
    pub points_per_form: Decimal,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
