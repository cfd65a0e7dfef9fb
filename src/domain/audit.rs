// ==========================================
// Pharmaflow - audit trail domain model
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::AuditAction;

/// One audit record; `details_json` carries structured context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub log_id: String,
    pub worker_id: Option<String>,
    pub action: AuditAction,
    pub description: String,
    pub recorded_at: NaiveDateTime,
    pub details_json: Option<String>,
}
