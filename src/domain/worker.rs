// ==========================================
// Pharmaflow - worker identity
// ==========================================
// Authentication and sessions live in the outer shell (non-goal); the engine
// only keeps the identity and role it needs for its own rules.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::WorkerRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub worker_id: String,
    pub username: String,
    pub full_name: String,
    pub role: WorkerRole,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl Worker {
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}
