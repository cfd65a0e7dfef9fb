// ==========================================
// Pharmaflow - scoring ledger domain model
// ==========================================
// The ledger is append-only: corrections and penalty reversals are written
// as new offsetting entries, never as mutations.
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::{ApplicationMode, PayoutStatus, ScoreSource};

// ==========================================
// ScoreEntry
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub entry_id: String,
    pub worker_id: String,
    pub order_id: Option<String>,
    pub stage_id: Option<String>,
    pub points: Decimal,
    pub source: ScoreSource,
    pub recorded_at: NaiveDateTime,
    /// First day of the month this entry counts toward.
    pub month_ref: NaiveDate,
    pub note: String,
}

// ==========================================
// Penalty
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Penalty {
    pub penalty_id: String,
    pub worker_id: String,
    pub reason: String,
    pub points: Decimal,
    pub justification: String,
    pub applied_by: String,
    pub applied_at: NaiveDateTime,
    pub reverted: bool,
    pub reverted_at: Option<NaiveDateTime>,
    pub reverted_by: Option<String>,
}

// ==========================================
// FixedMonthlyRule
// ==========================================
// Flat monthly awards, e.g. 200 points for stock organization or
// 15 points per motoboy route day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedMonthlyRule {
    pub rule_id: String,
    pub name: String,
    pub amount: Decimal,
    pub active: bool,
    pub mode: ApplicationMode,
    /// Free-text condition evaluated by managers for manual application.
    pub condition: String,
    pub stage_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// FixedRuleApplication
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedRuleApplication {
    pub application_id: String,
    pub rule_id: String,
    pub worker_id: String,
    pub month_ref: NaiveDate,
    pub points: Decimal,
    pub applied_at: NaiveDateTime,
    pub applied_by: Option<String>,
    pub justification: String,
}

// ==========================================
// BonusTier
// ==========================================
// Productivity bands, e.g. up to 400 pts -> R$ 0; 401-600 -> R$ 150;
// above 800 -> R$ 350 (band_max = None is the open-ended top band).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusTier {
    pub tier_id: String,
    pub band_min: Decimal,
    pub band_max: Option<Decimal>,
    pub amount: Decimal,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BonusTier {
    pub fn contains(&self, points: Decimal) -> bool {
        if points < self.band_min {
            return false;
        }
        match self.band_max {
            Some(max) => points <= max,
            None => true,
        }
    }
}

// ==========================================
// MonthlyBonus
// ==========================================
// One record per (worker, month).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyBonus {
    pub bonus_id: String,
    pub worker_id: String,
    pub month_ref: NaiveDate,
    pub total_points: Decimal,
    pub amount: Decimal,
    pub payout_status: PayoutStatus,
    pub computed_at: NaiveDateTime,
    pub paid_at: Option<NaiveDateTime>,
}
