// ==========================================
// Pharmaflow - pipeline stage domain model
// ==========================================
// Stages form an ordered pipeline by `sequence`; only active stages
// participate in progression.
// ==========================================

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::StageGroup;

// ==========================================
// Stage
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub stage_id: String,
    pub name: String,
    pub sequence: i32,
    pub group: StageGroup,
    pub active: bool,
    /// Whether completing this stage earns points at all.
    pub generates_points: bool,
    /// Whether the stage carries checklist items.
    pub has_checklists: bool,
    /// Whether the quantity-band activity table applies here.
    pub has_quantity_scoring: bool,
    /// Flat points always added on completion, on top of any computed points.
    pub fixed_points: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Stage {
    pub fn is_shipping(&self) -> bool {
        self.group == StageGroup::Shipping
    }

    pub fn is_quality_control(&self) -> bool {
        self.group == StageGroup::QualityControl
    }
}

// ==========================================
// Checklist
// ==========================================
// A check item of a stage, worth `points` when marked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub checklist_id: String,
    pub stage_id: String,
    pub name: String,
    pub description: String,
    pub points: Decimal,
    pub required: bool,
    pub active: bool,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

// ==========================================
// ScoringConfig
// ==========================================
// Versioned per-stage fallback scoring: fixed points plus per-check points,
// clamped to [min_points, max_points].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub config_id: String,
    pub stage_id: String,
    pub fixed_points: Decimal,
    pub per_check_points: Decimal,
    pub min_points: Decimal,
    pub max_points: Option<Decimal>,
    pub active: bool,
    pub version: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// ActivityScoreRule
// ==========================================
// Range->points lookup keyed by stage + activity + product type + qty band.
// Example: CAPSULE / ENCAPSULATION, 0-60 units -> 1 point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityScoreRule {
    pub rule_id: String,
    pub stage_id: String,
    pub product_type_id: Option<String>,
    pub activity: crate::domain::types::ActivityKind,
    pub band_min: i64,
    pub band_max: i64,
    pub points: Decimal,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ActivityScoreRule {
    pub fn contains(&self, quantity: i64) -> bool {
        self.band_min <= quantity && quantity <= self.band_max
    }
}

// ==========================================
// ProductionRule
// ==========================================
// Versioned per-unit scoring for production stages:
// points = quantity * points_per_unit + fixed_points for the matching band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionRule {
    pub rule_id: String,
    pub stage_id: String,
    pub band_min: i64,
    pub band_max: i64,
    pub points_per_unit: Decimal,
    pub fixed_points: Decimal,
    pub active: bool,
    pub version: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProductionRule {
    pub fn contains(&self, quantity: i64) -> bool {
        self.band_min <= quantity && quantity <= self.band_max
    }
}
