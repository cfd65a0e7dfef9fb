// ==========================================
// Pharmaflow - shipping configuration domain model
// ==========================================

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::{SedexCountMode, ShippingMethod};

// ==========================================
// ShippingConfig
// ==========================================
// Manager-defined point rules for each dispatch method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingConfig {
    pub config_id: String,
    pub method: ShippingMethod,
    /// Points per finalized motoboy route (per order on the route).
    pub points_per_route: Decimal,
    /// Flat daily points for motoboy duty.
    pub daily_fixed_points: Decimal,
    /// How sedex dispatches count toward points.
    pub sedex_count_mode: SedexCountMode,
    pub sedex_points: Decimal,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
