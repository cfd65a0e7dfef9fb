// ==========================================
// Pharmaflow - read-only query facades
// ==========================================

pub mod workboard_api;

pub use workboard_api::{AvailableOrder, MonthProfile, WorkboardApi};
