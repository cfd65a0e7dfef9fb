// ==========================================
// Pharmaflow - configuration layer
// ==========================================

pub mod config_manager;

pub use config_manager::ConfigManager;

/// Claim limit outside the shipping stage.
pub const KEY_MAX_CONCURRENT_CLAIMS: &str = "max_concurrent_claims";
pub const DEFAULT_MAX_CONCURRENT_CLAIMS: i64 = 5;
