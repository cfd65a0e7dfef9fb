// ==========================================
// Pharmaflow - application wiring
// ==========================================

pub mod state;

pub use state::{default_db_path, AppState};
