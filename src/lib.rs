// ==========================================
// Pharmaflow
// ==========================================
// Production workflow and productivity scoring engine for a compounding
// pharmacy: orders move through an ordered stage pipeline, workers earn
// points for the stages they complete, and monthly bonuses are computed
// from the accumulated points.
//
// Layers:
// - domain:     entities and value types
// - repository: SQLite data access (rusqlite, shared connection)
// - engine:     workflow / scoring / shipping / quality / bonus rules
// - importer:   normalized order intake and synchronization
// - api:        read models for the outer shell
// - app:        state wiring
// ==========================================

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod importer;
pub mod logging;
pub mod repository;

pub const APP_NAME: &str = "pharmaflow";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_set() {
        assert!(!super::VERSION.is_empty());
    }
}
