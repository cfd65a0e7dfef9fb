// ==========================================
// Pharmaflow - order intake
// ==========================================

pub mod classify;
pub mod order_source;
pub mod sync;

pub use order_source::{CsvOrderSource, OrderRecord, OrderSource};
pub use sync::{OrderSyncService, SyncSummary};
