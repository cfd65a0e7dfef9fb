// ==========================================
// Pharmaflow - entry point
// ==========================================
// Opens (or creates) the database, wires the application state and prints
// a short situation summary. The outer shell (UI/HTTP) is a separate
// deliverable and drives the same AppState.
// ==========================================

use pharmaflow::app::{default_db_path, AppState};
use pharmaflow::engine::scoring_core;
use pharmaflow::logging;
use tracing::{error, info};

fn main() {
    logging::init();

    let db_path = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!(path = %parent.display(), error = %e, "cannot create data directory");
            std::process::exit(1);
        }
    }
    info!(
        version = pharmaflow::VERSION,
        db = %db_path.display(),
        "starting"
    );

    let state = match AppState::new(&db_path.to_string_lossy()) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to open application state");
            std::process::exit(1);
        }
    };

    match summarize(&state) {
        Ok(()) => {}
        Err(e) => {
            error!(error = %e, "failed to read workboard");
            std::process::exit(1);
        }
    }
}

fn summarize(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let available = state.workboard.available_orders(None, None)?;
    info!(count = available.len(), "orders available for claim");

    let month_ref = scoring_core::month_ref_for(chrono::Local::now().date_naive());
    for worker in state.workers.list_active()? {
        let profile = state.workboard.month_profile(&worker.worker_id, month_ref)?;
        info!(
            worker = %worker.display_name(),
            points = %profile.total_points,
            bonus = ?profile.projected_bonus,
            "month so far"
        );
    }
    Ok(())
}
