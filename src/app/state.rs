// ==========================================
// Pharmaflow - application state wiring
// ==========================================
// One shared SQLite connection; every repository and engine is constructed
// over it. Repositories are thin handles, so each engine gets its own set.
// ==========================================

use crate::api::WorkboardApi;
use crate::config::ConfigManager;
use crate::engine::{
    BonusEngine, QualityEngine, ScoringEngine, ShippingEngine, WorkflowEngine,
};
use crate::importer::OrderSyncService;
use crate::repository::{
    ActivityScoreRuleRepository, AuditLogRepository, BonusTierRepository, ChecklistRepository,
    ChecklistRunRepository, FixedRuleRepository, MonthlyBonusRepository, PenaltyRepository,
    ProductTypeRepository, ProductionRuleRepository, RepositoryResult, ScoreLedgerRepository,
    ScoringConfigRepository, ShippingConfigRepository, StageHistoryRepository, StageRepository,
    WorkOrderRepository, WorkerRepository,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    pub workflow: WorkflowEngine,
    pub scoring: ScoringEngine,
    pub bonus: BonusEngine,
    pub shipping: ShippingEngine,
    pub quality: QualityEngine,
    pub sync: OrderSyncService,
    pub workboard: WorkboardApi,
    pub config: ConfigManager,
    pub workers: WorkerRepository,
}

impl AppState {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| crate::repository::RepositoryError::LockError(e.to_string()))?;
            match crate::db::read_schema_version(&guard)? {
                Some(v) if v != crate::db::CURRENT_SCHEMA_VERSION => {
                    warn!(
                        found = v,
                        expected = crate::db::CURRENT_SCHEMA_VERSION,
                        "database schema version differs from the one this build expects"
                    );
                }
                _ => {}
            }
        }

        // ensure_tables runs in dependency order: referenced tables first.
        let workers = WorkerRepository::from_connection(conn.clone())?;
        StageRepository::from_connection(conn.clone())?;
        ProductTypeRepository::from_connection(conn.clone())?;
        ChecklistRepository::from_connection(conn.clone())?;
        WorkOrderRepository::from_connection(conn.clone())?;
        StageHistoryRepository::from_connection(conn.clone())?;

        let scoring_for = |conn: &Arc<Mutex<Connection>>| -> RepositoryResult<ScoringEngine> {
            Ok(ScoringEngine::new(
                ActivityScoreRuleRepository::from_connection(conn.clone())?,
                ProductionRuleRepository::from_connection(conn.clone())?,
                ScoringConfigRepository::from_connection(conn.clone())?,
                ChecklistRunRepository::from_connection(conn.clone())?,
                ScoreLedgerRepository::from_connection(conn.clone())?,
                PenaltyRepository::from_connection(conn.clone())?,
                FixedRuleRepository::from_connection(conn.clone())?,
                WorkerRepository::from_connection(conn.clone())?,
            ))
        };

        let workflow = WorkflowEngine::new(
            WorkOrderRepository::from_connection(conn.clone())?,
            StageRepository::from_connection(conn.clone())?,
            ChecklistRepository::from_connection(conn.clone())?,
            StageHistoryRepository::from_connection(conn.clone())?,
            ChecklistRunRepository::from_connection(conn.clone())?,
            scoring_for(&conn)?,
            AuditLogRepository::from_connection(conn.clone())?,
            ConfigManager::from_connection(conn.clone())?,
        );

        let bonus = BonusEngine::new(
            ScoreLedgerRepository::from_connection(conn.clone())?,
            BonusTierRepository::from_connection(conn.clone())?,
            MonthlyBonusRepository::from_connection(conn.clone())?,
            WorkerRepository::from_connection(conn.clone())?,
            AuditLogRepository::from_connection(conn.clone())?,
        );

        let shipping = ShippingEngine::new(
            WorkOrderRepository::from_connection(conn.clone())?,
            StageRepository::from_connection(conn.clone())?,
            ChecklistRepository::from_connection(conn.clone())?,
            StageHistoryRepository::from_connection(conn.clone())?,
            ChecklistRunRepository::from_connection(conn.clone())?,
            ShippingConfigRepository::from_connection(conn.clone())?,
            scoring_for(&conn)?,
            AuditLogRepository::from_connection(conn.clone())?,
        );

        let quality = QualityEngine::new(
            crate::repository::QcQuestionRepository::from_connection(conn.clone())?,
            crate::repository::QcFormRepository::from_connection(conn.clone())?,
            crate::repository::QcConfigRepository::from_connection(conn.clone())?,
            WorkOrderRepository::from_connection(conn.clone())?,
            StageRepository::from_connection(conn.clone())?,
            StageHistoryRepository::from_connection(conn.clone())?,
            scoring_for(&conn)?,
            AuditLogRepository::from_connection(conn.clone())?,
        );

        let sync = OrderSyncService::new(
            WorkOrderRepository::from_connection(conn.clone())?,
            ProductTypeRepository::from_connection(conn.clone())?,
            StageRepository::from_connection(conn.clone())?,
            AuditLogRepository::from_connection(conn.clone())?,
        );

        let workboard = WorkboardApi::new(
            WorkOrderRepository::from_connection(conn.clone())?,
            StageRepository::from_connection(conn.clone())?,
            ScoreLedgerRepository::from_connection(conn.clone())?,
            BonusTierRepository::from_connection(conn.clone())?,
            PenaltyRepository::from_connection(conn.clone())?,
            MonthlyBonusRepository::from_connection(conn.clone())?,
        );

        let scoring = scoring_for(&conn)?;
        let config = ConfigManager::from_connection(conn.clone())?;

        Ok(Self {
            conn,
            workflow,
            scoring,
            bonus,
            shipping,
            quality,
            sync,
            workboard,
            config,
            workers,
        })
    }

    /// Shared connection handle for callers that build extra repositories
    /// (seeding, ad-hoc queries).
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

/// Default on-disk location of the database.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pharmaflow")
        .join("pharmaflow.db")
}
