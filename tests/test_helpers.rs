// ==========================================
// Shared fixtures for the integration suites
// ==========================================
// Each test gets its own temp-dir database seeded with the standard
// five-stage pipeline, two accounts and basic scoring rules.
// ==========================================
#![allow(dead_code)]

use chrono::NaiveDateTime;
use pharmaflow::app::AppState;
use pharmaflow::domain::order::{StageHistory, WorkOrder};
use pharmaflow::domain::quality::{QcConfig, QcQuestion};
use pharmaflow::domain::scoring::BonusTier;
use pharmaflow::domain::shipping::ShippingConfig;
use pharmaflow::domain::stage::{ActivityScoreRule, Checklist, ProductionRule, Stage};
use pharmaflow::domain::types::{
    ActivityKind, OrderStatus, QcFieldKind, QueueStatus, SedexCountMode, ShippingMethod,
    StageGroup, WorkerRole,
};
use pharmaflow::domain::worker::Worker;
use pharmaflow::repository::{
    ActivityScoreRuleRepository, BonusTierRepository, ChecklistRepository,
    ProductionRuleRepository, QcConfigRepository, QcQuestionRepository,
    ShippingConfigRepository, StageHistoryRepository, StageRepository, WorkOrderRepository,
    WorkerRepository,
};
use rust_decimal_macros::dec;
use tempfile::TempDir;

pub const TRIAGE: &str = "stage-triage";
pub const PRODUCTION: &str = "stage-production";
pub const LABELING: &str = "stage-labeling";
pub const QC: &str = "stage-qc";
pub const SHIPPING: &str = "stage-shipping";

pub const ANA: &str = "worker-ana";
pub const BRUNO: &str = "worker-bruno";
pub const CARLA_MANAGER: &str = "worker-carla";

pub struct TestContext {
    pub state: AppState,
    _dir: TempDir,
}

pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Fresh database with the standard pipeline seeded.
pub fn setup() -> TestContext {
    pharmaflow::logging::init_test();
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("pharmaflow-test.db");
    let state = AppState::new(&db_path.to_string_lossy()).expect("app state");
    seed_pipeline(&state);
    TestContext { state, _dir: dir }
}

fn seed_pipeline(state: &AppState) {
    let conn = state.connection();
    let ts = now();

    let workers = WorkerRepository::from_connection(conn.clone()).unwrap();
    for (id, username, role) in [
        (ANA, "ana", WorkerRole::Worker),
        (BRUNO, "bruno", WorkerRole::Worker),
        (CARLA_MANAGER, "carla", WorkerRole::Manager),
    ] {
        workers
            .insert(&Worker {
                worker_id: id.to_string(),
                username: username.to_string(),
                full_name: String::new(),
                role,
                active: true,
                created_at: ts,
            })
            .unwrap();
    }

    let stages = StageRepository::from_connection(conn.clone()).unwrap();
    for (id, name, sequence, group, has_quantity_scoring, has_checklists) in [
        (TRIAGE, "Triagem", 10, StageGroup::Triage, true, false),
        (PRODUCTION, "Produção", 20, StageGroup::Production, false, false),
        (LABELING, "Rotulagem", 30, StageGroup::Labeling, false, true),
        (QC, "Controle de Qualidade", 40, StageGroup::QualityControl, false, false),
        (SHIPPING, "Expedição", 50, StageGroup::Shipping, false, true),
    ] {
        stages
            .insert(&Stage {
                stage_id: id.to_string(),
                name: name.to_string(),
                sequence,
                group,
                active: true,
                generates_points: true,
                has_checklists,
                has_quantity_scoring,
                fixed_points: dec!(0),
                created_at: ts,
                updated_at: ts,
            })
            .unwrap();
    }

    // Triage: quantity-band activity table.
    let activity_rules = ActivityScoreRuleRepository::from_connection(conn.clone()).unwrap();
    for (i, (band_min, band_max, points)) in
        [(0, 60, dec!(1)), (61, 1000, dec!(2))].into_iter().enumerate()
    {
        activity_rules
            .insert(&ActivityScoreRule {
                rule_id: format!("ar-{i}"),
                stage_id: TRIAGE.to_string(),
                product_type_id: None,
                activity: ActivityKind::Weighing,
                band_min,
                band_max,
                points,
                active: true,
                created_at: ts,
                updated_at: ts,
            })
            .unwrap();
    }

    // Production: per-unit scoring.
    let production_rules = ProductionRuleRepository::from_connection(conn.clone()).unwrap();
    production_rules
        .insert(&ProductionRule {
            rule_id: "pr-0".to_string(),
            stage_id: PRODUCTION.to_string(),
            band_min: 0,
            band_max: 10_000,
            points_per_unit: dec!(0.02),
            fixed_points: dec!(1),
            active: true,
            version: "v1".to_string(),
            created_at: ts,
            updated_at: ts,
        })
        .unwrap();

    // Labeling checklist items; shipping method checklist items.
    let checklists = ChecklistRepository::from_connection(conn.clone()).unwrap();
    for (id, stage_id, name, points, position) in [
        ("cl-label", LABELING, "Rótulo conferido", dec!(0.5), 0),
        ("cl-count", LABELING, "Quantidade conferida", dec!(0.5), 1),
        ("cl-motoboy", SHIPPING, "MOTOBOY ROUTE", dec!(0), 0),
        ("cl-sedex", SHIPPING, "SEDEX", dec!(0), 1),
    ] {
        checklists
            .insert(&Checklist {
                checklist_id: id.to_string(),
                stage_id: stage_id.to_string(),
                name: name.to_string(),
                description: String::new(),
                points,
                required: false,
                active: true,
                position,
                created_at: ts,
            })
            .unwrap();
    }

    let shipping = ShippingConfigRepository::from_connection(conn.clone()).unwrap();
    shipping
        .upsert(&ShippingConfig {
            config_id: "ship-motoboy".to_string(),
            method: ShippingMethod::Motoboy,
            points_per_route: dec!(1),
            daily_fixed_points: dec!(15),
            sedex_count_mode: SedexCountMode::PerDay,
            sedex_points: dec!(0),
            active: true,
            created_at: ts,
            updated_at: ts,
        })
        .unwrap();
    shipping
        .upsert(&ShippingConfig {
            config_id: "ship-sedex".to_string(),
            method: ShippingMethod::Sedex,
            points_per_route: dec!(0),
            daily_fixed_points: dec!(0),
            sedex_count_mode: SedexCountMode::PerDispatch,
            sedex_points: dec!(1),
            active: true,
            created_at: ts,
            updated_at: ts,
        })
        .unwrap();

    let tiers = BonusTierRepository::from_connection(conn.clone()).unwrap();
    for (id, band_min, band_max, amount) in [
        ("tier-0", dec!(0), Some(dec!(400)), dec!(0)),
        ("tier-1", dec!(401), Some(dec!(600)), dec!(150)),
        ("tier-2", dec!(601), None, dec!(350)),
    ] {
        tiers
            .insert(&BonusTier {
                tier_id: id.to_string(),
                band_min,
                band_max,
                amount,
                active: true,
                created_at: ts,
                updated_at: ts,
            })
            .unwrap();
    }

    let questions = QcQuestionRepository::from_connection(conn.clone()).unwrap();
    questions
        .insert(&QcQuestion {
            question_id: "qq-visual".to_string(),
            prompt: "Aspecto visual conforme?".to_string(),
            field_kind: QcFieldKind::Checkbox,
            description: String::new(),
            position: 0,
            required: true,
            active: true,
            created_at: ts,
        })
        .unwrap();
    let qc_configs = QcConfigRepository::from_connection(conn.clone()).unwrap();
    qc_configs
        .insert(&QcConfig {
            config_id: "qc-config".to_string(),
            points_per_form: dec!(2),
            active: true,
            created_at: ts,
            updated_at: ts,
        })
        .unwrap();
}

/// Insert a fresh unassigned order at a stage.
pub fn insert_order(state: &AppState, order_id: &str, stage_id: &str, quantity: i64) {
    let orders = WorkOrderRepository::from_connection(state.connection()).unwrap();
    let ts = now();
    orders
        .insert(&WorkOrder {
            order_id: order_id.to_string(),
            order_code: format!("PED-{order_id}"),
            name: format!("Pedido {order_id}"),
            quantity,
            product_type_id: None,
            source_id: None,
            source_order_id: None,
            source_web_id: None,
            description: String::new(),
            unit_price: None,
            total_price: None,
            source_updated_date: None,
            source_updated_time: None,
            identified_kind: None,
            current_stage_id: Some(stage_id.to_string()),
            status: OrderStatus::InFlow,
            assigned_worker_id: None,
            queue_status: QueueStatus::Pending,
            shipping_method: None,
            general_info: String::new(),
            created_at: ts,
            updated_at: ts,
            completed_at: None,
        })
        .unwrap();
}

/// Fabricate a closed history so claims further down the pipeline pass the
/// progression gate.
pub fn record_closed_history(state: &AppState, order_id: &str, stage_id: &str, worker_id: &str) {
    let histories = StageHistoryRepository::from_connection(state.connection()).unwrap();
    let ts = now();
    histories
        .open(&StageHistory {
            history_id: format!("hist-{order_id}-{stage_id}"),
            order_id: order_id.to_string(),
            stage_id: stage_id.to_string(),
            worker_id: worker_id.to_string(),
            started_at: ts,
            finished_at: Some(ts),
            scoring_config_id: None,
            produced_qty: 0,
            points: dec!(0),
            notes: String::new(),
        })
        .unwrap();
}

pub fn load_order(state: &AppState, order_id: &str) -> WorkOrder {
    WorkOrderRepository::from_connection(state.connection())
        .unwrap()
        .find_by_id(order_id)
        .unwrap()
        .expect("order exists")
}
