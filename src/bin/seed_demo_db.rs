// ==========================================
// Pharmaflow - demo database seeder
// ==========================================
// Creates a database with the standard pipeline, scoring rules and a few
// demo accounts so the engine can be exercised end to end.
//
// Usage: seed_demo_db [path/to/pharmaflow.db]
// ==========================================

use chrono::NaiveDateTime;
use pharmaflow::app::{default_db_path, AppState};
use pharmaflow::domain::quality::{QcConfig, QcQuestion};
use pharmaflow::domain::scoring::{BonusTier, FixedMonthlyRule};
use pharmaflow::domain::shipping::ShippingConfig;
use pharmaflow::domain::stage::{ActivityScoreRule, Checklist, ProductionRule, Stage};
use pharmaflow::domain::types::{
    ActivityKind, ApplicationMode, LabKind, ProductKind, QcFieldKind, SedexCountMode,
    ShippingMethod, StageGroup, WorkerRole,
};
use pharmaflow::domain::order::ProductType;
use pharmaflow::domain::worker::Worker;
use pharmaflow::logging;
use pharmaflow::repository::{
    ActivityScoreRuleRepository, BonusTierRepository, ChecklistRepository, FixedRuleRepository,
    ProductTypeRepository, ProductionRuleRepository, QcConfigRepository, QcQuestionRepository,
    ShippingConfigRepository, StageRepository, WorkerRepository,
};
use rust_decimal_macros::dec;
use tracing::info;

fn main() -> anyhow::Result<()> {
    logging::init();

    let db_path = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    info!(db = %db_path.display(), "seeding demo database");

    let state = AppState::new(&db_path.to_string_lossy())?;
    let conn = state.connection();
    let now = chrono::Local::now().naive_local();

    seed_workers(&WorkerRepository::from_connection(conn.clone())?, now)?;
    seed_stages(&StageRepository::from_connection(conn.clone())?, now)?;
    seed_product_types(&ProductTypeRepository::from_connection(conn.clone())?, now)?;
    seed_rules(
        &ActivityScoreRuleRepository::from_connection(conn.clone())?,
        &ProductionRuleRepository::from_connection(conn.clone())?,
        now,
    )?;
    seed_checklists(&ChecklistRepository::from_connection(conn.clone())?, now)?;
    seed_shipping(&ShippingConfigRepository::from_connection(conn.clone())?, now)?;
    seed_bonus(&BonusTierRepository::from_connection(conn.clone())?, now)?;
    seed_quality(
        &QcQuestionRepository::from_connection(conn.clone())?,
        &QcConfigRepository::from_connection(conn.clone())?,
        now,
    )?;
    seed_fixed_rules(&FixedRuleRepository::from_connection(conn.clone())?, now)?;

    info!("demo database ready");
    Ok(())
}

fn seed_workers(repo: &WorkerRepository, now: NaiveDateTime) -> anyhow::Result<()> {
    let workers = [
        ("worker-ana", "ana", "Ana Souza", WorkerRole::Worker),
        ("worker-bruno", "bruno", "Bruno Lima", WorkerRole::Worker),
        ("worker-carla", "carla", "Carla Mendes", WorkerRole::Manager),
    ];
    for (id, username, full_name, role) in workers {
        repo.insert(&Worker {
            worker_id: id.to_string(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            role,
            active: true,
            created_at: now,
        })?;
    }
    Ok(())
}

fn seed_stages(repo: &StageRepository, now: NaiveDateTime) -> anyhow::Result<()> {
    let stages = [
        ("stage-triage", "Triagem", 10, StageGroup::Triage, true, false),
        ("stage-production", "Produção", 20, StageGroup::Production, false, false),
        ("stage-labeling", "Rotulagem e Conferência", 30, StageGroup::Labeling, true, true),
        ("stage-qc", "Controle de Qualidade", 40, StageGroup::QualityControl, false, false),
        ("stage-shipping", "Expedição", 50, StageGroup::Shipping, false, true),
    ];
    for (id, name, sequence, group, has_quantity_scoring, has_checklists) in stages {
        repo.insert(&Stage {
            stage_id: id.to_string(),
            name: name.to_string(),
            sequence,
            group,
            active: true,
            generates_points: true,
            has_checklists,
            has_quantity_scoring,
            fixed_points: dec!(0),
            created_at: now,
            updated_at: now,
        })?;
    }
    Ok(())
}

fn seed_product_types(repo: &ProductTypeRepository, now: NaiveDateTime) -> anyhow::Result<()> {
    let types = [
        ("pt-capsule", ProductKind::Capsule, "Cápsula", Some(LabKind::CapsuleSachet)),
        ("pt-sachet", ProductKind::Sachet, "Sachê", Some(LabKind::CapsuleSachet)),
        ("pt-pediatric", ProductKind::PediatricLiquid, "Líquido Pediátrico", Some(LabKind::Pediatric)),
        ("pt-cream", ProductKind::Cream, "Creme", Some(LabKind::External)),
        ("pt-shampoo", ProductKind::Shampoo, "Shampoo", Some(LabKind::External)),
    ];
    for (id, kind, name, lab) in types {
        repo.insert(&ProductType {
            product_type_id: id.to_string(),
            kind,
            name: name.to_string(),
            lab,
            active: true,
            created_at: now,
        })?;
    }
    Ok(())
}

fn seed_rules(
    activity: &ActivityScoreRuleRepository,
    production: &ProductionRuleRepository,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    // Triage weighing bands for capsules.
    let bands = [(0, 60, dec!(1)), (61, 120, dec!(2)), (121, 360, dec!(3))];
    for (i, (band_min, band_max, points)) in bands.into_iter().enumerate() {
        activity.insert(&ActivityScoreRule {
            rule_id: format!("ar-weighing-{i}"),
            stage_id: "stage-triage".to_string(),
            product_type_id: Some("pt-capsule".to_string()),
            activity: ActivityKind::Weighing,
            band_min,
            band_max,
            points,
            active: true,
            created_at: now,
            updated_at: now,
        })?;
    }
    // Labeling conference, any product.
    activity.insert(&ActivityScoreRule {
        rule_id: "ar-conference-0".to_string(),
        stage_id: "stage-labeling".to_string(),
        product_type_id: None,
        activity: ActivityKind::Labeling,
        band_min: 0,
        band_max: 1000,
        points: dec!(1),
        active: true,
        created_at: now,
        updated_at: now,
    })?;
    // Production per-unit scoring.
    production.insert(&ProductionRule {
        rule_id: "pr-production-0".to_string(),
        stage_id: "stage-production".to_string(),
        band_min: 0,
        band_max: 10_000,
        points_per_unit: dec!(0.02),
        fixed_points: dec!(1),
        active: true,
        version: "v1".to_string(),
        created_at: now,
        updated_at: now,
    })?;
    Ok(())
}

fn seed_checklists(repo: &ChecklistRepository, now: NaiveDateTime) -> anyhow::Result<()> {
    let items = [
        ("cl-label", "stage-labeling", "Rótulo conferido", dec!(0.5), 0),
        ("cl-count", "stage-labeling", "Quantidade conferida", dec!(0.5), 1),
        ("cl-motoboy", "stage-shipping", "MOTOBOY ROUTE", dec!(0), 0),
        ("cl-sedex", "stage-shipping", "SEDEX", dec!(0), 1),
    ];
    for (id, stage_id, name, points, position) in items {
        repo.insert(&Checklist {
            checklist_id: id.to_string(),
            stage_id: stage_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            points,
            required: false,
            active: true,
            position,
            created_at: now,
        })?;
    }
    Ok(())
}

fn seed_shipping(repo: &ShippingConfigRepository, now: NaiveDateTime) -> anyhow::Result<()> {
    repo.upsert(&ShippingConfig {
        config_id: "ship-motoboy".to_string(),
        method: ShippingMethod::Motoboy,
        points_per_route: dec!(1),
        daily_fixed_points: dec!(15),
        sedex_count_mode: SedexCountMode::PerDay,
        sedex_points: dec!(0),
        active: true,
        created_at: now,
        updated_at: now,
    })?;
    repo.upsert(&ShippingConfig {
        config_id: "ship-sedex".to_string(),
        method: ShippingMethod::Sedex,
        points_per_route: dec!(0),
        daily_fixed_points: dec!(0),
        sedex_count_mode: SedexCountMode::PerDispatch,
        sedex_points: dec!(1),
        active: true,
        created_at: now,
        updated_at: now,
    })?;
    Ok(())
}

fn seed_bonus(repo: &BonusTierRepository, now: NaiveDateTime) -> anyhow::Result<()> {
    let tiers = [
        ("tier-0", dec!(0), Some(dec!(400)), dec!(0)),
        ("tier-1", dec!(401), Some(dec!(600)), dec!(150)),
        ("tier-2", dec!(601), Some(dec!(800)), dec!(250)),
        ("tier-3", dec!(801), None, dec!(350)),
    ];
    for (id, band_min, band_max, amount) in tiers {
        repo.insert(&BonusTier {
            tier_id: id.to_string(),
            band_min,
            band_max,
            amount,
            active: true,
            created_at: now,
            updated_at: now,
        })?;
    }
    Ok(())
}

fn seed_quality(
    questions: &QcQuestionRepository,
    configs: &QcConfigRepository,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let question_set = [
        ("qq-visual", "Aspecto visual conforme?", QcFieldKind::Checkbox, true),
        ("qq-weight", "Peso médio (g)", QcFieldKind::Number, true),
        ("qq-notes", "Observações", QcFieldKind::TextArea, false),
    ];
    for (i, (id, prompt, field_kind, required)) in question_set.into_iter().enumerate() {
        questions.insert(&QcQuestion {
            question_id: id.to_string(),
            prompt: prompt.to_string(),
            field_kind,
            description: String::new(),
            position: i as i32,
            required,
            active: true,
            created_at: now,
        })?;
    }
    configs.insert(&QcConfig {
        config_id: "qc-config".to_string(),
        points_per_form: dec!(2),
        active: true,
        created_at: now,
        updated_at: now,
    })?;
    Ok(())
}

fn seed_fixed_rules(repo: &FixedRuleRepository, now: NaiveDateTime) -> anyhow::Result<()> {
    repo.insert(&FixedMonthlyRule {
        rule_id: "fr-stock".to_string(),
        name: "Organização de estoque".to_string(),
        amount: dec!(200),
        active: true,
        mode: ApplicationMode::Manual,
        condition: "Estoque organizado e conferido no mês".to_string(),
        stage_id: None,
        created_at: now,
        updated_at: now,
    })?;
    Ok(())
}
