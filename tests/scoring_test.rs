// ==========================================
// Ledger, penalties and fixed monthly rules
// ==========================================

mod test_helpers;

use pharmaflow::domain::scoring::FixedMonthlyRule;
use pharmaflow::domain::types::{ApplicationMode, ScoreSource};
use pharmaflow::engine::scoring_core;
use pharmaflow::engine::EngineError;
use pharmaflow::repository::FixedRuleRepository;
use rust_decimal_macros::dec;
use test_helpers::*;

fn month_ref() -> chrono::NaiveDate {
    scoring_core::month_ref_for(now().date())
}

#[test]
fn awards_accumulate_per_month() {
    let ctx = setup();
    ctx.state
        .scoring
        .award(ANA, None, None, dec!(10), ScoreSource::Stage, "a")
        .unwrap();
    ctx.state
        .scoring
        .award(ANA, None, None, dec!(2.5), ScoreSource::Stage, "b")
        .unwrap();

    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref()).unwrap(), dec!(12.5));
    assert_eq!(ctx.state.scoring.list_month(ANA, month_ref()).unwrap().len(), 2);
    assert_eq!(ctx.state.scoring.month_total(BRUNO, month_ref()).unwrap(), dec!(0));
}

#[test]
fn penalty_subtracts_from_the_ledger() {
    let ctx = setup();
    ctx.state
        .scoring
        .award(ANA, None, None, dec!(50), ScoreSource::Stage, "base")
        .unwrap();

    let penalty = ctx
        .state
        .scoring
        .apply_penalty(CARLA_MANAGER, ANA, "atraso", dec!(10), "chegou tarde")
        .unwrap();
    assert!(!penalty.reverted);
    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref()).unwrap(), dec!(40));
}

#[test]
fn penalty_requires_a_manager() {
    let ctx = setup();
    let err = ctx
        .state
        .scoring
        .apply_penalty(BRUNO, ANA, "atraso", dec!(10), "")
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAuthorized(_)));
}

#[test]
fn penalty_reverts_exactly_once() {
    let ctx = setup();
    let penalty = ctx
        .state
        .scoring
        .apply_penalty(CARLA_MANAGER, ANA, "atraso", dec!(10), "")
        .unwrap();
    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref()).unwrap(), dec!(-10));

    let reverted = ctx
        .state
        .scoring
        .revert_penalty(CARLA_MANAGER, &penalty.penalty_id)
        .unwrap();
    assert!(reverted.reverted);
    assert_eq!(reverted.reverted_by.as_deref(), Some(CARLA_MANAGER));
    // Offsetting entry, not a deletion.
    assert_eq!(ctx.state.scoring.list_month(ANA, month_ref()).unwrap().len(), 2);
    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref()).unwrap(), dec!(0));

    let err = ctx
        .state
        .scoring
        .revert_penalty(CARLA_MANAGER, &penalty.penalty_id)
        .unwrap_err();
    assert!(matches!(err, EngineError::PenaltyAlreadyReverted(_)));
}

fn seed_fixed_rule(ctx: &TestContext, mode: ApplicationMode) {
    let repo = FixedRuleRepository::from_connection(ctx.state.connection()).unwrap();
    let ts = now();
    repo.insert(&FixedMonthlyRule {
        rule_id: "fr-stock".to_string(),
        name: "Organização de estoque".to_string(),
        amount: dec!(200),
        active: true,
        mode,
        condition: "Estoque conferido no mês".to_string(),
        stage_id: None,
        created_at: ts,
        updated_at: ts,
    })
    .unwrap();
}

#[test]
fn manual_fixed_rule_needs_a_manager_applier() {
    let ctx = setup();
    seed_fixed_rule(&ctx, ApplicationMode::Manual);

    let err = ctx
        .state
        .scoring
        .apply_fixed_rule("fr-stock", ANA, month_ref(), None, "")
        .unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));

    let err = ctx
        .state
        .scoring
        .apply_fixed_rule("fr-stock", ANA, month_ref(), Some(BRUNO), "")
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAuthorized(_)));

    let app = ctx
        .state
        .scoring
        .apply_fixed_rule("fr-stock", ANA, month_ref(), Some(CARLA_MANAGER), "ok")
        .unwrap();
    assert_eq!(app.points, dec!(200));
    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref()).unwrap(), dec!(200));
}

#[test]
fn fixed_rule_applies_once_per_month() {
    let ctx = setup();
    seed_fixed_rule(&ctx, ApplicationMode::Automatic);

    ctx.state
        .scoring
        .apply_fixed_rule("fr-stock", ANA, month_ref(), None, "")
        .unwrap();
    let err = ctx
        .state
        .scoring
        .apply_fixed_rule("fr-stock", ANA, month_ref(), None, "")
        .unwrap_err();
    assert!(matches!(err, EngineError::FixedRuleAlreadyApplied { .. }));

    // A different month is a fresh application.
    let other_month = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    ctx.state
        .scoring
        .apply_fixed_rule("fr-stock", ANA, other_month, None, "")
        .unwrap();
}
