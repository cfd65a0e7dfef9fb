// ==========================================
// Monthly close and bonus payouts
// ==========================================

mod test_helpers;

use pharmaflow::domain::types::{PayoutStatus, ScoreSource};
use pharmaflow::engine::scoring_core;
use pharmaflow::engine::EngineError;
use rust_decimal_macros::dec;
use test_helpers::*;

fn month_ref() -> chrono::NaiveDate {
    scoring_core::month_ref_for(now().date())
}

#[test]
fn close_month_requires_a_manager() {
    let ctx = setup();
    let err = ctx.state.bonus.close_month(ANA, month_ref()).unwrap_err();
    assert!(matches!(err, EngineError::NotAuthorized(_)));
}

#[test]
fn close_month_maps_totals_onto_tiers() {
    let ctx = setup();
    ctx.state
        .scoring
        .award(ANA, None, None, dec!(450), ScoreSource::Stage, "")
        .unwrap();
    ctx.state
        .scoring
        .award(BRUNO, None, None, dec!(700), ScoreSource::Stage, "")
        .unwrap();

    let bonuses = ctx.state.bonus.close_month(CARLA_MANAGER, month_ref()).unwrap();
    assert_eq!(bonuses.len(), 2);

    let ana = bonuses.iter().find(|b| b.worker_id == ANA).unwrap();
    assert_eq!(ana.total_points, dec!(450));
    assert_eq!(ana.amount, dec!(150));
    assert_eq!(ana.payout_status, PayoutStatus::Pending);

    let bruno = bonuses.iter().find(|b| b.worker_id == BRUNO).unwrap();
    assert_eq!(bruno.amount, dec!(350));
}

#[test]
fn below_the_first_paying_tier_the_amount_is_zero() {
    let ctx = setup();
    ctx.state
        .scoring
        .award(ANA, None, None, dec!(100), ScoreSource::Stage, "")
        .unwrap();

    let bonuses = ctx.state.bonus.close_month(CARLA_MANAGER, month_ref()).unwrap();
    assert_eq!(bonuses[0].amount, dec!(0));
}

#[test]
fn reclosing_recomputes_and_keeps_the_record_id() {
    let ctx = setup();
    ctx.state
        .scoring
        .award(ANA, None, None, dec!(450), ScoreSource::Stage, "")
        .unwrap();
    let first = ctx.state.bonus.close_month(CARLA_MANAGER, month_ref()).unwrap();
    ctx.state
        .bonus
        .mark_paid(CARLA_MANAGER, ANA, month_ref())
        .unwrap();

    ctx.state
        .scoring
        .award(ANA, None, None, dec!(200), ScoreSource::Stage, "")
        .unwrap();
    let second = ctx.state.bonus.close_month(CARLA_MANAGER, month_ref()).unwrap();

    assert_eq!(second[0].bonus_id, first[0].bonus_id);
    assert_eq!(second[0].total_points, dec!(650));
    assert_eq!(second[0].amount, dec!(350));
    // Reclosing resets the payout.
    assert_eq!(second[0].payout_status, PayoutStatus::Pending);
}

#[test]
fn mark_paid_stamps_the_payout() {
    let ctx = setup();
    ctx.state
        .scoring
        .award(ANA, None, None, dec!(500), ScoreSource::Stage, "")
        .unwrap();
    ctx.state.bonus.close_month(CARLA_MANAGER, month_ref()).unwrap();

    let paid = ctx
        .state
        .bonus
        .mark_paid(CARLA_MANAGER, ANA, month_ref())
        .unwrap();
    assert_eq!(paid.payout_status, PayoutStatus::Paid);
    assert!(paid.paid_at.is_some());

    let cancelled = ctx
        .state
        .bonus
        .cancel(CARLA_MANAGER, ANA, month_ref())
        .unwrap();
    assert_eq!(cancelled.payout_status, PayoutStatus::Cancelled);
    assert_eq!(cancelled.paid_at, None);
}

#[test]
fn marking_an_unclosed_month_fails() {
    let ctx = setup();
    let err = ctx
        .state
        .bonus
        .mark_paid(CARLA_MANAGER, ANA, month_ref())
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}
