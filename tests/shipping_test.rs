// ==========================================
// Shipping route drafting and dispatch
// ==========================================

mod test_helpers;

use pharmaflow::domain::types::{OrderStatus, ShippingMethod};
use pharmaflow::engine::scoring_core;
use pharmaflow::engine::EngineError;
use rust_decimal_macros::dec;
use test_helpers::*;

fn month_ref() -> chrono::NaiveDate {
    scoring_core::month_ref_for(now().date())
}

#[test]
fn select_and_deselect_record_the_method() {
    let ctx = setup();
    insert_order(&ctx.state, "ship-1", SHIPPING, 10);

    let order = ctx
        .state
        .shipping
        .select_order(ANA, "ship-1", ShippingMethod::Motoboy)
        .unwrap();
    assert_eq!(order.shipping_method, Some(ShippingMethod::Motoboy));

    let order = ctx.state.shipping.deselect_order(ANA, "ship-1").unwrap();
    assert_eq!(order.shipping_method, None);
}

#[test]
fn selecting_outside_the_shipping_stage_is_refused() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 10);

    let err = ctx
        .state
        .shipping
        .select_order(ANA, "ord-1", ShippingMethod::Motoboy)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAtShippingStage(_)));
}

#[test]
fn cancel_route_clears_every_drafted_order() {
    let ctx = setup();
    insert_order(&ctx.state, "ship-1", SHIPPING, 10);
    insert_order(&ctx.state, "ship-2", SHIPPING, 10);
    ctx.state
        .shipping
        .select_order(ANA, "ship-1", ShippingMethod::Motoboy)
        .unwrap();
    ctx.state
        .shipping
        .select_order(ANA, "ship-2", ShippingMethod::Motoboy)
        .unwrap();

    let cleared = ctx
        .state
        .shipping
        .cancel_route(ANA, ShippingMethod::Motoboy)
        .unwrap();
    assert_eq!(cleared, 2);
    assert_eq!(load_order(&ctx.state, "ship-1").shipping_method, None);
}

#[test]
fn empty_route_is_refused() {
    let ctx = setup();
    let err = ctx
        .state
        .shipping
        .finalize_route(ANA, ShippingMethod::Motoboy, &[])
        .unwrap_err();
    assert!(matches!(err, EngineError::EmptyRoute));
}

#[test]
fn motoboy_route_pays_per_order_plus_daily_duty() {
    let ctx = setup();
    insert_order(&ctx.state, "ship-1", SHIPPING, 10);
    insert_order(&ctx.state, "ship-2", SHIPPING, 10);

    let outcome = ctx
        .state
        .shipping
        .finalize_route(
            ANA,
            ShippingMethod::Motoboy,
            &["ship-1".to_string(), "ship-2".to_string()],
        )
        .unwrap();
    assert_eq!(outcome.dispatched, 2);
    // 1 per order + 15 daily duty.
    assert_eq!(outcome.total_points, dec!(17));
    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref()).unwrap(), dec!(17));

    // Shipping is the last stage, so dispatched orders complete.
    let shipped = load_order(&ctx.state, "ship-1");
    assert_eq!(shipped.status, OrderStatus::Completed);
    assert!(shipped.completed_at.is_some());
    assert_eq!(shipped.current_stage_id, None);
}

#[test]
fn daily_duty_pays_once_per_day() {
    let ctx = setup();
    insert_order(&ctx.state, "ship-1", SHIPPING, 10);
    insert_order(&ctx.state, "ship-2", SHIPPING, 10);

    let first = ctx
        .state
        .shipping
        .finalize_route(ANA, ShippingMethod::Motoboy, &["ship-1".to_string()])
        .unwrap();
    assert_eq!(first.total_points, dec!(16));

    let second = ctx
        .state
        .shipping
        .finalize_route(ANA, ShippingMethod::Motoboy, &["ship-2".to_string()])
        .unwrap();
    assert_eq!(second.total_points, dec!(1));
}

#[test]
fn sedex_pays_per_dispatch() {
    let ctx = setup();
    insert_order(&ctx.state, "ship-1", SHIPPING, 10);
    insert_order(&ctx.state, "ship-2", SHIPPING, 10);

    let outcome = ctx
        .state
        .shipping
        .finalize_route(
            BRUNO,
            ShippingMethod::Sedex,
            &["ship-1".to_string(), "ship-2".to_string()],
        )
        .unwrap();
    assert_eq!(outcome.total_points, dec!(2));
}

#[test]
fn finalizing_an_order_held_by_someone_else_is_refused() {
    let ctx = setup();
    insert_order(&ctx.state, "ship-1", SHIPPING, 10);
    record_closed_history(&ctx.state, "ship-1", QC, ANA);
    ctx.state.workflow.claim(BRUNO, "ship-1").unwrap();

    let err = ctx
        .state
        .shipping
        .finalize_route(ANA, ShippingMethod::Motoboy, &["ship-1".to_string()])
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyAssigned(_)));
}
