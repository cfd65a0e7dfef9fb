// ==========================================
// Claim / queue / completion flow
// ==========================================

mod test_helpers;

use pharmaflow::domain::types::{OrderStatus, QueueStatus};
use pharmaflow::engine::scoring_core;
use pharmaflow::engine::EngineError;
use rust_decimal_macros::dec;
use test_helpers::*;

#[test]
fn claim_assigns_and_opens_history() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 100);

    let order = ctx.state.workflow.claim(ANA, "ord-1").unwrap();
    assert_eq!(order.assigned_worker_id.as_deref(), Some(ANA));
    assert_eq!(order.queue_status, QueueStatus::Active);
}

#[test]
fn second_claim_queues_pending() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 50);
    insert_order(&ctx.state, "ord-2", TRIAGE, 50);

    ctx.state.workflow.claim(ANA, "ord-1").unwrap();
    let second = ctx.state.workflow.claim(ANA, "ord-2").unwrap();
    assert_eq!(second.queue_status, QueueStatus::Pending);
}

#[test]
fn claiming_an_assigned_order_is_refused() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 50);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let err = ctx.state.workflow.claim(BRUNO, "ord-1").unwrap_err();
    assert!(matches!(err, EngineError::AlreadyAssigned(_)));
}

#[test]
fn claim_requires_previous_stage_closed() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", PRODUCTION, 50);

    let err = ctx.state.workflow.claim(ANA, "ord-1").unwrap_err();
    assert!(matches!(err, EngineError::PreviousStageIncomplete(_)));

    record_closed_history(&ctx.state, "ord-1", TRIAGE, BRUNO);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();
}

#[test]
fn claim_limit_is_enforced() {
    let ctx = setup();
    ctx.state
        .config
        .set("max_concurrent_claims", "2")
        .unwrap();
    for i in 0..3 {
        insert_order(&ctx.state, &format!("ord-{i}"), TRIAGE, 10);
    }

    ctx.state.workflow.claim(ANA, "ord-0").unwrap();
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();
    let err = ctx.state.workflow.claim(ANA, "ord-2").unwrap_err();
    assert!(matches!(
        err,
        EngineError::ClaimLimitReached { count: 2, limit: 2, .. }
    ));
}

#[test]
fn toggle_queue_demotes_other_actives() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 10);
    insert_order(&ctx.state, "ord-2", TRIAGE, 10);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();
    ctx.state.workflow.claim(ANA, "ord-2").unwrap();

    let promoted = ctx.state.workflow.toggle_queue(ANA, "ord-2").unwrap();
    assert_eq!(promoted.queue_status, QueueStatus::Active);
    assert_eq!(load_order(&ctx.state, "ord-1").queue_status, QueueStatus::Pending);
}

#[test]
fn pending_order_cannot_complete() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 10);
    insert_order(&ctx.state, "ord-2", TRIAGE, 10);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();
    ctx.state.workflow.claim(ANA, "ord-2").unwrap();

    let err = ctx
        .state
        .workflow
        .complete_stage(ANA, "ord-2", None, None, "")
        .unwrap_err();
    assert!(matches!(err, EngineError::PendingCannotComplete(_)));
}

#[test]
fn completing_triage_scores_the_band_and_advances() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 100);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let outcome = ctx
        .state
        .workflow
        .complete_stage(ANA, "ord-1", None, None, "pesagem ok")
        .unwrap();
    // Band 61..=1000 pays 2.
    assert_eq!(outcome.points, dec!(2));
    assert_eq!(outcome.order.current_stage_id.as_deref(), Some(PRODUCTION));
    assert_eq!(outcome.order.assigned_worker_id, None);

    let month_ref = scoring_core::month_ref_for(now().date());
    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref).unwrap(), dec!(2));
}

#[test]
fn production_pays_per_unit_plus_fixed() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", PRODUCTION, 100);
    record_closed_history(&ctx.state, "ord-1", TRIAGE, ANA);
    ctx.state.workflow.claim(BRUNO, "ord-1").unwrap();

    let outcome = ctx
        .state
        .workflow
        .complete_stage(BRUNO, "ord-1", Some(100), None, "")
        .unwrap();
    // 100 * 0.02 + 1 fixed.
    assert_eq!(outcome.points, dec!(3));
    assert_eq!(outcome.order.current_stage_id.as_deref(), Some(LABELING));
}

#[test]
fn checklist_marks_record_item_points() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", LABELING, 10);
    record_closed_history(&ctx.state, "ord-1", PRODUCTION, ANA);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let run = ctx
        .state
        .workflow
        .set_checklist(ANA, "ord-1", "cl-label", true)
        .unwrap();
    assert!(run.marked);
    assert_eq!(run.points, dec!(0.5));

    let run = ctx
        .state
        .workflow
        .set_checklist(ANA, "ord-1", "cl-label", false)
        .unwrap();
    assert!(!run.marked);
    assert_eq!(run.points, dec!(0));
}

#[test]
fn checklist_from_another_stage_is_refused() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 10);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let err = ctx
        .state
        .workflow
        .set_checklist(ANA, "ord-1", "cl-label", true)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn completion_by_non_assignee_is_refused() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 10);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let err = ctx
        .state
        .workflow
        .complete_stage(BRUNO, "ord-1", None, None, "")
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAssignee { .. }));
}

#[test]
fn quality_stage_refuses_plain_completion() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", QC, 10);
    record_closed_history(&ctx.state, "ord-1", LABELING, ANA);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let err = ctx
        .state
        .workflow
        .complete_stage(ANA, "ord-1", None, None, "")
        .unwrap_err();
    assert!(matches!(err, EngineError::QualityFormRequired));
}

#[test]
fn release_discards_the_open_history() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 10);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let released = ctx.state.workflow.release(ANA, "ord-1").unwrap();
    assert_eq!(released.assigned_worker_id, None);
    assert_eq!(released.queue_status, QueueStatus::Pending);

    // Claimable again, with a fresh history.
    ctx.state.workflow.claim(BRUNO, "ord-1").unwrap();
}

#[test]
fn full_pipeline_reaches_completion() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 60);

    ctx.state.workflow.claim(ANA, "ord-1").unwrap();
    ctx.state
        .workflow
        .complete_stage(ANA, "ord-1", None, None, "")
        .unwrap();

    ctx.state.workflow.claim(ANA, "ord-1").unwrap();
    ctx.state
        .workflow
        .complete_stage(ANA, "ord-1", None, None, "")
        .unwrap();

    ctx.state.workflow.claim(ANA, "ord-1").unwrap();
    let outcome = ctx
        .state
        .workflow
        .complete_stage(ANA, "ord-1", None, None, "")
        .unwrap();
    assert_eq!(outcome.order.current_stage_id.as_deref(), Some(QC));
    assert_eq!(outcome.order.status, OrderStatus::InFlow);
}
