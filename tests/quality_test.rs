// ==========================================
// Quality-control forms
// ==========================================

mod test_helpers;

use pharmaflow::engine::scoring_core;
use pharmaflow::engine::{AnswerInput, EngineError, FormSubmission};
use pharmaflow::repository::QcFormRepository;
use rust_decimal_macros::dec;
use test_helpers::*;

fn answered(order_id: Option<&str>) -> FormSubmission {
    FormSubmission {
        item_name: "Fórmula X".to_string(),
        item_code: "FX-01".to_string(),
        order_id: order_id.map(String::from),
        answers: vec![AnswerInput {
            question_id: "qq-visual".to_string(),
            answer_text: "sim".to_string(),
            option_id: None,
        }],
    }
}

#[test]
fn required_questions_must_be_answered() {
    let ctx = setup();
    let submission = FormSubmission {
        item_name: "Fórmula X".to_string(),
        item_code: "FX-01".to_string(),
        order_id: None,
        answers: vec![],
    };
    let err = ctx.state.quality.submit_form(ANA, submission).unwrap_err();
    assert!(matches!(err, EngineError::RequiredAnswerMissing(_)));

    // Blank text does not count as an answer.
    let submission = FormSubmission {
        item_name: "Fórmula X".to_string(),
        item_code: "FX-01".to_string(),
        order_id: None,
        answers: vec![AnswerInput {
            question_id: "qq-visual".to_string(),
            answer_text: "   ".to_string(),
            option_id: None,
        }],
    };
    let err = ctx.state.quality.submit_form(ANA, submission).unwrap_err();
    assert!(matches!(err, EngineError::RequiredAnswerMissing(_)));
}

#[test]
fn standalone_form_earns_the_configured_points() {
    let ctx = setup();
    let form = ctx.state.quality.submit_form(ANA, answered(None)).unwrap();
    assert_eq!(form.points, dec!(2));
    assert_eq!(form.order_id, None);

    let month_ref = scoring_core::month_ref_for(now().date());
    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref).unwrap(), dec!(2));
}

#[test]
fn form_against_a_held_order_closes_the_stage() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", QC, 10);
    record_closed_history(&ctx.state, "ord-1", LABELING, BRUNO);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let form = ctx
        .state
        .quality
        .submit_form(ANA, answered(Some("ord-1")))
        .unwrap();
    assert_eq!(form.order_id.as_deref(), Some("ord-1"));

    let order = load_order(&ctx.state, "ord-1");
    assert_eq!(order.current_stage_id.as_deref(), Some(SHIPPING));
    assert_eq!(order.assigned_worker_id, None);
}

#[test]
fn refused_submission_persists_nothing() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", QC, 10);

    let err = ctx
        .state
        .quality
        .submit_form(ANA, answered(Some("ord-1")))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAssignee { .. }));

    // No ledger entry and no stored form survive the refusal.
    let month_ref = scoring_core::month_ref_for(now().date());
    assert_eq!(ctx.state.scoring.month_total(ANA, month_ref).unwrap(), dec!(0));
    let forms = QcFormRepository::from_connection(ctx.state.connection()).unwrap();
    assert!(forms.list_for_worker(ANA).unwrap().is_empty());
}

#[test]
fn form_against_an_order_outside_quality_is_refused() {
    let ctx = setup();
    insert_order(&ctx.state, "ord-1", TRIAGE, 10);
    ctx.state.workflow.claim(ANA, "ord-1").unwrap();

    let err = ctx
        .state
        .quality
        .submit_form(ANA, answered(Some("ord-1")))
        .unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}
