// ==========================================
// Order intake and synchronization
// ==========================================

mod test_helpers;

use pharmaflow::domain::types::ProductKind;
use pharmaflow::importer::{CsvOrderSource, OrderRecord, SyncSummary};
use pharmaflow::repository::WorkOrderRepository;
use rust_decimal_macros::dec;
use test_helpers::*;

fn record(source_id: i64, name: &str, description: &str) -> OrderRecord {
    OrderRecord {
        source_id,
        source_order_id: Some(9000 + source_id),
        source_web_id: Some(70),
        name: name.to_string(),
        description: description.to_string(),
        quantity: None,
        unit_price: None,
        total_price: None,
        updated_date: None,
        updated_time: None,
    }
}

fn find_by_source(ctx: &TestContext, source_id: i64) -> pharmaflow::domain::order::WorkOrder {
    WorkOrderRepository::from_connection(ctx.state.connection())
        .unwrap()
        .find_by_source_id(source_id)
        .unwrap()
        .expect("order synced")
}

#[test]
fn new_records_enter_at_the_first_stage() {
    let ctx = setup();
    let summary = ctx
        .state
        .sync
        .sync_records(&[record(1, "Maria", "VITAMINA D3 - CAPSULA: 60CAP")])
        .unwrap();
    assert_eq!(
        summary,
        SyncSummary {
            created: 1,
            ..SyncSummary::default()
        }
    );

    let order = find_by_source(&ctx, 1);
    assert_eq!(order.current_stage_id.as_deref(), Some(TRIAGE));
    assert_eq!(order.identified_kind, Some(ProductKind::Capsule));
    // Quantity pulled out of the description.
    assert_eq!(order.quantity, 60);
    assert_eq!(order.order_code, "9001-70");
}

#[test]
fn resync_of_identical_records_is_a_noop() {
    let ctx = setup();
    let records = [record(1, "Maria", "CREME CLAREADOR 30G")];
    ctx.state.sync.sync_records(&records).unwrap();

    let summary = ctx.state.sync.sync_records(&records).unwrap();
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 0);
}

#[test]
fn changed_source_fields_update_in_place() {
    let ctx = setup();
    ctx.state
        .sync
        .sync_records(&[record(1, "Maria", "CREME CLAREADOR 30G")])
        .unwrap();
    let before = find_by_source(&ctx, 1);
    assert_eq!(before.identified_kind, Some(ProductKind::Cream));

    let mut changed = record(1, "Maria", "SHAMPOO ANTIQUEDA 200ML");
    changed.unit_price = Some(dec!(89.90));
    let summary = ctx.state.sync.sync_records(&[changed]).unwrap();
    assert_eq!(summary.updated, 1);

    let after = find_by_source(&ctx, 1);
    assert_eq!(after.order_id, before.order_id);
    assert_eq!(after.identified_kind, Some(ProductKind::Shampoo));
    assert_eq!(after.unit_price, Some(dec!(89.90)));
    // Workflow position never moves on update.
    assert_eq!(after.current_stage_id, before.current_stage_id);
}

#[test]
fn update_never_touches_assignment() {
    let ctx = setup();
    ctx.state
        .sync
        .sync_records(&[record(1, "Maria", "VITAMINA D 60 CAPSULAS")])
        .unwrap();
    let order = find_by_source(&ctx, 1);
    ctx.state.workflow.claim(ANA, &order.order_id).unwrap();

    ctx.state
        .sync
        .sync_records(&[record(1, "Maria Clara", "VITAMINA D 60 CAPSULAS")])
        .unwrap();
    let after = find_by_source(&ctx, 1);
    assert_eq!(after.name, "Maria Clara");
    assert_eq!(after.assigned_worker_id.as_deref(), Some(ANA));
}

#[tokio::test]
async fn csv_source_round_trips_into_orders() {
    let ctx = setup();
    let dir = tempfile::TempDir::new().unwrap();
    let csv_path = dir.path().join("orders.csv");
    std::fs::write(
        &csv_path,
        "source_id,source_order_id,source_web_id,name,description,quantity,unit_price,total_price,updated_date,updated_time\n\
         10,9010,70,Joana,SACHE VITAMINA C 30 ENV,30,2.50,75.00,2026-08-20,14:30:00\n\
         11,9011,70,Pedro,FORMULA MANIPULADA,,,,,\n",
    )
    .unwrap();

    let source = CsvOrderSource::new(&csv_path);
    let summary = ctx.state.sync.sync_from(&source).await.unwrap();
    assert_eq!(summary.created, 2);
    assert_eq!(summary.errors, 0);

    let sachet = find_by_source(&ctx, 10);
    assert_eq!(sachet.identified_kind, Some(ProductKind::Sachet));
    assert_eq!(sachet.quantity, 30);
    assert_eq!(sachet.unit_price, Some(dec!(2.50)));
    assert_eq!(
        sachet.source_updated_date,
        chrono::NaiveDate::from_ymd_opt(2026, 8, 20)
    );
}
