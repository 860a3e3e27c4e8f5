//! Order engine scenarios: rounds, checkout, cancellation and the stock they move.

mod common;

use bistro_core::{
    BillStatus, ErrorKind, LineItemRequest, PaymentMethod, ProductUnitUpdate, RawLineItem,
    StockMovementReason, TableStatus,
};
use common::restaurant;

#[tokio::test]
async fn test_order_then_cancel_restores_stock_and_frees_table() {
    let r = restaurant(5).await;
    let orders = r.db.orders();

    let view = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&r.bottle_id, 2)]))
        .await
        .unwrap();

    assert_eq!(view.bill.total_cents, 2 * 250);
    assert_eq!(r.stock(&r.lager_id).await, 3);
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Occupied
    );

    let cancelled = orders.cancel_bill(&view.bill.id).await.unwrap();
    assert_eq!(cancelled.bill.status, BillStatus::Cancelled);
    assert!(cancelled.bill.closed_at.is_some());
    assert_eq!(r.stock(&r.lager_id).await, 5);
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Free
    );

    let movements = r.db.inventory().movements(&r.lager_id).await.unwrap();
    let reasons: Vec<_> = movements.iter().map(|m| m.reason).collect();
    assert_eq!(
        reasons,
        vec![
            StockMovementReason::InitialStock,
            StockMovementReason::OrderPlaced,
            StockMovementReason::OrderCancelled,
        ]
    );
    assert_eq!(r.db.inventory().movement_balance(&r.lager_id).await.unwrap(), 5);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_nothing_behind() {
    let r = restaurant(1).await;
    let orders = r.db.orders();

    let err = orders
        .add_items_to_bill(&r.order(vec![
            LineItemRequest::food(&r.food_id, 1),
            LineItemRequest::product_unit(&r.bottle_id, 2),
        ]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StockInsufficient);
    assert!(err.to_string().contains("Lager"));
    assert_eq!(r.stock(&r.lager_id).await, 1);
    assert!(orders.open_bill_for_table(&r.table_id).await.unwrap().is_none());
    assert!(orders.list_bills(None).await.unwrap().is_empty());
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Free
    );
}

#[tokio::test]
async fn test_demand_is_aggregated_across_units_of_one_drink() {
    let r = restaurant(10).await;

    // 1 case (6) + 5 bottles = 11 > 10, although each line alone fits.
    let err = r
        .db
        .orders()
        .add_items_to_bill(&r.order(vec![
            LineItemRequest::product_unit(&r.case_id, 1),
            LineItemRequest::product_unit(&r.bottle_id, 5),
        ]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StockInsufficient);
    assert_eq!(r.stock(&r.lager_id).await, 10);

    r.db
        .orders()
        .add_items_to_bill(&r.order(vec![
            LineItemRequest::product_unit(&r.case_id, 1),
            LineItemRequest::product_unit(&r.bottle_id, 4),
        ]))
        .await
        .unwrap();
    assert_eq!(r.stock(&r.lager_id).await, 0);
}

#[tokio::test]
async fn test_rounds_accumulate_on_one_open_bill() {
    let r = restaurant(20).await;
    let orders = r.db.orders();

    let first = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::food(&r.food_id, 2)]))
        .await
        .unwrap();
    let second = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&r.case_id, 1)]))
        .await
        .unwrap();
    let third = orders
        .add_items_to_bill(&r.order(vec![
            LineItemRequest::product_unit(&r.bottle_id, 3),
            LineItemRequest::food(&r.food_id, 1),
        ]))
        .await
        .unwrap();

    assert_eq!(first.bill.id, second.bill.id);
    assert_eq!(second.bill.id, third.bill.id);

    let sequence: Vec<i64> = third
        .rounds
        .iter()
        .map(|round| round.round.sequence_number)
        .collect();
    assert_eq!(sequence, vec![1, 2, 3]);

    assert_eq!(third.bill.total_cents, 2 * 600 + 1400 + 3 * 250 + 600);
    assert_eq!(third.bill.total(), third.computed_total());
    assert_eq!(r.stock(&r.lager_id).await, 20 - 6 - 3);
}

#[tokio::test]
async fn test_detail_prices_are_snapshots_of_the_catalog() {
    let r = restaurant(5).await;
    let orders = r.db.orders();

    // A stale client price is dropped when converting the raw line.
    let raw = RawLineItem {
        product_unit_id: Some(r.bottle_id.clone()),
        quantity: 1,
        price_cents: Some(1),
        ..Default::default()
    };
    let view = orders
        .add_items_to_bill(&r.order(vec![raw.try_into().unwrap()]))
        .await
        .unwrap();
    assert_eq!(view.rounds[0].details[0].unit_price_cents, 250);

    r.db
        .catalog()
        .update_product_unit(
            &r.bottle_id,
            &ProductUnitUpdate {
                price_cents: Some(300),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let view = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&r.bottle_id, 1)]))
        .await
        .unwrap();
    let prices: Vec<i64> = view
        .rounds
        .iter()
        .map(|round| round.details[0].unit_price_cents)
        .collect();
    assert_eq!(prices, vec![250, 300]);
    assert_eq!(view.bill.total_cents, 550);
}

#[tokio::test]
async fn test_checkout_settles_and_keeps_stock() {
    let r = restaurant(5).await;
    let orders = r.db.orders();

    let view = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&r.bottle_id, 2)]))
        .await
        .unwrap();
    let paid = orders
        .checkout_bill(&view.bill.id, PaymentMethod::Card)
        .await
        .unwrap();

    assert_eq!(paid.bill.status, BillStatus::Paid);
    assert_eq!(paid.bill.payment_method, Some(PaymentMethod::Card));
    assert_eq!(r.stock(&r.lager_id).await, 3);
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Free
    );

    let err = orders
        .checkout_bill(&view.bill.id, PaymentMethod::Cash)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillNotOpen);

    let err = orders.cancel_bill(&view.bill.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BillAlreadyPaid);
    assert_eq!(r.stock(&r.lager_id).await, 3);

    // The next round opens a fresh bill.
    let next = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::food(&r.food_id, 1)]))
        .await
        .unwrap();
    assert_ne!(next.bill.id, view.bill.id);
    assert_eq!(next.rounds[0].round.sequence_number, 1);
}

#[tokio::test]
async fn test_unavailable_food_is_rejected() {
    let r = restaurant(5).await;
    r.db
        .catalog()
        .set_food_availability(&r.food_id, false)
        .await
        .unwrap();

    let err = r
        .db
        .orders()
        .add_items_to_bill(&r.order(vec![LineItemRequest::food(&r.food_id, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_invalid_requests_fail_before_any_write() {
    let r = restaurant(5).await;
    let orders = r.db.orders();

    let err = orders.add_items_to_bill(&r.order(vec![])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&r.bottle_id, 0)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::food("not-an-id", 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let missing = uuid::Uuid::new_v4().to_string();
    let err = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&missing, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ItemNotFound);

    assert!(orders.list_bills(None).await.unwrap().is_empty());
    assert_eq!(r.stock(&r.lager_id).await, 5);
}

#[tokio::test]
async fn test_separate_tables_get_separate_bills() {
    let r = restaurant(5).await;
    let orders = r.db.orders();

    let five = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::food(&r.food_id, 1)]))
        .await
        .unwrap();
    let mut request = r.order(vec![LineItemRequest::food(&r.food_id, 2)]);
    request.table_id = r.other_table_id.clone();
    let six = orders.add_items_to_bill(&request).await.unwrap();

    assert_ne!(five.bill.id, six.bill.id);
    assert_eq!(orders.list_bills(Some(BillStatus::Open)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_short_second_round_leaves_open_bill_untouched() {
    let r = restaurant(3).await;
    let orders = r.db.orders();

    let first = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&r.bottle_id, 2)]))
        .await
        .unwrap();
    assert_eq!(first.bill.total_cents, 500);

    let err = orders
        .add_items_to_bill(&r.order(vec![
            LineItemRequest::food(&r.food_id, 1),
            LineItemRequest::product_unit(&r.bottle_id, 2),
        ]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StockInsufficient);

    let after = orders.get_bill(&first.bill.id).await.unwrap();
    assert_eq!(after.bill.total_cents, 500);
    assert_eq!(after.rounds.len(), 1);
    assert_eq!(after.bill.total(), after.computed_total());
    assert_eq!(r.stock(&r.lager_id).await, 1);
    assert_eq!(r.db.inventory().movement_balance(&r.lager_id).await.unwrap(), 1);

    // The refused round did not use up a sequence number.
    let next = orders
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&r.bottle_id, 1)]))
        .await
        .unwrap();
    assert_eq!(next.bill.id, first.bill.id);
    let sequence: Vec<i64> = next
        .rounds
        .iter()
        .map(|round| round.round.sequence_number)
        .collect();
    assert_eq!(sequence, vec![1, 2]);
    assert_eq!(next.bill.total_cents, 750);
    assert_eq!(r.stock(&r.lager_id).await, 0);
}

#[tokio::test]
async fn test_ordered_items_cannot_be_deleted_from_catalog() {
    let r = restaurant(5).await;
    r.db
        .orders()
        .add_items_to_bill(&r.order(vec![
            LineItemRequest::food(&r.food_id, 1),
            LineItemRequest::product_unit(&r.bottle_id, 1),
        ]))
        .await
        .unwrap();

    let err = r.db.catalog().delete_food(&r.food_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = r.db.catalog().delete_drink(&r.lager_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert!(r.db.catalog().get_food(&r.food_id).await.is_ok());
    assert_eq!(r.stock(&r.lager_id).await, 4);
}
