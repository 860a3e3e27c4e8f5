//! Concurrent writers on a file-backed database with a multi-connection pool.

mod common;

use std::collections::HashSet;

use bistro_core::{ErrorKind, LineItemRequest, PaymentMethod};
use common::restaurant_on_file;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rounds_on_one_table_stay_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let r = restaurant_on_file(&dir.path().join("bistro.db"), 10, 4).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orders = r.db.orders();
        let request = r.order(vec![
            LineItemRequest::product_unit(&r.bottle_id, 2),
            LineItemRequest::food(&r.food_id, 1),
        ]);
        handles.push(tokio::spawn(async move {
            orders.add_items_to_bill(&request).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::StockInsufficient),
        }
    }

    // 10 bottles, 2 per round.
    assert_eq!(succeeded, 5);
    assert_eq!(r.stock(&r.lager_id).await, 0);
    assert_eq!(r.db.inventory().movement_balance(&r.lager_id).await.unwrap(), 0);

    let bill = r
        .db
        .orders()
        .open_bill_for_table(&r.table_id)
        .await
        .unwrap()
        .unwrap();
    let sequence: Vec<i64> = bill
        .rounds
        .iter()
        .map(|round| round.round.sequence_number)
        .collect();
    assert_eq!(sequence, (1..=5).collect::<Vec<i64>>());
    assert_eq!(bill.bill.total(), bill.computed_total());
    assert_eq!(bill.bill.total_cents, 5 * (2 * 250 + 600));

    r.db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_credit_once() {
    let dir = tempfile::tempdir().unwrap();
    let r = restaurant_on_file(&dir.path().join("bistro.db"), 0, 4).await;

    let po = r
        .db
        .purchasing()
        .create_purchase_order(&bistro_core::CreatePurchaseOrderRequest {
            supplier_id: r.supplier_id.clone(),
            details: vec![bistro_core::PurchaseLineRequest {
                product_unit_id: r.case_id.clone(),
                quantity: 3,
                unit_cost_cents: 900,
            }],
            note: None,
        })
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let purchasing = r.db.purchasing();
        let po_id = po.order.id.clone();
        handles.push(tokio::spawn(async move {
            purchasing.approve_purchase_order(&po_id).await
        }));
    }

    let mut receipts = HashSet::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                receipts.insert(outcome.receipt.receipt.id);
            }
            Err(err) => assert_eq!(err.kind(), ErrorKind::PoAlreadyApproved),
        }
    }

    assert_eq!(receipts.len(), 1);
    assert_eq!(r.stock(&r.lager_id).await, 18);
    assert_eq!(
        r.db.purchasing().list_import_receipts().await.unwrap().len(),
        1
    );

    r.db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_checkout_racing_cancel_settles_once() {
    let dir = tempfile::tempdir().unwrap();
    let r = restaurant_on_file(&dir.path().join("bistro.db"), 6, 4).await;

    let view = r
        .db
        .orders()
        .add_items_to_bill(&r.order(vec![LineItemRequest::product_unit(&r.bottle_id, 4)]))
        .await
        .unwrap();
    let bill_id = view.bill.id.clone();

    let pay = {
        let orders = r.db.orders();
        let bill_id = bill_id.clone();
        tokio::spawn(async move { orders.checkout_bill(&bill_id, PaymentMethod::Cash).await })
    };
    let void = {
        let orders = r.db.orders();
        let bill_id = bill_id.clone();
        tokio::spawn(async move { orders.cancel_bill(&bill_id).await })
    };

    let paid = pay.await.unwrap();
    let cancelled = void.await.unwrap();
    assert!(paid.is_ok() != cancelled.is_ok());

    let expected_stock = if paid.is_ok() { 2 } else { 6 };
    assert_eq!(r.stock(&r.lager_id).await, expected_stock);

    r.db.close().await;
}
