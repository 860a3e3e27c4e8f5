//! Reservations and the table status they drive.

mod common;

use chrono::{Duration, Utc};

use bistro_core::{
    CreateReservationRequest, ErrorKind, LineItemRequest, NewCustomer, PaymentMethod,
    ReservationStatus, TableStatus,
};
use common::{restaurant, Restaurant};

fn booking(r: &Restaurant, phone: &str) -> CreateReservationRequest {
    CreateReservationRequest {
        customer: NewCustomer {
            first_name: "Mai".into(),
            last_name: "Nguyen".into(),
            phone: phone.into(),
        },
        table_id: r.table_id.clone(),
        reserved_for: Utc::now() + Duration::hours(2),
        party_size: 4,
        note: None,
    }
}

#[tokio::test]
async fn test_reservation_reserves_a_free_table() {
    let r = restaurant(5).await;
    let reservations = r.db.reservations();

    let reservation = reservations
        .create_reservation(&booking(&r, "0912 000 111"))
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Confirmed);
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Reserved
    );

    let err = reservations
        .create_reservation(&booking(&r, "0912 000 222"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TableUnavailable);

    // The refused booking created no customer.
    assert!(r
        .db
        .directory()
        .find_customer_by_phone("0912 000 222")
        .await
        .unwrap()
        .is_none());
    assert_eq!(reservations.reservations_for_table(&r.table_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_returning_customer_is_matched_by_phone() {
    let r = restaurant(5).await;
    let reservations = r.db.reservations();

    let first = reservations
        .create_reservation(&booking(&r, "0912 000 111"))
        .await
        .unwrap();
    reservations
        .update_reservation_status(&first.id, "cancelled")
        .await
        .unwrap();

    let second = reservations
        .create_reservation(&booking(&r, "0912 000 111"))
        .await
        .unwrap();
    assert_eq!(first.customer_id, second.customer_id);
}

#[tokio::test]
async fn test_cancelling_frees_a_reserved_table() {
    let r = restaurant(5).await;
    let reservations = r.db.reservations();

    let reservation = reservations
        .create_reservation(&booking(&r, "0912 000 111"))
        .await
        .unwrap();
    let cancelled = reservations
        .update_reservation_status(&reservation.id, "cancelled")
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Free
    );

    let err = reservations
        .update_reservation_status(&reservation.id, "confirmed")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_guests_arriving_occupy_the_reserved_table() {
    let r = restaurant(5).await;

    let reservation = r
        .db
        .reservations()
        .create_reservation(&booking(&r, "0912 000 111"))
        .await
        .unwrap();

    let view = r
        .db
        .orders()
        .add_items_to_bill(&r.order(vec![LineItemRequest::food(&r.food_id, 2)]))
        .await
        .unwrap();
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Occupied
    );

    let seated = r.db.reservations().get_reservation(&reservation.id).await.unwrap();
    assert_eq!(seated.status, ReservationStatus::Seated);

    // A seated booking can no longer be cancelled; the table stays occupied.
    let err = r
        .db
        .reservations()
        .update_reservation_status(&reservation.id, "cancelled")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Occupied
    );

    r.db
        .orders()
        .checkout_bill(&view.bill.id, PaymentMethod::Transfer)
        .await
        .unwrap();
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Free
    );
}

#[tokio::test]
async fn test_occupied_table_cannot_be_reserved() {
    let r = restaurant(5).await;

    r.db
        .orders()
        .add_items_to_bill(&r.order(vec![LineItemRequest::food(&r.food_id, 1)]))
        .await
        .unwrap();

    let err = r
        .db
        .reservations()
        .create_reservation(&booking(&r, "0912 000 111"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TableUnavailable);
}

#[tokio::test]
async fn test_old_booking_cannot_release_a_newer_one() {
    let r = restaurant(5).await;
    let reservations = r.db.reservations();

    let first = reservations
        .create_reservation(&booking(&r, "0912 000 111"))
        .await
        .unwrap();
    let view = r
        .db
        .orders()
        .add_items_to_bill(&r.order(vec![LineItemRequest::food(&r.food_id, 1)]))
        .await
        .unwrap();
    r.db
        .orders()
        .checkout_bill(&view.bill.id, PaymentMethod::Cash)
        .await
        .unwrap();

    let second = reservations
        .create_reservation(&booking(&r, "0912 000 222"))
        .await
        .unwrap();

    let err = reservations
        .update_reservation_status(&first.id, "cancelled")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Reserved
    );
    assert_eq!(
        reservations.get_reservation(&second.id).await.unwrap().status,
        ReservationStatus::Confirmed
    );

    let err = reservations
        .create_reservation(&booking(&r, "0912 000 333"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TableUnavailable);
}

#[tokio::test]
async fn test_cancel_keeps_table_while_another_booking_holds_it() {
    let r = restaurant(5).await;
    let reservations = r.db.reservations();

    let current = reservations
        .create_reservation(&booking(&r, "0912 000 111"))
        .await
        .unwrap();

    // A leftover confirmed booking for the same table.
    let leftover_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO reservations
            (id, customer_id, table_id, reserved_for, party_size, status, note, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 2, 'confirmed', NULL, ?4, ?4)
        "#,
    )
    .bind(&leftover_id)
    .bind(&current.customer_id)
    .bind(&r.table_id)
    .bind(Utc::now() - Duration::days(1))
    .execute(r.db.pool())
    .await
    .unwrap();

    reservations
        .update_reservation_status(&leftover_id, "cancelled")
        .await
        .unwrap();
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Reserved
    );

    reservations
        .update_reservation_status(&current.id, "cancelled")
        .await
        .unwrap();
    assert_eq!(
        r.db.tables().get(&r.table_id).await.unwrap().status,
        TableStatus::Free
    );
}
