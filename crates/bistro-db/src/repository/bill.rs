//! # Bill Repository
//!
//! Order bills, their rounds and line details.
//!
//! ## Aggregate Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order_bills (one OPEN per table, partial unique index)                 │
//! │     │ total_cents = Σ details.unit_price_cents × quantity                │
//! │     │                                                                   │
//! │     ├── order_rounds  seq 1  kitchen: served                            │
//! │     │      ├── order_details  food "Fried rice" × 2 @ 600               │
//! │     │      └── order_details  unit "Lager (bottle)" × 2 @ 350           │
//! │     └── order_rounds  seq 2  kitchen: pending                           │
//! │            └── order_details  unit "Lager case" × 1 @ 7200              │
//! │                                                                         │
//! │  Rounds and details cascade-delete with their bill.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use bistro_core::{
    BillStatus, BillView, CoreError, KitchenStatus, LineItemRef, Money, OrderBill, OrderDetail,
    OrderRound, PaymentMethod, PricedLine, RoundView, StockRequirements,
};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

/// Repository for order bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, bill_id: &str) -> DbResult<OrderBill> {
        let mut conn = self.pool.acquire().await?;
        fetch_bill(&mut conn, bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("OrderBill", bill_id))
    }

    /// Loads a bill with every round and detail.
    pub async fn get_view(&self, bill_id: &str) -> DbResult<BillView> {
        let mut conn = self.pool.acquire().await?;
        load_view(&mut conn, bill_id).await
    }

    /// The OPEN bill of a table, if any.
    pub async fn open_for_table(&self, table_id: &str) -> DbResult<Option<BillView>> {
        let mut conn = self.pool.acquire().await?;
        match fetch_open_bill(&mut conn, table_id).await? {
            Some(bill) => Ok(Some(load_view(&mut conn, &bill.id).await?)),
            None => Ok(None),
        }
    }

    /// Lists bills, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<BillStatus>) -> DbResult<Vec<OrderBill>> {
        let bills = sqlx::query_as::<_, OrderBill>(
            r#"
            SELECT id, table_id, employee_id, total_cents, status, payment_method,
                   created_at, updated_at, closed_at
            FROM order_bills
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(bills)
    }

    pub async fn get_round(&self, round_id: &str) -> DbResult<OrderRound> {
        let mut conn = self.pool.acquire().await?;
        fetch_round(&mut conn, round_id)
            .await?
            .ok_or_else(|| CoreError::RoundNotFound(round_id.to_string()).into())
    }

    // =========================================================================
    // Unit-of-work operations
    // =========================================================================

    /// Takes the write lock on a bill and returns its current row.
    pub(crate) async fn lock_bill(&self, uow: &mut UnitOfWork, bill_id: &str) -> DbResult<OrderBill> {
        if !uow
            .lock_row("UPDATE order_bills SET id = id WHERE id = ?1", bill_id)
            .await?
        {
            return Err(DbError::not_found("OrderBill", bill_id));
        }

        fetch_bill(uow.conn(), bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("OrderBill", bill_id))
    }

    pub(crate) async fn open_for_table_in(
        &self,
        uow: &mut UnitOfWork,
        table_id: &str,
    ) -> DbResult<Option<OrderBill>> {
        fetch_open_bill(uow.conn(), table_id).await
    }

    pub(crate) async fn view_in(&self, uow: &mut UnitOfWork, bill_id: &str) -> DbResult<BillView> {
        load_view(uow.conn(), bill_id).await
    }

    /// Inserts a new OPEN bill carrying `total`.
    pub(crate) async fn insert_open(
        &self,
        uow: &mut UnitOfWork,
        table_id: &str,
        employee_id: &str,
        total: Money,
    ) -> DbResult<OrderBill> {
        let now = Utc::now();
        let bill = OrderBill {
            id: new_id(),
            table_id: table_id.to_string(),
            employee_id: employee_id.to_string(),
            total_cents: total.cents(),
            status: BillStatus::Open,
            payment_method: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO order_bills (id, table_id, employee_id, total_cents, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.table_id)
        .bind(&bill.employee_id)
        .bind(bill.total_cents)
        .bind(bill.status)
        .bind(now)
        .execute(uow.conn())
        .await?;

        debug!(bill_id = %bill.id, table_id = %table_id, "Bill opened");
        Ok(bill)
    }

    /// Adds a round's total to an OPEN bill and reassigns its employee.
    ///
    /// A running total past `i64` cents fails with `InvalidInput`.
    pub(crate) async fn add_to_total(
        &self,
        uow: &mut UnitOfWork,
        bill_id: &str,
        employee_id: &str,
        amount: Money,
    ) -> DbResult<Money> {
        let current: Option<i64> = sqlx::query_scalar(
            "SELECT total_cents FROM order_bills WHERE id = ?1 AND status = 'open'",
        )
        .bind(bill_id)
        .fetch_optional(uow.conn())
        .await?;
        let current = current.ok_or_else(|| DbError::not_found("OrderBill", bill_id))?;

        let total = Money::from_cents(current)
            .checked_add(amount)
            .ok_or_else(|| CoreError::invalid(format!("bill {} total is too large", bill_id)))?;

        sqlx::query(
            r#"
            UPDATE order_bills
            SET total_cents = ?2, employee_id = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(bill_id)
        .bind(total.cents())
        .bind(employee_id)
        .bind(Utc::now())
        .execute(uow.conn())
        .await?;

        Ok(total)
    }

    /// Next round number of a bill: `MAX(sequence_number) + 1`, or 1.
    ///
    /// Gapless as long as the caller holds the bill's write lock.
    pub(crate) async fn next_sequence_number(
        &self,
        uow: &mut UnitOfWork,
        bill_id: &str,
    ) -> DbResult<i64> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM order_rounds WHERE bill_id = ?1",
        )
        .bind(bill_id)
        .fetch_one(uow.conn())
        .await?;
        Ok(next)
    }

    /// Inserts a round and its details. Prices come from `lines`.
    pub(crate) async fn insert_round(
        &self,
        uow: &mut UnitOfWork,
        bill_id: &str,
        sequence_number: i64,
        lines: &[PricedLine],
    ) -> DbResult<RoundView> {
        let now = Utc::now();
        let round = OrderRound {
            id: new_id(),
            bill_id: bill_id.to_string(),
            sequence_number,
            kitchen_status: KitchenStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO order_rounds (id, bill_id, sequence_number, kitchen_status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&round.id)
        .bind(&round.bill_id)
        .bind(round.sequence_number)
        .bind(round.kitchen_status)
        .bind(now)
        .execute(uow.conn())
        .await?;

        let mut details = Vec::with_capacity(lines.len());
        for line in lines {
            let (food_id, product_unit_id) = match &line.item {
                LineItemRef::Food { food_id } => (Some(food_id.clone()), None),
                LineItemRef::ProductUnit { product_unit_id } => {
                    (None, Some(product_unit_id.clone()))
                }
            };

            let detail = OrderDetail {
                id: new_id(),
                round_id: round.id.clone(),
                food_id,
                product_unit_id,
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO order_details (id, round_id, food_id, product_unit_id, quantity, unit_price_cents, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&detail.id)
            .bind(&detail.round_id)
            .bind(&detail.food_id)
            .bind(&detail.product_unit_id)
            .bind(detail.quantity)
            .bind(detail.unit_price_cents)
            .bind(now)
            .execute(uow.conn())
            .await?;

            details.push(detail);
        }

        debug!(
            bill_id = %bill_id,
            round_id = %round.id,
            sequence_number,
            lines = details.len(),
            "Round inserted"
        );
        Ok(RoundView { round, details })
    }

    /// Closes a bill (paid or cancelled).
    pub(crate) async fn close(
        &self,
        uow: &mut UnitOfWork,
        bill_id: &str,
        status: BillStatus,
        payment_method: Option<PaymentMethod>,
        closed_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE order_bills
            SET status = ?2, payment_method = ?3, closed_at = ?4, updated_at = ?4
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(bill_id)
        .bind(status)
        .bind(payment_method)
        .bind(closed_at)
        .execute(uow.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OrderBill", bill_id));
        }
        Ok(())
    }

    /// Base units to restore per drink: Σ detail.quantity × base_items_count
    /// over every product-unit detail of every round.
    pub(crate) async fn stock_drawn_in(
        &self,
        uow: &mut UnitOfWork,
        bill_id: &str,
    ) -> DbResult<StockRequirements> {
        let rows = sqlx::query_as::<_, (String, i64, i64)>(
            r#"
            SELECT pu.drink_id, d.quantity, pu.base_items_count
            FROM order_details d
            INNER JOIN order_rounds r ON r.id = d.round_id
            INNER JOIN product_units pu ON pu.id = d.product_unit_id
            WHERE r.bill_id = ?1
            "#,
        )
        .bind(bill_id)
        .fetch_all(uow.conn())
        .await?;

        let mut demand = StockRequirements::new();
        for (drink_id, quantity, base_items_count) in rows {
            demand.add(&drink_id, quantity, base_items_count)?;
        }
        Ok(demand)
    }

    /// Sets a round's kitchen status. Fails with `RoundNotFound`.
    pub(crate) async fn set_kitchen_status(
        &self,
        uow: &mut UnitOfWork,
        round_id: &str,
        status: KitchenStatus,
    ) -> DbResult<OrderRound> {
        let result = sqlx::query(
            "UPDATE order_rounds SET kitchen_status = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(round_id)
        .bind(status)
        .bind(Utc::now())
        .execute(uow.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::RoundNotFound(round_id.to_string()).into());
        }

        fetch_round(uow.conn(), round_id)
            .await?
            .ok_or_else(|| CoreError::RoundNotFound(round_id.to_string()).into())
    }
}

// =============================================================================
// Connection-level queries
// =============================================================================

async fn fetch_bill(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<Option<OrderBill>> {
    let bill = sqlx::query_as::<_, OrderBill>(
        r#"
        SELECT id, table_id, employee_id, total_cents, status, payment_method,
               created_at, updated_at, closed_at
        FROM order_bills WHERE id = ?1
        "#,
    )
    .bind(bill_id)
    .fetch_optional(conn)
    .await?;
    Ok(bill)
}

async fn fetch_open_bill(conn: &mut SqliteConnection, table_id: &str) -> DbResult<Option<OrderBill>> {
    let bill = sqlx::query_as::<_, OrderBill>(
        r#"
        SELECT id, table_id, employee_id, total_cents, status, payment_method,
               created_at, updated_at, closed_at
        FROM order_bills WHERE table_id = ?1 AND status = 'open'
        "#,
    )
    .bind(table_id)
    .fetch_optional(conn)
    .await?;
    Ok(bill)
}

async fn fetch_round(conn: &mut SqliteConnection, round_id: &str) -> DbResult<Option<OrderRound>> {
    let round = sqlx::query_as::<_, OrderRound>(
        r#"
        SELECT id, bill_id, sequence_number, kitchen_status, created_at, updated_at
        FROM order_rounds WHERE id = ?1
        "#,
    )
    .bind(round_id)
    .fetch_optional(conn)
    .await?;
    Ok(round)
}

/// Loads a bill with its rounds (by sequence number) and their details.
async fn load_view(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<BillView> {
    let bill = fetch_bill(&mut *conn, bill_id)
        .await?
        .ok_or_else(|| DbError::not_found("OrderBill", bill_id))?;

    let rounds = sqlx::query_as::<_, OrderRound>(
        r#"
        SELECT id, bill_id, sequence_number, kitchen_status, created_at, updated_at
        FROM order_rounds WHERE bill_id = ?1
        ORDER BY sequence_number
        "#,
    )
    .bind(bill_id)
    .fetch_all(&mut *conn)
    .await?;

    let details = sqlx::query_as::<_, OrderDetail>(
        r#"
        SELECT d.id, d.round_id, d.food_id, d.product_unit_id, d.quantity,
               d.unit_price_cents, d.created_at
        FROM order_details d
        INNER JOIN order_rounds r ON r.id = d.round_id
        WHERE r.bill_id = ?1
        ORDER BY r.sequence_number, d.rowid
        "#,
    )
    .bind(bill_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut views: Vec<RoundView> = rounds
        .into_iter()
        .map(|round| RoundView {
            round,
            details: Vec::new(),
        })
        .collect();

    for detail in details {
        if let Some(view) = views.iter_mut().find(|v| v.round.id == detail.round_id) {
            view.details.push(detail);
        }
    }

    Ok(BillView { bill, rounds: views })
}
