//! # Order Engine
//!
//! Bills, rounds and the stock they draw.
//!
//! ## add_items_to_bill
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request (ids, quantities, line count)                         │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  lock table row ─────────────── serializes every order on this table   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  re-price lines from catalog ── client prices are never read           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  aggregate stock demand per drink (quantity × base_items_count)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  find or open bill ─► next sequence ─► insert round + details          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reserve stock (all or nothing) ─► seat reservation ─► table occupied  │
//! │       │                                                                 │
//! │       ▼  COMMIT                                                         │
//! │  BillView with every round                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checkout never touches stock. Cancellation restores everything the bill
//! drew, round by round.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use bistro_core::validation::{validate_add_items, OrderLimits};
use bistro_core::{
    round_total, AddItemsRequest, BillStatus, BillView, KitchenStatus, OrderBill, OrderRound,
    PaymentMethod, StockMovementReason, StockRequirements, TableEvent, TableStatus,
};

use crate::error::{DbError, DbResult};
use crate::repository::bill::BillRepository;
use crate::repository::catalog::CatalogRepository;
use crate::repository::directory::DirectoryRepository;
use crate::repository::inventory::InventoryLedger;
use crate::repository::reservation::ReservationRepository;
use crate::repository::table::TableRepository;
use crate::unit_of_work::UnitOfWork;

/// Places rounds on bills and settles them.
#[derive(Debug, Clone)]
pub struct OrderEngine {
    pool: SqlitePool,
    limits: OrderLimits,
    bills: BillRepository,
    catalog: CatalogRepository,
    directory: DirectoryRepository,
    ledger: InventoryLedger,
    reservations: ReservationRepository,
    tables: TableRepository,
}

impl OrderEngine {
    pub fn new(pool: SqlitePool, limits: OrderLimits) -> Self {
        OrderEngine {
            bills: BillRepository::new(pool.clone()),
            catalog: CatalogRepository::new(pool.clone()),
            directory: DirectoryRepository::new(pool.clone()),
            ledger: InventoryLedger::new(pool.clone()),
            reservations: ReservationRepository::new(pool.clone()),
            tables: TableRepository::new(pool.clone()),
            pool,
            limits,
        }
    }

    pub fn limits(&self) -> OrderLimits {
        self.limits
    }

    /// Adds one round of items to the table's open bill, opening a bill if
    /// the table has none.
    ///
    /// ## Errors
    /// - `InvalidInput`: malformed ids, no items, bad quantity, unavailable
    ///   or unpriced item
    /// - `ItemNotFound`: table, employee, food or product unit missing
    /// - `StockInsufficient`: first short drink with its shortfall
    ///
    /// On any error nothing is written.
    pub async fn add_items_to_bill(&self, request: &AddItemsRequest) -> DbResult<BillView> {
        validate_add_items(request, &self.limits)?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let table = self.tables.lock_table(&mut uow, &request.table_id).await?;
        if !self
            .directory
            .employee_exists_in(&mut uow, &request.employee_id)
            .await?
        {
            return Err(DbError::not_found("Employee", &request.employee_id));
        }

        let lines = self.catalog.price_lines(&mut uow, &request.items).await?;
        let total = round_total(&lines)?;
        let demand = StockRequirements::from_lines(&lines)?;

        let bill = match self.bills.open_for_table_in(&mut uow, &request.table_id).await? {
            Some(bill) => {
                self.bills
                    .add_to_total(&mut uow, &bill.id, &request.employee_id, total)
                    .await?;
                bill
            }
            None => {
                let bill = self
                    .bills
                    .insert_open(&mut uow, &request.table_id, &request.employee_id, total)
                    .await?;
                info!(bill_id = %bill.id, table_id = %request.table_id, "Bill opened");
                bill
            }
        };

        let sequence_number = self.bills.next_sequence_number(&mut uow, &bill.id).await?;
        let round = self
            .bills
            .insert_round(&mut uow, &bill.id, sequence_number, &lines)
            .await?;

        self.ledger.reserve(&mut uow, &demand, &round.round.id).await?;
        if table.status == TableStatus::Reserved {
            let seated = self
                .reservations
                .seat_for_table(&mut uow, &request.table_id)
                .await?;
            info!(table_id = %request.table_id, reservations = seated, "Reserved party seated");
        }
        self.tables
            .apply_event(&mut uow, &request.table_id, TableEvent::RoundAdded)
            .await?;

        let view = self.bills.view_in(&mut uow, &bill.id).await?;
        uow.commit().await?;

        info!(
            bill_id = %view.bill.id,
            table_id = %request.table_id,
            sequence_number,
            round_total = %total,
            bill_total = view.bill.total_cents,
            drinks = demand.len(),
            "Round added"
        );
        Ok(view)
    }

    /// Settles an open bill and frees its table. Stock is not touched.
    pub async fn checkout_bill(
        &self,
        bill_id: &str,
        payment_method: PaymentMethod,
    ) -> DbResult<BillView> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let bill = self.bills.lock_bill(&mut uow, bill_id).await?;
        let status = bill.status.checkout(bill_id).inspect_err(|_| {
            warn!(bill_id = %bill_id, status = %bill.status, "Checkout refused");
        })?;

        self.bills
            .close(&mut uow, bill_id, status, Some(payment_method), Utc::now())
            .await?;
        self.tables
            .apply_event(&mut uow, &bill.table_id, TableEvent::BillClosed)
            .await?;

        let view = self.bills.view_in(&mut uow, bill_id).await?;
        uow.commit().await?;

        info!(bill_id = %bill_id, total = view.bill.total_cents, ?payment_method, "Bill paid");
        Ok(view)
    }

    /// Voids an open bill, restores every drink it drew, and frees its table.
    pub async fn cancel_bill(&self, bill_id: &str) -> DbResult<BillView> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let bill = self.bills.lock_bill(&mut uow, bill_id).await?;
        let status = bill.status.cancel(bill_id).inspect_err(|_| {
            warn!(bill_id = %bill_id, status = %bill.status, "Cancellation refused");
        })?;

        let drawn = self.bills.stock_drawn_in(&mut uow, bill_id).await?;
        self.ledger
            .release(&mut uow, &drawn, StockMovementReason::OrderCancelled, bill_id)
            .await?;

        self.bills
            .close(&mut uow, bill_id, status, None, Utc::now())
            .await?;
        self.tables
            .apply_event(&mut uow, &bill.table_id, TableEvent::BillClosed)
            .await?;

        let view = self.bills.view_in(&mut uow, bill_id).await?;
        uow.commit().await?;

        info!(bill_id = %bill_id, drinks_restored = drawn.len(), "Bill cancelled");
        Ok(view)
    }

    /// Sets a round's kitchen status from its wire name.
    ///
    /// Unknown names fail with `InvalidInput`, unknown rounds with
    /// `RoundNotFound`. Bills and stock are untouched.
    pub async fn update_round_kitchen_status(
        &self,
        round_id: &str,
        status: &str,
    ) -> DbResult<OrderRound> {
        let status: KitchenStatus = status.parse()?;
        self.set_round_kitchen_status(round_id, status).await
    }

    pub async fn set_round_kitchen_status(
        &self,
        round_id: &str,
        status: KitchenStatus,
    ) -> DbResult<OrderRound> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let round = self
            .bills
            .set_kitchen_status(&mut uow, round_id, status)
            .await?;
        uow.commit().await?;

        info!(round_id = %round_id, bill_id = %round.bill_id, status = %status, "Kitchen status updated");
        Ok(round)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_bill(&self, bill_id: &str) -> DbResult<BillView> {
        self.bills.get_view(bill_id).await
    }

    pub async fn open_bill_for_table(&self, table_id: &str) -> DbResult<Option<BillView>> {
        self.bills.open_for_table(table_id).await
    }

    pub async fn list_bills(&self, status: Option<BillStatus>) -> DbResult<Vec<OrderBill>> {
        self.bills.list(status).await
    }
}
