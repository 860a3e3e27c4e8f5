//! # Repository Module
//!
//! Database repository implementations for Bistro POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Engine (OrderEngine, PurchasingEngine, ReservationEngine)             │
//! │       │                                                                 │
//! │       │  let mut uow = UnitOfWork::begin(&pool).await?;                │
//! │       │  bills.lock_bill(&mut uow, id)                                 │
//! │       │  ledger.reserve(&mut uow, &demand, round_id)                   │
//! │       │  uow.commit()                                                  │
//! │       ▼                                                                 │
//! │  Repositories                                                          │
//! │  ├── reads:  &self            → run on the pool                        │
//! │  └── writes: &mut UnitOfWork  → run inside the caller's transaction    │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads that must see the transaction's own writes (or must not take a
//! second pooled connection) have an `_in` variant taking the unit of work.
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`] - Units, categories, drinks, product units, foods
//! - [`InventoryLedger`] - Stock increments/decrements and movement history
//! - [`BillRepository`] - Order bills, rounds and details
//! - [`PurchaseRepository`] - Purchase orders and import receipts
//! - [`TableRepository`] - Dining tables and their status
//! - [`DirectoryRepository`] - Employees, suppliers, customers
//! - [`ReservationRepository`] - Reservations
//! - [`ReportRepository`] - Read-only aggregates

use uuid::Uuid;

pub mod bill;
pub mod catalog;
pub mod directory;
pub mod inventory;
pub mod purchase;
pub mod report;
pub mod reservation;
pub mod table;

pub use bill::BillRepository;
pub use catalog::CatalogRepository;
pub use directory::DirectoryRepository;
pub use inventory::InventoryLedger;
pub use purchase::PurchaseRepository;
pub use report::ReportRepository;
pub use reservation::ReservationRepository;
pub use table::TableRepository;

/// Generates a new entity id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
