//! # Engines
//!
//! Operations that change more than one aggregate at once. Each public call
//! opens exactly one [`UnitOfWork`](crate::UnitOfWork), takes the lock of the
//! aggregate it serializes on, drives the repositories, and commits.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engine               Aggregate lock        Touches                    │
//! │  ──────               ──────────────        ───────                    │
//! │  OrderEngine          dining_tables row     bills, rounds, details,    │
//! │                       order_bills row       drinks, stock_movements,   │
//! │                                             table status               │
//! │  PurchasingEngine     purchase_orders row   PO details, receipts,      │
//! │                                             drinks, stock_movements    │
//! │  ReservationEngine    dining_tables row     customers, reservations,   │
//! │                       reservations row      table status               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any `?` between `begin` and `commit` drops the unit of work, which rolls
//! every write of the call back.

pub mod order;
pub mod purchasing;
pub mod reservation;

pub use order::OrderEngine;
pub use purchasing::PurchasingEngine;
pub use reservation::ReservationEngine;
