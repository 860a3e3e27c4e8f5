//! # bistro-core: Pure Domain Logic for Bistro POS
//!
//! This crate holds the rules of the restaurant floor as pure functions with
//! zero I/O dependencies. Everything that touches SQLite lives in `bistro-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bistro POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              API layer (HTTP / IPC, not in this tree)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          bistro-db engines (one unit of work per call)          │   │
//! │  │   OrderEngine • PurchasingEngine • ReservationEngine            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ uses                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bistro-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  order  │ │  stock  │ │ purchase │ │  table  │ │ money  │  │   │
//! │  │   │  Bill   │ │ Demand  │ │    PO    │ │ Tracker │ │ cents  │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog and directory records (Drink, ProductUnit, Food, ...)
//! - [`order`] - Bills, rounds, line items and the bill state machine
//! - [`stock`] - Per-drink stock demand aggregation and ledger movements
//! - [`purchase`] - Purchase orders, totals, receiving lines
//! - [`table`] - Dining tables, the table status tracker, reservations
//! - [`report`] - Read-only aggregation results
//! - [`money`] - Integer-cent money
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bistro_core::stock::StockRequirements;
//!
//! // A case of 24 and two singles of the same beer
//! let mut demand = StockRequirements::new();
//! demand.add("beer", 1, 24).unwrap();
//! demand.add("beer", 2, 1).unwrap();
//! assert_eq!(demand.get("beer"), 26);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order;
pub mod purchase;
pub mod report;
pub mod stock;
pub mod table;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use order::*;
pub use purchase::*;
pub use report::*;
pub use stock::*;
pub use table::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items accepted in a single round.
///
/// ## Business Reason
/// Keeps one round to something a kitchen ticket can hold.
/// Overridable through `[orders]` in the config file.
pub const DEFAULT_MAX_LINES_PER_ROUND: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 100 instead of 10)
pub const DEFAULT_MAX_LINE_QUANTITY: i64 = 999;
