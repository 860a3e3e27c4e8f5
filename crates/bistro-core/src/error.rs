//! # Error Types
//!
//! Domain-specific error types for bistro-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bistro-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Closed set of kinds callers branch on          │
//! │                                                                         │
//! │  bistro-db errors (separate crate)                                     │
//! │  └── DbError          - Wraps CoreError + storage failures             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → API layer               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, quantities, status)
//! 3. Callers match on [`ErrorKind`], never on message text

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// The closed set of failure kinds an engine operation can report.
///
/// Every [`CoreError`] (and every `DbError` in bistro-db) maps onto exactly
/// one kind, so an API layer can pick a status code without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ItemNotFound,
    InvalidInput,
    StockInsufficient,
    BillNotOpen,
    BillAlreadyPaid,
    TableUnavailable,
    PoAlreadyApproved,
    PoNotFound,
    PoNoDetails,
    PoLocked,
    RoundNotFound,
    Conflict,
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors raised by bill, stock, purchasing and table rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    ///
    /// ## When This Occurs
    /// - Line item names a food or product unit that was never created
    /// - Unknown table, employee, supplier, drink, bill or reservation id
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Input is well-typed but not acceptable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough stock on hand for a drink.
    ///
    /// ## User Workflow
    /// ```text
    /// Round asks for 1 case (24) + 2 singles of Lager
    ///      │
    ///      ▼
    /// Demand: lager = 26, on hand = 20
    ///      │
    ///      ▼
    /// StockInsufficient { drink_id, available: 20, requested: 26, shortfall: 6 }
    ///      │
    ///      ▼
    /// Nothing written; waiter sees "Lager: 6 short"
    /// ```
    #[error("Insufficient stock for {name} ({drink_id}): available {available}, requested {requested}, short by {shortfall}")]
    StockInsufficient {
        drink_id: String,
        name: String,
        available: i64,
        requested: i64,
        shortfall: i64,
    },

    /// Bill is not OPEN, so it cannot be checked out or cancelled.
    #[error("Bill {bill_id} is {status}, expected open")]
    BillNotOpen { bill_id: String, status: String },

    /// Bill was already paid; paid bills are never cancelled.
    #[error("Bill {bill_id} is already paid")]
    BillAlreadyPaid { bill_id: String },

    /// Table is reserved or occupied.
    #[error("Table {table_id} is {status}")]
    TableUnavailable { table_id: String, status: String },

    /// Purchase order does not exist.
    #[error("Purchase order not found: {0}")]
    PurchaseOrderNotFound(String),

    /// Purchase order was approved before; stock was already credited.
    #[error("Purchase order {0} is already approved")]
    PurchaseOrderAlreadyApproved(String),

    /// Purchase order has nothing to receive.
    #[error("Purchase order {0} has no details")]
    PurchaseOrderNoDetails(String),

    /// Purchase order is approved or cancelled and can no longer be edited.
    #[error("Purchase order {po_id} is {status} and cannot be modified")]
    PurchaseOrderLocked { po_id: String, status: String },

    /// Kitchen round does not exist.
    #[error("Round not found: {0}")]
    RoundNotFound(String),

    /// Uniqueness or reference-in-use conflict.
    ///
    /// ## When This Occurs
    /// - Customer phone already registered
    /// - Changing `base_items_count` of a product unit already ordered
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A status change the state machine does not allow.
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidInput error.
    pub fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidInput(message.into())
    }

    /// Returns the kind this error is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::ItemNotFound,
            CoreError::InvalidInput(_)
            | CoreError::Validation(_)
            | CoreError::InvalidTransition { .. } => ErrorKind::InvalidInput,
            CoreError::StockInsufficient { .. } => ErrorKind::StockInsufficient,
            CoreError::BillNotOpen { .. } => ErrorKind::BillNotOpen,
            CoreError::BillAlreadyPaid { .. } => ErrorKind::BillAlreadyPaid,
            CoreError::TableUnavailable { .. } => ErrorKind::TableUnavailable,
            CoreError::PurchaseOrderNotFound(_) => ErrorKind::PoNotFound,
            CoreError::PurchaseOrderAlreadyApproved(_) => ErrorKind::PoAlreadyApproved,
            CoreError::PurchaseOrderNoDetails(_) => ErrorKind::PoNoDetails,
            CoreError::PurchaseOrderLocked { .. } => ErrorKind::PoLocked,
            CoreError::RoundNotFound(_) => ErrorKind::RoundNotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Raised before any statement touches the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid id, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Collection has too many entries.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Collection is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
