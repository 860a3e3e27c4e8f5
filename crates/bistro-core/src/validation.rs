//! # Validation Module
//!
//! Input validation that runs before any engine opens a unit of work.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (shape of the request)                           │
//! │  ├── ids present and well-formed                                       │
//! │  ├── quantities positive and bounded                                   │
//! │  └── names / phones / emails non-empty                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine, inside the unit of work (state of the world)         │
//! │  ├── referenced rows exist, items priced, stock sufficient             │
//! │  └── bill / PO / table status allows the change                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0), one open bill per table                    │
//! │  └── UNIQUE / FOREIGN KEY constraints                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bistro_core::validation::{validate_quantity, OrderLimits};
//!
//! let limits = OrderLimits::default();
//! assert!(validate_quantity(5, &limits).is_ok());
//! assert!(validate_quantity(0, &limits).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::order::{AddItemsRequest, LineItemRef};
use crate::purchase::CreatePurchaseOrderRequest;
use crate::table::CreateReservationRequest;
use crate::types::{NewCustomer, NewDrink, NewProductUnit};
use crate::{DEFAULT_MAX_LINES_PER_ROUND, DEFAULT_MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Limits
// =============================================================================

/// Bounds applied to order rounds. Loaded from the `[orders]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLimits {
    pub max_lines_per_round: usize,
    pub max_line_quantity: i64,
}

impl Default for OrderLimits {
    fn default() -> Self {
        OrderLimits {
            max_lines_per_round: DEFAULT_MAX_LINES_PER_ROUND,
            max_line_quantity: DEFAULT_MAX_LINE_QUANTITY,
        }
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (drink, food, unit, supplier, person).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a phone number used to match customers.
///
/// ## Rules
/// - 6 to 20 characters
/// - Digits, spaces, `+`, `-`, `(`, `)` only
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));

    if !allowed || !(6..=20).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain 6-20 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an employee email.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        }),
    }
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID identifier.
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_id;
///
/// assert!(validate_id("table_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_id("table_id", "not-a-uuid").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `limits.max_line_quantity`
pub fn validate_quantity(qty: i64, limits: &OrderLimits) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > limits.max_line_quantity {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: limits.max_line_quantity,
        });
    }

    Ok(())
}

/// Validates a catalog price or cost in cents. Zero is allowed here; the
/// order engine separately refuses to sell unpriced items.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a product unit conversion factor.
pub fn validate_base_items_count(count: i64) -> ValidationResult<()> {
    if count < 1 {
        return Err(ValidationError::MustBePositive {
            field: "base_items_count".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates the shape of an `add_items_to_bill` request.
///
/// ## User Workflow
/// ```text
/// Waiter submits round for table 5
///      │
///      ▼
/// validate_add_items ← THIS FUNCTION (no database access)
///      │
///      ├── missing/malformed ids?   → InvalidInput
///      ├── no items / too many?     → InvalidInput
///      ├── quantity ≤ 0 or > max?   → InvalidInput
///      │
///      ▼
/// OrderEngine opens the unit of work
/// ```
pub fn validate_add_items(request: &AddItemsRequest, limits: &OrderLimits) -> CoreResult<()> {
    validate_id("employee_id", &request.employee_id)?;
    validate_id("table_id", &request.table_id)?;

    if request.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        }
        .into());
    }

    if request.items.len() > limits.max_lines_per_round {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: limits.max_lines_per_round,
        }
        .into());
    }

    for line in &request.items {
        match &line.item {
            LineItemRef::Food { food_id } => validate_id("food_id", food_id)?,
            LineItemRef::ProductUnit { product_unit_id } => {
                validate_id("product_unit_id", product_unit_id)?
            }
        }
        validate_quantity(line.quantity, limits)?;
    }

    Ok(())
}

/// Validates a purchase order request.
pub fn validate_purchase_order(request: &CreatePurchaseOrderRequest) -> CoreResult<()> {
    validate_id("supplier_id", &request.supplier_id)?;

    for line in &request.details {
        line.validate()?;
        validate_id("product_unit_id", &line.product_unit_id)?;
    }

    Ok(())
}

pub fn validate_new_drink(drink: &NewDrink) -> CoreResult<()> {
    validate_name("name", &drink.name)?;
    validate_id("unit_id", &drink.unit_id)?;
    if let Some(category_id) = &drink.category_id {
        validate_id("category_id", category_id)?;
    }
    validate_price_cents("price", drink.price_cents)?;
    if drink.initial_quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "initial_quantity".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }
    Ok(())
}

pub fn validate_new_product_unit(unit: &NewProductUnit) -> CoreResult<()> {
    validate_id("drink_id", &unit.drink_id)?;
    validate_name("name", &unit.name)?;
    validate_price_cents("price", unit.price_cents)?;
    validate_base_items_count(unit.base_items_count)?;
    Ok(())
}

pub fn validate_new_customer(customer: &NewCustomer) -> CoreResult<()> {
    validate_name("first_name", &customer.first_name)?;
    validate_name("last_name", &customer.last_name)?;
    validate_phone(&customer.phone)?;
    Ok(())
}

pub fn validate_reservation(request: &CreateReservationRequest) -> CoreResult<()> {
    validate_new_customer(&request.customer)?;
    validate_id("table_id", &request.table_id)?;
    if request.party_size <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "party_size".to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
