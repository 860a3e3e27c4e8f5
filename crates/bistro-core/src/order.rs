//! # Orders: Bills, Rounds, Line Items
//!
//! ## Aggregate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderBill (one OPEN per table)                                        │
//! │  ├── OrderRound #1  kitchen: served                                    │
//! │  │   ├── OrderDetail  2 × "Lager (bottle)"  @ 3.50                     │
//! │  │   └── OrderDetail  1 × "Fried rice"      @ 6.00                     │
//! │  └── OrderRound #2  kitchen: preparing                                 │
//! │      └── OrderDetail  1 × "Lager case"      @ 60.00                    │
//! │                                                                         │
//! │  total = Σ rounds Σ details (unit_price × quantity)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bill State Machine
//! ```text
//!            checkout_bill
//!   OPEN ─────────────────────► PAID       (terminal)
//!     │
//!     │      cancel_bill
//!     └───────────────────────► CANCELLED  (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::stock::StockDraw;

// =============================================================================
// Bill Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Accepting rounds.
    #[default]
    Open,
    /// Settled at checkout.
    Paid,
    /// Voided; stock was restored.
    Cancelled,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Open => "open",
            BillStatus::Paid => "paid",
            BillStatus::Cancelled => "cancelled",
        }
    }

    /// Status after checkout. Only an OPEN bill can be paid.
    pub fn checkout(self, bill_id: &str) -> CoreResult<BillStatus> {
        match self {
            BillStatus::Open => Ok(BillStatus::Paid),
            other => Err(CoreError::BillNotOpen {
                bill_id: bill_id.to_string(),
                status: other.to_string(),
            }),
        }
    }

    /// Status after cancellation.
    ///
    /// A paid bill reports `BillAlreadyPaid`; a cancelled one `BillNotOpen`.
    pub fn cancel(self, bill_id: &str) -> CoreResult<BillStatus> {
        match self {
            BillStatus::Open => Ok(BillStatus::Cancelled),
            BillStatus::Paid => Err(CoreError::BillAlreadyPaid {
                bill_id: bill_id.to_string(),
            }),
            BillStatus::Cancelled => Err(CoreError::BillNotOpen {
                bill_id: bill_id.to_string(),
                status: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Kitchen Status
// =============================================================================

/// Preparation status of one round.
///
/// Any recognised value may be set at any time; the kitchen display owns
/// the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum KitchenStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Served,
}

impl KitchenStatus {
    pub const ALL: [KitchenStatus; 4] = [
        KitchenStatus::Pending,
        KitchenStatus::Preparing,
        KitchenStatus::Ready,
        KitchenStatus::Served,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KitchenStatus::Pending => "pending",
            KitchenStatus::Preparing => "preparing",
            KitchenStatus::Ready => "ready",
            KitchenStatus::Served => "served",
        }
    }
}

impl fmt::Display for KitchenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KitchenStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        KitchenStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                ValidationError::NotAllowed {
                    field: "kitchen_status".to_string(),
                    allowed: KitchenStatus::ALL.iter().map(|k| k.to_string()).collect(),
                }
                .into()
            })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Bank transfer / QR payment.
    Transfer,
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" | "qr" | "bank_transfer" => Ok(PaymentMethod::Transfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec!["cash".into(), "card".into(), "transfer".into()],
            }
            .into()),
        }
    }
}

// =============================================================================
// Bill / Round / Detail records
// =============================================================================

/// The accumulating tab for one table.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderBill {
    pub id: String,
    pub table_id: String,
    /// Employee who last served the table.
    pub employee_id: String,
    pub total_cents: i64,
    pub status: BillStatus,
    /// Set at checkout.
    pub payment_method: Option<PaymentMethod>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Set when the bill is paid or cancelled.
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl OrderBill {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A batch of items submitted together.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderRound {
    pub id: String,
    pub bill_id: String,
    /// 1, 2, 3, ... per bill with no gaps.
    pub sequence_number: i64,
    pub kitchen_status: KitchenStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One line of a round. Exactly one of `food_id` / `product_unit_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderDetail {
    pub id: String,
    pub round_id: String,
    pub food_id: Option<String>,
    pub product_unit_id: Option<String>,
    pub quantity: i64,
    /// Catalog price captured when the round was placed.
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderDetail {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

/// A round with its details.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoundView {
    pub round: OrderRound,
    pub details: Vec<OrderDetail>,
}

/// A bill with every round and detail populated.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillView {
    pub bill: OrderBill,
    pub rounds: Vec<RoundView>,
}

impl BillView {
    /// Σ over all rounds and details of `unit_price × quantity`.
    pub fn computed_total(&self) -> Money {
        self.rounds
            .iter()
            .flat_map(|r| r.details.iter())
            .map(OrderDetail::line_total)
            .sum()
    }
}

// =============================================================================
// Requests
// =============================================================================

/// What a line item points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineItemRef {
    Food { food_id: String },
    ProductUnit { product_unit_id: String },
}

impl LineItemRef {
    pub fn id(&self) -> &str {
        match self {
            LineItemRef::Food { food_id } => food_id,
            LineItemRef::ProductUnit { product_unit_id } => product_unit_id,
        }
    }
}

/// One requested line. There is deliberately no price field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemRequest {
    pub item: LineItemRef,
    pub quantity: i64,
}

impl LineItemRequest {
    pub fn food(food_id: impl Into<String>, quantity: i64) -> Self {
        LineItemRequest {
            item: LineItemRef::Food {
                food_id: food_id.into(),
            },
            quantity,
        }
    }

    pub fn product_unit(product_unit_id: impl Into<String>, quantity: i64) -> Self {
        LineItemRequest {
            item: LineItemRef::ProductUnit {
                product_unit_id: product_unit_id.into(),
            },
            quantity,
        }
    }
}

/// Flat line item as front ends tend to send it.
///
/// `price_cents` is accepted so old clients keep deserializing, and then
/// dropped: prices always come from the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RawLineItem {
    pub food_id: Option<String>,
    pub product_unit_id: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub price_cents: Option<i64>,
}

impl TryFrom<RawLineItem> for LineItemRequest {
    type Error = CoreError;

    fn try_from(raw: RawLineItem) -> Result<Self, Self::Error> {
        let food = raw.food_id.filter(|id| !id.trim().is_empty());
        let unit = raw.product_unit_id.filter(|id| !id.trim().is_empty());

        match (food, unit) {
            (Some(food_id), None) => Ok(LineItemRequest::food(food_id, raw.quantity)),
            (None, Some(unit_id)) => Ok(LineItemRequest::product_unit(unit_id, raw.quantity)),
            (Some(_), Some(_)) => Err(CoreError::invalid(
                "line item must reference either a food or a product unit, not both",
            )),
            (None, None) => Err(CoreError::invalid(
                "line item must reference a food or a product unit",
            )),
        }
    }
}

/// Input of `add_items_to_bill`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddItemsRequest {
    pub employee_id: String,
    pub table_id: String,
    pub items: Vec<LineItemRequest>,
}

// =============================================================================
// Priced lines
// =============================================================================

/// A requested line after re-pricing against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub item: LineItemRef,
    pub quantity: i64,
    pub unit_price: Money,
    /// Set for product units; foods draw no stock.
    pub stock: Option<StockDraw>,
}

impl PricedLine {
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price
            .checked_times(self.quantity)
            .ok_or_else(|| CoreError::invalid("line total is too large"))
    }
}

/// Total of a round's priced lines.
pub fn round_total(lines: &[PricedLine]) -> CoreResult<Money> {
    lines.iter().try_fold(Money::zero(), |acc, line| {
        acc.checked_add(line.line_total()?)
            .ok_or_else(|| CoreError::invalid("round total is too large"))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
