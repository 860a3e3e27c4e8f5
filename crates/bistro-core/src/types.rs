//! # Catalog and Directory Types
//!
//! Records the order and purchasing engines reference by id.
//!
//! ## Catalog Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Unit ("bottle")          Category ("Beer")                           │
//! │      ▲                        ▲                                         │
//! │      │                        │                                         │
//! │   ┌──┴────────────────────────┴──┐        ┌────────────────────────┐   │
//! │   │ Drink "Lager"  quantity: 40  │◄───────│ ProductUnit            │   │
//! │   │ (inventory item, base units) │        │ "Lager (bottle)" ×1    │   │
//! │   └──────────────────────────────┘        │ "Lager case"     ×24   │   │
//! │                                           └────────────────────────┘   │
//! │   Food "Fried rice"  (no stock, unlimited availability)                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity carries a UUID v4 `id` generated by the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Units & Categories
// =============================================================================

/// A base unit a drink is counted in ("bottle", "can", "glass").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Unit {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A menu category shared by drinks and foods.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Drink (inventory item)
// =============================================================================

/// An inventory-tracked drink.
///
/// `quantity` is counted in base units and is only ever changed by the
/// inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Drink {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,
    pub unit_id: String,
    /// On-hand stock in base units.
    pub quantity: i64,
    pub image_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a drink together with its default single unit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDrink {
    pub name: String,
    pub category_id: Option<String>,
    pub unit_id: String,
    /// Price of one base unit, used for the default product unit.
    pub price_cents: i64,
    #[serde(default)]
    pub initial_quantity: i64,
    pub image_url: Option<String>,
}

/// Partial update of a drink's descriptive fields. `None` leaves the field
/// unchanged. Stock is not part of it; quantities move through the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrinkUpdate {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub unit_id: Option<String>,
}

// =============================================================================
// Product Unit
// =============================================================================

/// A sellable (and purchasable) packaging of a drink.
///
/// ## Conversion
/// Selling `n` of this unit consumes `n × base_items_count` base units of
/// `drink_id`. Receiving `n` of it on a purchase order adds the same amount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductUnit {
    pub id: String,
    pub drink_id: String,
    pub name: String,
    pub price_cents: i64,
    /// Base units represented by one of this unit (≥ 1).
    pub base_items_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ProductUnit {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Input for creating an additional product unit on an existing drink.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProductUnit {
    pub drink_id: String,
    pub name: String,
    pub price_cents: i64,
    pub base_items_count: i64,
}

/// Partial update of a product unit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUnitUpdate {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    /// Only accepted while no order or purchase order references the unit.
    pub base_items_count: Option<i64>,
}

/// Display name of the default single unit created with a drink.
pub fn default_unit_name(drink_name: &str, base_unit_name: &str) -> String {
    format!("{} ({})", drink_name.trim(), base_unit_name.trim())
}

// =============================================================================
// Food
// =============================================================================

/// A kitchen-prepared menu item. Foods carry no stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Food {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,
    pub price_cents: i64,
    /// Taken off the menu when false; the order engine rejects it.
    pub is_available: bool,
    pub image_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Food {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewFood {
    pub name: String,
    pub category_id: Option<String>,
    pub price_cents: i64,
    pub image_url: Option<String>,
}

// =============================================================================
// Employees
// =============================================================================

/// Role resolved by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    Admin,
    Manager,
    Staff,
}

/// A member of staff orders are attributed to.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: EmployeeRole,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub role: EmployeeRole,
}

// =============================================================================
// Suppliers & Customers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A guest known by phone number.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Unique across customers.
    pub phone: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
