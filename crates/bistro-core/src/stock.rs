//! # Stock Demand
//!
//! Turns line items into per-drink base-unit quantities and checks them
//! against stock on hand.
//!
//! ## Aggregation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Round:                                                                 │
//! │    1 × "Lager case"    (×24)  ─┐                                        │
//! │    2 × "Lager (bottle)" (×1)  ─┼──► lager: 1×24 + 2×1 = 26             │
//! │    1 × "Cola can"       (×1)  ─┴──► cola:  1                           │
//! │    1 × "Fried rice"   (food)  ────► (no stock)                         │
//! │                                                                         │
//! │  Every drink is checked before anything is written, so a single        │
//! │  shortfall fails the whole round.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::order::PricedLine;

/// How one sold or received unit maps onto inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDraw {
    pub drink_id: String,
    pub base_items_count: i64,
}

/// Current on-hand stock of one drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub drink_id: String,
    pub name: String,
    pub quantity: i64,
}

// =============================================================================
// Requirements
// =============================================================================

/// Base-unit quantity per drink id.
///
/// Backed by a `BTreeMap` so iteration order (and therefore the order rows
/// are touched in) is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockRequirements {
    by_drink: BTreeMap<String, i64>,
}

impl StockRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity × base_items_count` base units of a drink.
    pub fn add(&mut self, drink_id: &str, quantity: i64, base_items_count: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::invalid("quantity must be positive"));
        }
        if base_items_count < 1 {
            return Err(CoreError::invalid(format!(
                "base items count for drink {} must be at least 1",
                drink_id
            )));
        }

        let units = quantity
            .checked_mul(base_items_count)
            .ok_or_else(|| CoreError::invalid("stock quantity is too large"))?;
        let slot = self.by_drink.entry(drink_id.to_string()).or_insert(0);
        *slot = slot
            .checked_add(units)
            .ok_or_else(|| CoreError::invalid("stock quantity is too large"))?;
        Ok(())
    }

    /// Demand of the product-unit lines of a round. Foods are skipped.
    pub fn from_lines(lines: &[PricedLine]) -> CoreResult<Self> {
        let mut requirements = Self::new();
        for line in lines {
            if let Some(draw) = &line.stock {
                requirements.add(&draw.drink_id, line.quantity, draw.base_items_count)?;
            }
        }
        Ok(requirements)
    }

    /// Base units required for a drink (0 when not required).
    pub fn get(&self, drink_id: &str) -> i64 {
        self.by_drink.get(drink_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_drink.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_drink.len()
    }

    pub fn drink_ids(&self) -> impl Iterator<Item = &str> {
        self.by_drink.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.by_drink.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    /// Checks every requirement against the given levels.
    ///
    /// Fails with `NotFound` for a drink that has no level and with
    /// `StockInsufficient` for the first drink that is short.
    pub fn check_against(&self, levels: &[StockLevel]) -> CoreResult<()> {
        for (drink_id, requested) in self.iter() {
            let level = levels
                .iter()
                .find(|l| l.drink_id == drink_id)
                .ok_or_else(|| CoreError::not_found("Drink", drink_id))?;

            if level.quantity < requested {
                return Err(CoreError::StockInsufficient {
                    drink_id: drink_id.to_string(),
                    name: level.name.clone(),
                    available: level.quantity,
                    requested,
                    shortfall: requested - level.quantity,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Ledger movements
// =============================================================================

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockMovementReason {
    InitialStock,
    OrderPlaced,
    OrderCancelled,
    PurchaseReceived,
    Adjustment,
}

/// One signed change of a drink's stock.
///
/// The movements of a drink always sum to its on-hand quantity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub drink_id: String,
    /// Negative for decrements.
    pub delta: i64,
    pub reason: StockMovementReason,
    /// Round, bill or import receipt that caused the movement.
    pub reference_id: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::money::Money;
    use crate::order::LineItemRef;

    fn level(id: &str, qty: i64) -> StockLevel {
        StockLevel {
            drink_id: id.to_string(),
            name: id.to_uppercase(),
            quantity: qty,
        }
    }

    fn unit_line(unit: &str, drink: &str, qty: i64, base: i64) -> PricedLine {
        PricedLine {
            item: LineItemRef::ProductUnit {
                product_unit_id: unit.to_string(),
            },
            quantity: qty,
            unit_price: Money::from_cents(100),
            stock: Some(StockDraw {
                drink_id: drink.to_string(),
                base_items_count: base,
            }),
        }
    }

    #[test]
    fn test_aggregates_across_units_of_same_drink() {
        let lines = vec![
            unit_line("case", "lager", 1, 24),
            unit_line("bottle", "lager", 2, 1),
            unit_line("can", "cola", 1, 1),
            PricedLine {
                item: LineItemRef::Food { food_id: "rice".into() },
                quantity: 4,
                unit_price: Money::from_cents(500),
                stock: None,
            },
        ];

        let demand = StockRequirements::from_lines(&lines).unwrap();
        assert_eq!(demand.len(), 2);
        assert_eq!(demand.get("lager"), 26);
        assert_eq!(demand.get("cola"), 1);
        assert_eq!(demand.get("rice"), 0);
    }

    #[test]
    fn test_check_reports_shortfall() {
        let mut demand = StockRequirements::new();
        demand.add("lager", 2, 1).unwrap();

        let err = demand.check_against(&[level("lager", 1)]).unwrap_err();
        match err {
            CoreError::StockInsufficient {
                drink_id,
                available,
                requested,
                shortfall,
                ..
            } => {
                assert_eq!(drink_id, "lager");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
                assert_eq!(shortfall, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(demand.check_against(&[level("lager", 2)]).is_ok());
    }

    #[test]
    fn test_missing_level_is_not_found() {
        let mut demand = StockRequirements::new();
        demand.add("ghost", 1, 1).unwrap();
        let err = demand.check_against(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemNotFound);
    }

    #[test]
    fn test_rejects_bad_factors_and_overflow() {
        let mut demand = StockRequirements::new();
        assert!(demand.add("d", 0, 1).is_err());
        assert!(demand.add("d", 1, 0).is_err());
        assert!(demand.add("d", i64::MAX, 2).is_err());
        assert!(demand.is_empty());
    }
}
