//! # Report Results
//!
//! Read-only aggregates over committed bills and import receipts.
//! All windows are half-open: `from <= t < to`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// Reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportWindow {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<Self> {
        if to <= from {
            return Err(CoreError::invalid("report window must end after it starts"));
        }
        Ok(ReportWindow { from, to })
    }
}

/// Bill counts and revenue for a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub paid_bills: i64,
    pub cancelled_bills: i64,
    pub revenue_cents: i64,
}

impl SalesSummary {
    /// Average paid bill, zero when nothing was paid.
    pub fn average_bill(&self) -> Money {
        if self.paid_bills == 0 {
            return Money::zero();
        }
        Money::from_cents(self.revenue_cents / self.paid_bills)
    }
}

/// What an item line in the sales report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SoldItemKind {
    Food,
    ProductUnit,
}

/// Quantity and revenue of one food or product unit over paid bills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ItemSales {
    pub kind: SoldItemKind,
    pub item_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Revenue from paid bills against spend on received stock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IncomeExpense {
    pub income_cents: i64,
    pub expense_cents: i64,
}

impl IncomeExpense {
    pub fn net(&self) -> Money {
        Money::from_cents(self.income_cents - self.expense_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_must_be_ordered() {
        let now = Utc::now();
        assert!(ReportWindow::new(now, now).is_err());
        assert!(ReportWindow::new(now, now + Duration::hours(1)).is_ok());
    }

    #[test]
    fn test_derived_figures() {
        let summary = SalesSummary {
            paid_bills: 4,
            cancelled_bills: 1,
            revenue_cents: 10_000,
        };
        assert_eq!(summary.average_bill().cents(), 2_500);
        assert_eq!(SalesSummary::default().average_bill(), Money::zero());

        let ie = IncomeExpense {
            income_cents: 10_000,
            expense_cents: 12_500,
        };
        assert_eq!(ie.net().cents(), -2_500);
    }
}
