//! # Purchasing & Receiving
//!
//! ## Purchase Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_purchase_order ──► PENDING ◄── add / update / delete details   │
//! │                              │  │        (total recomputed each time)   │
//! │             approve          │  │  cancel                               │
//! │   ┌──────────────────────────┘  └──────────────┐                        │
//! │   ▼                                            ▼                        │
//! │  APPROVED  ── stock += qty × base_items_count  CANCELLED                │
//! │            ── exactly one ImportReceipt                                 │
//! │                                                                         │
//! │  APPROVED and CANCELLED are locked: details can no longer change.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    #[default]
    Pending,
    Approved,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Approved => "approved",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    /// Details may only change while the order is pending.
    pub fn ensure_editable(self, po_id: &str) -> CoreResult<()> {
        match self {
            PurchaseOrderStatus::Pending => Ok(()),
            other => Err(CoreError::PurchaseOrderLocked {
                po_id: po_id.to_string(),
                status: other.to_string(),
            }),
        }
    }

    /// Status after approval. Approving twice is an error, never a second credit.
    pub fn approve(self, po_id: &str) -> CoreResult<PurchaseOrderStatus> {
        match self {
            PurchaseOrderStatus::Pending => Ok(PurchaseOrderStatus::Approved),
            PurchaseOrderStatus::Approved => {
                Err(CoreError::PurchaseOrderAlreadyApproved(po_id.to_string()))
            }
            PurchaseOrderStatus::Cancelled => Err(CoreError::PurchaseOrderLocked {
                po_id: po_id.to_string(),
                status: self.to_string(),
            }),
        }
    }

    /// Status after cancellation.
    pub fn cancel(self, po_id: &str) -> CoreResult<PurchaseOrderStatus> {
        match self {
            PurchaseOrderStatus::Pending => Ok(PurchaseOrderStatus::Cancelled),
            PurchaseOrderStatus::Approved => {
                Err(CoreError::PurchaseOrderAlreadyApproved(po_id.to_string()))
            }
            PurchaseOrderStatus::Cancelled => Err(CoreError::PurchaseOrderLocked {
                po_id: po_id.to_string(),
                status: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PurchaseOrderStatus::Pending),
            "approved" | "confirmed" => Ok(PurchaseOrderStatus::Approved),
            "cancelled" | "canceled" => Ok(PurchaseOrderStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["pending".into(), "approved".into(), "cancelled".into()],
            }
            .into()),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    pub supplier_id: String,
    /// Always Σ detail.unit_cost × detail.quantity of the current details.
    pub total_cents: i64,
    pub status: PurchaseOrderStatus,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrderDetail {
    pub id: String,
    pub purchase_order_id: String,
    pub product_unit_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrderDetail {
    pub fn line_cost(&self) -> CoreResult<Money> {
        Money::from_cents(self.unit_cost_cents)
            .checked_times(self.quantity)
            .ok_or_else(|| CoreError::invalid("purchase line cost is too large"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrderView {
    pub order: PurchaseOrder,
    pub details: Vec<PurchaseOrderDetail>,
}

/// Recomputes a purchase order total from its details.
pub fn purchase_total(details: &[PurchaseOrderDetail]) -> CoreResult<Money> {
    details.iter().try_fold(Money::zero(), |acc, d| {
        acc.checked_add(d.line_cost()?)
            .ok_or_else(|| CoreError::invalid("purchase order total is too large"))
    })
}

// =============================================================================
// Requests
// =============================================================================

/// One line of a purchase order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLineRequest {
    pub product_unit_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl PurchaseLineRequest {
    pub fn validate(&self) -> CoreResult<()> {
        if self.product_unit_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_unit_id".to_string(),
            }
            .into());
        }
        if self.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        if self.unit_cost_cents < 0 {
            return Err(CoreError::invalid("unit cost cannot be negative"));
        }
        Ok(())
    }
}

/// Partial update of a pending purchase order line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLineUpdate {
    pub product_unit_id: Option<String>,
    pub quantity: Option<i64>,
    pub unit_cost_cents: Option<i64>,
}

impl PurchaseLineUpdate {
    /// Applies the update on top of an existing detail.
    pub fn apply_to(&self, detail: &PurchaseOrderDetail) -> CoreResult<PurchaseLineRequest> {
        let merged = PurchaseLineRequest {
            product_unit_id: self
                .product_unit_id
                .clone()
                .unwrap_or_else(|| detail.product_unit_id.clone()),
            quantity: self.quantity.unwrap_or(detail.quantity),
            unit_cost_cents: self.unit_cost_cents.unwrap_or(detail.unit_cost_cents),
        };
        merged.validate()?;
        Ok(merged)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: String,
    pub details: Vec<PurchaseLineRequest>,
    pub note: Option<String>,
}

// =============================================================================
// Receiving
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[default]
    Completed,
}

/// Record of stock actually received for one approved purchase order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ImportReceipt {
    pub id: String,
    pub supplier_id: String,
    pub purchase_order_id: String,
    pub total_cents: i64,
    pub status: ImportStatus,
    #[ts(as = "String")]
    pub imported_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ImportDetail {
    pub id: String,
    pub receipt_id: String,
    pub drink_id: String,
    pub product_unit_id: String,
    /// Quantity in purchased units (cases, crates, ...).
    pub purchased_quantity: i64,
    /// Quantity credited to stock, in base units.
    pub base_quantity: i64,
    pub unit_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportReceiptView {
    pub receipt: ImportReceipt,
    pub details: Vec<ImportDetail>,
}

/// Result of a successful approval.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApprovalOutcome {
    pub order: PurchaseOrderView,
    pub receipt: ImportReceiptView,
}

/// A purchase order detail resolved against its product unit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReceivableLine {
    pub detail_id: String,
    pub product_unit_id: String,
    pub drink_id: String,
    pub quantity: i64,
    pub base_items_count: i64,
    pub unit_cost_cents: i64,
}

impl ReceivableLine {
    /// Base units this line credits: `quantity × base_items_count`.
    pub fn base_quantity(&self) -> CoreResult<i64> {
        if self.base_items_count < 1 {
            return Err(CoreError::invalid(format!(
                "product unit {} has no valid base items count",
                self.product_unit_id
            )));
        }
        self.quantity
            .checked_mul(self.base_items_count)
            .ok_or_else(|| CoreError::invalid("received quantity is too large"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn detail(qty: i64, cost: i64) -> PurchaseOrderDetail {
        PurchaseOrderDetail {
            id: format!("d-{qty}-{cost}"),
            purchase_order_id: "po".into(),
            product_unit_id: "u".into(),
            quantity: qty,
            unit_cost_cents: cost,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_purchase_total() {
        let details = vec![detail(3, 4800), detail(10, 150)];
        assert_eq!(purchase_total(&details).unwrap().cents(), 3 * 4800 + 1500);
        assert_eq!(purchase_total(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_approve_transitions() {
        assert_eq!(
            PurchaseOrderStatus::Pending.approve("po").unwrap(),
            PurchaseOrderStatus::Approved
        );
        assert_eq!(
            PurchaseOrderStatus::Approved.approve("po").unwrap_err().kind(),
            ErrorKind::PoAlreadyApproved
        );
        assert_eq!(
            PurchaseOrderStatus::Cancelled.approve("po").unwrap_err().kind(),
            ErrorKind::PoLocked
        );
    }

    #[test]
    fn test_only_pending_is_editable() {
        assert!(PurchaseOrderStatus::Pending.ensure_editable("po").is_ok());
        for status in [PurchaseOrderStatus::Approved, PurchaseOrderStatus::Cancelled] {
            assert_eq!(
                status.ensure_editable("po").unwrap_err().kind(),
                ErrorKind::PoLocked
            );
        }
    }

    #[test]
    fn test_line_update_merges_and_validates() {
        let existing = detail(3, 100);
        let update = PurchaseLineUpdate {
            quantity: Some(5),
            ..Default::default()
        };
        let merged = update.apply_to(&existing).unwrap();
        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.unit_cost_cents, 100);

        let bad = PurchaseLineUpdate {
            quantity: Some(0),
            ..Default::default()
        };
        assert!(bad.apply_to(&existing).is_err());
    }

    #[test]
    fn test_receivable_base_quantity() {
        let line = ReceivableLine {
            detail_id: "d".into(),
            product_unit_id: "case".into(),
            drink_id: "lager".into(),
            quantity: 3,
            base_items_count: 6,
            unit_cost_cents: 900,
        };
        assert_eq!(line.base_quantity().unwrap(), 18);
    }

    #[test]
    fn test_status_parse_accepts_confirmed() {
        assert_eq!(
            "confirmed".parse::<PurchaseOrderStatus>().unwrap(),
            PurchaseOrderStatus::Approved
        );
        assert!("shipped".parse::<PurchaseOrderStatus>().is_err());
    }
}
