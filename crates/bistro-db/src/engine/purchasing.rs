//! # Purchasing Engine
//!
//! Purchase orders from creation to receiving.
//!
//! ## Lifecycle
//! ```text
//!                 add / update / delete detail (total recomputed)
//!                         ┌──────┐
//!                         ▼      │
//!   create ───────────► PENDING ─┘
//!                         │   │
//!            approve      │   │  cancel
//!   (receipt + stock in)  ▼   ▼
//!                  APPROVED   CANCELLED
//!
//!   Both end states lock the details (POLocked). Approving again fails with
//!   POAlreadyApproved before anything is written, so stock is credited once.
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use bistro_core::validation::validate_purchase_order;
use bistro_core::{
    ApprovalOutcome, CoreError, CreatePurchaseOrderRequest, ImportReceipt, ImportReceiptView,
    PurchaseLineRequest, PurchaseLineUpdate, PurchaseOrder, PurchaseOrderStatus,
    PurchaseOrderView, StockMovementReason,
};

use crate::error::{DbError, DbResult};
use crate::repository::directory::DirectoryRepository;
use crate::repository::inventory::InventoryLedger;
use crate::repository::purchase::PurchaseRepository;
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Clone)]
pub struct PurchasingEngine {
    pool: SqlitePool,
    purchases: PurchaseRepository,
    directory: DirectoryRepository,
    ledger: InventoryLedger,
}

impl PurchasingEngine {
    pub fn new(pool: SqlitePool) -> Self {
        PurchasingEngine {
            purchases: PurchaseRepository::new(pool.clone()),
            directory: DirectoryRepository::new(pool.clone()),
            ledger: InventoryLedger::new(pool.clone()),
            pool,
        }
    }

    /// Creates a pending purchase order with its details.
    ///
    /// The supplier and every product unit must exist. An order may start
    /// without details; it cannot be approved until it has some.
    pub async fn create_purchase_order(
        &self,
        request: &CreatePurchaseOrderRequest,
    ) -> DbResult<PurchaseOrderView> {
        validate_purchase_order(request)?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !self
            .directory
            .supplier_exists_in(&mut uow, &request.supplier_id)
            .await?
        {
            return Err(DbError::not_found("Supplier", &request.supplier_id));
        }

        let order = self
            .purchases
            .insert_order(&mut uow, &request.supplier_id, request.note.as_deref())
            .await?;

        for line in &request.details {
            self.ensure_product_unit(&mut uow, &line.product_unit_id).await?;
            self.purchases.insert_detail(&mut uow, &order.id, line).await?;
        }

        let total = self.purchases.recompute_total(&mut uow, &order.id).await?;
        let view = self.purchases.view_in(&mut uow, &order.id).await?;
        uow.commit().await?;

        info!(
            po_id = %order.id,
            supplier_id = %request.supplier_id,
            lines = request.details.len(),
            total = %total,
            "Purchase order created"
        );
        Ok(view)
    }

    /// Approves a pending order: one import receipt, one import detail per
    /// line, and each drink credited with `quantity × base_items_count`.
    ///
    /// ## Errors
    /// - `PONotFound` if the order does not exist
    /// - `POAlreadyApproved` if it was approved before (nothing is credited)
    /// - `POLocked` if it was cancelled
    /// - `PONoDetails` if it has no lines
    pub async fn approve_purchase_order(&self, po_id: &str) -> DbResult<ApprovalOutcome> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let order = self.purchases.lock_purchase_order(&mut uow, po_id).await?;
        let next = order.status.approve(po_id).inspect_err(|_| {
            warn!(po_id = %po_id, status = %order.status, "Approval refused");
        })?;

        let lines = self.purchases.receivable_lines(&mut uow, po_id).await?;
        if lines.is_empty() {
            return Err(CoreError::PurchaseOrderNoDetails(po_id.to_string()).into());
        }

        // Receipt total follows the details as they are now.
        let total = self.purchases.recompute_total(&mut uow, po_id).await?;
        let now = Utc::now();
        let receipt = self
            .purchases
            .insert_receipt(&mut uow, &order, total, &lines, now)
            .await?;

        for detail in &receipt.details {
            self.ledger
                .credit(
                    &mut uow,
                    &detail.drink_id,
                    detail.base_quantity,
                    StockMovementReason::PurchaseReceived,
                    Some(&receipt.receipt.id),
                    None,
                )
                .await?;
        }

        self.purchases
            .set_status(&mut uow, po_id, next, Some(now))
            .await?;
        let view = self.purchases.view_in(&mut uow, po_id).await?;
        uow.commit().await?;

        info!(
            po_id = %po_id,
            receipt_id = %receipt.receipt.id,
            lines = receipt.details.len(),
            total = %total,
            "Purchase order approved"
        );
        Ok(ApprovalOutcome {
            order: view,
            receipt,
        })
    }

    /// Cancels a pending order. Stock is untouched.
    pub async fn cancel_purchase_order(&self, po_id: &str) -> DbResult<PurchaseOrderView> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let order = self.purchases.lock_purchase_order(&mut uow, po_id).await?;
        let next = order.status.cancel(po_id).inspect_err(|_| {
            warn!(po_id = %po_id, status = %order.status, "Cancellation refused");
        })?;

        self.purchases.set_status(&mut uow, po_id, next, None).await?;
        let view = self.purchases.view_in(&mut uow, po_id).await?;
        uow.commit().await?;

        info!(po_id = %po_id, "Purchase order cancelled");
        Ok(view)
    }

    /// Status change by wire name.
    ///
    /// `approved` and `cancelled` dispatch to the matching operation.
    /// Asking for `pending` only succeeds when the order already is.
    pub async fn update_purchase_order_status(
        &self,
        po_id: &str,
        status: &str,
    ) -> DbResult<PurchaseOrderView> {
        match status.parse::<PurchaseOrderStatus>()? {
            PurchaseOrderStatus::Approved => Ok(self.approve_purchase_order(po_id).await?.order),
            PurchaseOrderStatus::Cancelled => self.cancel_purchase_order(po_id).await,
            PurchaseOrderStatus::Pending => {
                let view = self.purchases.get_view(po_id).await?;
                view.order.status.ensure_editable(po_id)?;
                Ok(view)
            }
        }
    }

    /// Deletes an order and its details. Approved orders are kept.
    pub async fn delete_purchase_order(&self, po_id: &str) -> DbResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let order = self.purchases.lock_purchase_order(&mut uow, po_id).await?;
        if order.status == PurchaseOrderStatus::Approved {
            return Err(CoreError::PurchaseOrderLocked {
                po_id: po_id.to_string(),
                status: order.status.to_string(),
            }
            .into());
        }

        self.purchases.delete_order(&mut uow, po_id).await?;
        uow.commit().await?;

        info!(po_id = %po_id, "Purchase order deleted");
        Ok(())
    }

    // =========================================================================
    // Details
    // =========================================================================

    pub async fn add_purchase_order_detail(
        &self,
        po_id: &str,
        line: &PurchaseLineRequest,
    ) -> DbResult<PurchaseOrderView> {
        line.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let order = self.purchases.lock_purchase_order(&mut uow, po_id).await?;
        order.status.ensure_editable(po_id)?;
        self.ensure_product_unit(&mut uow, &line.product_unit_id).await?;

        self.purchases.insert_detail(&mut uow, po_id, line).await?;
        self.finish_detail_change(uow, &order).await
    }

    /// Updates one line of a pending order and recomputes the total.
    pub async fn update_purchase_order_detail(
        &self,
        detail_id: &str,
        update: &PurchaseLineUpdate,
    ) -> DbResult<PurchaseOrderView> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let (order, detail) = self.purchases.lock_by_detail(&mut uow, detail_id).await?;
        order.status.ensure_editable(&order.id)?;

        let merged = update.apply_to(&detail)?;
        if merged.product_unit_id != detail.product_unit_id {
            self.ensure_product_unit(&mut uow, &merged.product_unit_id).await?;
        }

        self.purchases.update_detail(&mut uow, detail_id, &merged).await?;
        self.finish_detail_change(uow, &order).await
    }

    /// Removes one line of a pending order and recomputes the total.
    pub async fn delete_purchase_order_detail(&self, detail_id: &str) -> DbResult<PurchaseOrderView> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let (order, _) = self.purchases.lock_by_detail(&mut uow, detail_id).await?;
        order.status.ensure_editable(&order.id)?;

        self.purchases.delete_detail(&mut uow, detail_id).await?;
        self.finish_detail_change(uow, &order).await
    }

    async fn finish_detail_change(
        &self,
        mut uow: UnitOfWork,
        order: &PurchaseOrder,
    ) -> DbResult<PurchaseOrderView> {
        let total = self.purchases.recompute_total(&mut uow, &order.id).await?;
        let view = self.purchases.view_in(&mut uow, &order.id).await?;
        uow.commit().await?;

        info!(po_id = %order.id, lines = view.details.len(), total = %total, "Purchase order details changed");
        Ok(view)
    }

    async fn ensure_product_unit(&self, uow: &mut UnitOfWork, product_unit_id: &str) -> DbResult<()> {
        if self.purchases.product_unit_exists_in(uow, product_unit_id).await? {
            Ok(())
        } else {
            Err(DbError::not_found("ProductUnit", product_unit_id))
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_purchase_order(&self, po_id: &str) -> DbResult<PurchaseOrderView> {
        self.purchases.get_view(po_id).await
    }

    pub async fn list_purchase_orders(
        &self,
        status: Option<PurchaseOrderStatus>,
    ) -> DbResult<Vec<PurchaseOrder>> {
        self.purchases.list(status).await
    }

    pub async fn get_import_receipt(&self, receipt_id: &str) -> DbResult<ImportReceiptView> {
        self.purchases.get_receipt(receipt_id).await
    }

    pub async fn import_receipt_for_po(&self, po_id: &str) -> DbResult<Option<ImportReceiptView>> {
        self.purchases.receipt_for_order(po_id).await
    }

    pub async fn list_import_receipts(&self) -> DbResult<Vec<ImportReceipt>> {
        self.purchases.list_receipts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bistro_core::{ErrorKind, NewDrink, NewProductUnit, NewSupplier};

    async fn setup() -> (Database, String, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let unit = db.catalog().create_unit("can").await.unwrap();
        let (_, can) = db
            .catalog()
            .create_drink(&NewDrink {
                name: "Cola".into(),
                category_id: None,
                unit_id: unit.id,
                price_cents: 150,
                initial_quantity: 0,
                image_url: None,
            })
            .await
            .unwrap();
        let supplier = db
            .directory()
            .create_supplier(&NewSupplier {
                name: "Metro".into(),
                phone: None,
                address: None,
            })
            .await
            .unwrap();
        (db, supplier.id, can.id)
    }

    #[tokio::test]
    async fn test_unknown_supplier_is_not_found() {
        let (db, _, can_id) = setup().await;

        let err = db
            .purchasing()
            .create_purchase_order(&CreatePurchaseOrderRequest {
                supplier_id: crate::repository::new_id(),
                details: vec![PurchaseLineRequest {
                    product_unit_id: can_id,
                    quantity: 1,
                    unit_cost_cents: 80,
                }],
                note: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemNotFound);
        assert!(db.purchasing().list_purchase_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detail_edits_recompute_total() {
        let (db, supplier_id, can_id) = setup().await;
        let purchasing = db.purchasing();

        let created = purchasing
            .create_purchase_order(&CreatePurchaseOrderRequest {
                supplier_id,
                details: vec![PurchaseLineRequest {
                    product_unit_id: can_id.clone(),
                    quantity: 10,
                    unit_cost_cents: 80,
                }],
                note: Some("weekly".into()),
            })
            .await
            .unwrap();
        assert_eq!(created.order.total_cents, 800);

        let po_id = created.order.id.clone();
        let added = purchasing
            .add_purchase_order_detail(
                &po_id,
                &PurchaseLineRequest {
                    product_unit_id: can_id,
                    quantity: 2,
                    unit_cost_cents: 75,
                },
            )
            .await
            .unwrap();
        assert_eq!(added.order.total_cents, 800 + 150);

        let first = created.details[0].id.clone();
        let updated = purchasing
            .update_purchase_order_detail(
                &first,
                &PurchaseLineUpdate {
                    quantity: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.order.total_cents, 4 * 80 + 150);

        let after_delete = purchasing.delete_purchase_order_detail(&first).await.unwrap();
        assert_eq!(after_delete.details.len(), 1);
        assert_eq!(after_delete.order.total_cents, 150);
    }

    #[tokio::test]
    async fn test_status_dispatch() {
        let (db, supplier_id, can_id) = setup().await;
        let purchasing = db.purchasing();

        let po = purchasing
            .create_purchase_order(&CreatePurchaseOrderRequest {
                supplier_id,
                details: vec![PurchaseLineRequest {
                    product_unit_id: can_id,
                    quantity: 3,
                    unit_cost_cents: 80,
                }],
                note: None,
            })
            .await
            .unwrap();
        let po_id = po.order.id;

        let err = purchasing
            .update_purchase_order_status(&po_id, "shipped")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let cancelled = purchasing
            .update_purchase_order_status(&po_id, "cancelled")
            .await
            .unwrap();
        assert_eq!(cancelled.order.status, PurchaseOrderStatus::Cancelled);

        let err = purchasing
            .update_purchase_order_status(&po_id, "approved")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PoLocked);

        // Cancelled orders may still be deleted.
        purchasing.delete_purchase_order(&po_id).await.unwrap();
        let err = purchasing.get_purchase_order(&po_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PoNotFound);
    }
}
