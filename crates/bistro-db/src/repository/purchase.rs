//! # Purchase Repository
//!
//! Purchase orders, their details, and the import receipts written when an
//! order is approved.
//!
//! ## Receiving
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  purchase_order_details          product_units           import_details │
//! │  ──────────────────────          ─────────────           ────────────── │
//! │  "Lager case" × 3 @ 5000  ──►   base_items_count 6  ──►  purchased 3    │
//! │                                  drink lager              base 18       │
//! │  "Cola (can)" × 10 @ 80   ──►   base_items_count 1  ──►  purchased 10   │
//! │                                  drink cola               base 10       │
//! │                                                                         │
//! │  import_receipts.purchase_order_id is UNIQUE: one receipt per order.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use bistro_core::{
    purchase_total, CoreError, ImportDetail, ImportReceipt, ImportReceiptView, ImportStatus,
    Money, PurchaseLineRequest, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderStatus,
    PurchaseOrderView, ReceivableLine,
};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_view(&self, po_id: &str) -> DbResult<PurchaseOrderView> {
        let mut conn = self.pool.acquire().await?;
        load_view(&mut conn, po_id).await
    }

    /// Lists purchase orders, newest first.
    pub async fn list(&self, status: Option<PurchaseOrderStatus>) -> DbResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT id, supplier_id, total_cents, status, note, created_at, updated_at, approved_at
            FROM purchase_orders
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn get_receipt(&self, receipt_id: &str) -> DbResult<ImportReceiptView> {
        let mut conn = self.pool.acquire().await?;
        let receipt = sqlx::query_as::<_, ImportReceipt>(
            r#"
            SELECT id, supplier_id, purchase_order_id, total_cents, status, imported_at, created_at
            FROM import_receipts WHERE id = ?1
            "#,
        )
        .bind(receipt_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("ImportReceipt", receipt_id))?;

        load_receipt_view(&mut conn, receipt).await
    }

    /// The receipt of an approved purchase order, if it has one.
    pub async fn receipt_for_order(&self, po_id: &str) -> DbResult<Option<ImportReceiptView>> {
        let mut conn = self.pool.acquire().await?;
        let receipt = sqlx::query_as::<_, ImportReceipt>(
            r#"
            SELECT id, supplier_id, purchase_order_id, total_cents, status, imported_at, created_at
            FROM import_receipts WHERE purchase_order_id = ?1
            "#,
        )
        .bind(po_id)
        .fetch_optional(&mut *conn)
        .await?;

        match receipt {
            Some(receipt) => Ok(Some(load_receipt_view(&mut conn, receipt).await?)),
            None => Ok(None),
        }
    }

    pub async fn list_receipts(&self) -> DbResult<Vec<ImportReceipt>> {
        let receipts = sqlx::query_as::<_, ImportReceipt>(
            r#"
            SELECT id, supplier_id, purchase_order_id, total_cents, status, imported_at, created_at
            FROM import_receipts
            ORDER BY imported_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(receipts)
    }

    // =========================================================================
    // Locks
    // =========================================================================

    /// Takes the write lock on a purchase order and returns its current row.
    pub(crate) async fn lock_purchase_order(
        &self,
        uow: &mut UnitOfWork,
        po_id: &str,
    ) -> DbResult<PurchaseOrder> {
        if !uow
            .lock_row("UPDATE purchase_orders SET id = id WHERE id = ?1", po_id)
            .await?
        {
            return Err(CoreError::PurchaseOrderNotFound(po_id.to_string()).into());
        }

        fetch_order(uow.conn(), po_id)
            .await?
            .ok_or_else(|| CoreError::PurchaseOrderNotFound(po_id.to_string()).into())
    }

    /// Locks the purchase order owning a detail.
    pub(crate) async fn lock_by_detail(
        &self,
        uow: &mut UnitOfWork,
        detail_id: &str,
    ) -> DbResult<(PurchaseOrder, PurchaseOrderDetail)> {
        let locked = uow
            .lock_row(
                r#"
                UPDATE purchase_orders SET id = id
                WHERE id = (SELECT purchase_order_id FROM purchase_order_details WHERE id = ?1)
                "#,
                detail_id,
            )
            .await?;
        if !locked {
            return Err(DbError::not_found("PurchaseOrderDetail", detail_id));
        }

        let detail = fetch_detail(uow.conn(), detail_id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrderDetail", detail_id))?;
        let order = fetch_order(uow.conn(), &detail.purchase_order_id)
            .await?
            .ok_or_else(|| CoreError::PurchaseOrderNotFound(detail.purchase_order_id.clone()))?;

        Ok((order, detail))
    }

    // =========================================================================
    // Unit-of-work operations
    // =========================================================================

    pub(crate) async fn view_in(
        &self,
        uow: &mut UnitOfWork,
        po_id: &str,
    ) -> DbResult<PurchaseOrderView> {
        load_view(uow.conn(), po_id).await
    }

    pub(crate) async fn product_unit_exists_in(
        &self,
        uow: &mut UnitOfWork,
        product_unit_id: &str,
    ) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product_units WHERE id = ?1)")
                .bind(product_unit_id)
                .fetch_one(uow.conn())
                .await?;
        Ok(exists)
    }

    pub(crate) async fn insert_order(
        &self,
        uow: &mut UnitOfWork,
        supplier_id: &str,
        note: Option<&str>,
    ) -> DbResult<PurchaseOrder> {
        let now = Utc::now();
        let order = PurchaseOrder {
            id: new_id(),
            supplier_id: supplier_id.to_string(),
            total_cents: 0,
            status: PurchaseOrderStatus::Pending,
            note: note.map(str::to_string),
            created_at: now,
            updated_at: now,
            approved_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (id, supplier_id, total_cents, status, note, created_at, updated_at)
            VALUES (?1, ?2, 0, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&order.id)
        .bind(&order.supplier_id)
        .bind(order.status)
        .bind(&order.note)
        .bind(now)
        .execute(uow.conn())
        .await?;

        Ok(order)
    }

    pub(crate) async fn insert_detail(
        &self,
        uow: &mut UnitOfWork,
        po_id: &str,
        line: &PurchaseLineRequest,
    ) -> DbResult<PurchaseOrderDetail> {
        let detail = PurchaseOrderDetail {
            id: new_id(),
            purchase_order_id: po_id.to_string(),
            product_unit_id: line.product_unit_id.clone(),
            quantity: line.quantity,
            unit_cost_cents: line.unit_cost_cents,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO purchase_order_details (id, purchase_order_id, product_unit_id, quantity, unit_cost_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&detail.id)
        .bind(&detail.purchase_order_id)
        .bind(&detail.product_unit_id)
        .bind(detail.quantity)
        .bind(detail.unit_cost_cents)
        .bind(detail.created_at)
        .execute(uow.conn())
        .await?;

        Ok(detail)
    }

    pub(crate) async fn update_detail(
        &self,
        uow: &mut UnitOfWork,
        detail_id: &str,
        line: &PurchaseLineRequest,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE purchase_order_details
            SET product_unit_id = ?2, quantity = ?3, unit_cost_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(detail_id)
        .bind(&line.product_unit_id)
        .bind(line.quantity)
        .bind(line.unit_cost_cents)
        .execute(uow.conn())
        .await?;
        Ok(())
    }

    pub(crate) async fn delete_detail(&self, uow: &mut UnitOfWork, detail_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM purchase_order_details WHERE id = ?1")
            .bind(detail_id)
            .execute(uow.conn())
            .await?;
        Ok(())
    }

    /// Recomputes and stores `total = Σ unit_cost × quantity` over current details.
    pub(crate) async fn recompute_total(&self, uow: &mut UnitOfWork, po_id: &str) -> DbResult<Money> {
        let details = fetch_details(uow.conn(), po_id).await?;
        let total = purchase_total(&details)?;

        sqlx::query("UPDATE purchase_orders SET total_cents = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(po_id)
            .bind(total.cents())
            .bind(Utc::now())
            .execute(uow.conn())
            .await?;

        debug!(po_id = %po_id, total = %total, lines = details.len(), "Purchase order total recomputed");
        Ok(total)
    }

    pub(crate) async fn set_status(
        &self,
        uow: &mut UnitOfWork,
        po_id: &str,
        status: PurchaseOrderStatus,
        approved_at: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE purchase_orders
            SET status = ?2, approved_at = COALESCE(?3, approved_at), updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(po_id)
        .bind(status)
        .bind(approved_at)
        .bind(Utc::now())
        .execute(uow.conn())
        .await?;
        Ok(())
    }

    /// Deletes a purchase order; its details cascade.
    pub(crate) async fn delete_order(&self, uow: &mut UnitOfWork, po_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM purchase_orders WHERE id = ?1")
            .bind(po_id)
            .execute(uow.conn())
            .await?;
        Ok(())
    }

    /// Details joined with their product unit's drink and conversion factor.
    pub(crate) async fn receivable_lines(
        &self,
        uow: &mut UnitOfWork,
        po_id: &str,
    ) -> DbResult<Vec<ReceivableLine>> {
        let lines = sqlx::query_as::<_, ReceivableLine>(
            r#"
            SELECT d.id AS detail_id, d.product_unit_id, pu.drink_id, d.quantity,
                   pu.base_items_count, d.unit_cost_cents
            FROM purchase_order_details d
            INNER JOIN product_units pu ON pu.id = d.product_unit_id
            WHERE d.purchase_order_id = ?1
            ORDER BY d.rowid
            "#,
        )
        .bind(po_id)
        .fetch_all(uow.conn())
        .await?;
        Ok(lines)
    }

    /// Writes the import receipt of an order being approved.
    pub(crate) async fn insert_receipt(
        &self,
        uow: &mut UnitOfWork,
        order: &PurchaseOrder,
        total: Money,
        lines: &[ReceivableLine],
        imported_at: DateTime<Utc>,
    ) -> DbResult<ImportReceiptView> {
        let receipt = ImportReceipt {
            id: new_id(),
            supplier_id: order.supplier_id.clone(),
            purchase_order_id: order.id.clone(),
            total_cents: total.cents(),
            status: ImportStatus::Completed,
            imported_at,
            created_at: imported_at,
        };

        sqlx::query(
            r#"
            INSERT INTO import_receipts (id, supplier_id, purchase_order_id, total_cents, status, imported_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&receipt.id)
        .bind(&receipt.supplier_id)
        .bind(&receipt.purchase_order_id)
        .bind(receipt.total_cents)
        .bind(receipt.status)
        .bind(imported_at)
        .execute(uow.conn())
        .await?;

        let mut details = Vec::with_capacity(lines.len());
        for line in lines {
            let detail = ImportDetail {
                id: new_id(),
                receipt_id: receipt.id.clone(),
                drink_id: line.drink_id.clone(),
                product_unit_id: line.product_unit_id.clone(),
                purchased_quantity: line.quantity,
                base_quantity: line.base_quantity()?,
                unit_cost_cents: line.unit_cost_cents,
                created_at: imported_at,
            };

            sqlx::query(
                r#"
                INSERT INTO import_details (id, receipt_id, drink_id, product_unit_id, purchased_quantity, base_quantity, unit_cost_cents, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&detail.id)
            .bind(&detail.receipt_id)
            .bind(&detail.drink_id)
            .bind(&detail.product_unit_id)
            .bind(detail.purchased_quantity)
            .bind(detail.base_quantity)
            .bind(detail.unit_cost_cents)
            .bind(imported_at)
            .execute(uow.conn())
            .await?;

            details.push(detail);
        }

        Ok(ImportReceiptView { receipt, details })
    }
}

// =============================================================================
// Connection-level queries
// =============================================================================

async fn fetch_order(conn: &mut SqliteConnection, po_id: &str) -> DbResult<Option<PurchaseOrder>> {
    let order = sqlx::query_as::<_, PurchaseOrder>(
        r#"
        SELECT id, supplier_id, total_cents, status, note, created_at, updated_at, approved_at
        FROM purchase_orders WHERE id = ?1
        "#,
    )
    .bind(po_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

async fn fetch_detail(
    conn: &mut SqliteConnection,
    detail_id: &str,
) -> DbResult<Option<PurchaseOrderDetail>> {
    let detail = sqlx::query_as::<_, PurchaseOrderDetail>(
        r#"
        SELECT id, purchase_order_id, product_unit_id, quantity, unit_cost_cents, created_at
        FROM purchase_order_details WHERE id = ?1
        "#,
    )
    .bind(detail_id)
    .fetch_optional(conn)
    .await?;
    Ok(detail)
}

async fn fetch_details(
    conn: &mut SqliteConnection,
    po_id: &str,
) -> DbResult<Vec<PurchaseOrderDetail>> {
    let details = sqlx::query_as::<_, PurchaseOrderDetail>(
        r#"
        SELECT id, purchase_order_id, product_unit_id, quantity, unit_cost_cents, created_at
        FROM purchase_order_details WHERE purchase_order_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(po_id)
    .fetch_all(conn)
    .await?;
    Ok(details)
}

async fn load_view(conn: &mut SqliteConnection, po_id: &str) -> DbResult<PurchaseOrderView> {
    let order = fetch_order(&mut *conn, po_id)
        .await?
        .ok_or_else(|| CoreError::PurchaseOrderNotFound(po_id.to_string()))?;
    let details = fetch_details(&mut *conn, po_id).await?;
    Ok(PurchaseOrderView { order, details })
}

async fn load_receipt_view(
    conn: &mut SqliteConnection,
    receipt: ImportReceipt,
) -> DbResult<ImportReceiptView> {
    let details = sqlx::query_as::<_, ImportDetail>(
        r#"
        SELECT id, receipt_id, drink_id, product_unit_id, purchased_quantity, base_quantity,
               unit_cost_cents, created_at
        FROM import_details WHERE receipt_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(&receipt.id)
    .fetch_all(conn)
    .await?;
    Ok(ImportReceiptView { receipt, details })
}
