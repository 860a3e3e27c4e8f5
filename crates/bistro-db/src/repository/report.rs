//! # Report Repository
//!
//! Read-only aggregates. Bills are placed in a window by `closed_at`, import
//! receipts by `imported_at`. Open bills never count.

use sqlx::SqlitePool;

use bistro_core::{IncomeExpense, ItemSales, ReportWindow, SalesSummary};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Paid and cancelled bill counts, and revenue from paid bills.
    pub async fn sales_summary(&self, window: &ReportWindow) -> DbResult<SalesSummary> {
        let (paid_bills, cancelled_bills, revenue_cents): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(CASE WHEN status = 'paid' THEN 1 END),
                COUNT(CASE WHEN status = 'cancelled' THEN 1 END),
                COALESCE(SUM(CASE WHEN status = 'paid' THEN total_cents END), 0)
            FROM order_bills
            WHERE closed_at >= ?1 AND closed_at < ?2
            "#,
        )
        .bind(window.from)
        .bind(window.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesSummary {
            paid_bills,
            cancelled_bills,
            revenue_cents,
        })
    }

    /// Quantity and revenue per food and product unit over paid bills,
    /// best sellers first.
    pub async fn item_sales(&self, window: &ReportWindow) -> DbResult<Vec<ItemSales>> {
        let rows = sqlx::query_as::<_, ItemSales>(
            r#"
            SELECT 'food' AS kind, f.id AS item_id, f.name AS name,
                   SUM(d.quantity) AS quantity,
                   SUM(d.quantity * d.unit_price_cents) AS revenue_cents
            FROM order_details d
            INNER JOIN order_rounds r ON r.id = d.round_id
            INNER JOIN order_bills b ON b.id = r.bill_id
            INNER JOIN foods f ON f.id = d.food_id
            WHERE b.status = 'paid' AND b.closed_at >= ?1 AND b.closed_at < ?2
            GROUP BY f.id, f.name

            UNION ALL

            SELECT 'product_unit' AS kind, pu.id AS item_id, dr.name || ' (' || pu.name || ')' AS name,
                   SUM(d.quantity) AS quantity,
                   SUM(d.quantity * d.unit_price_cents) AS revenue_cents
            FROM order_details d
            INNER JOIN order_rounds r ON r.id = d.round_id
            INNER JOIN order_bills b ON b.id = r.bill_id
            INNER JOIN product_units pu ON pu.id = d.product_unit_id
            INNER JOIN drinks dr ON dr.id = pu.drink_id
            WHERE b.status = 'paid' AND b.closed_at >= ?1 AND b.closed_at < ?2
            GROUP BY pu.id, dr.name, pu.name

            ORDER BY quantity DESC, name
            "#,
        )
        .bind(window.from)
        .bind(window.to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Revenue from paid bills against the totals of import receipts.
    pub async fn income_expense(&self, window: &ReportWindow) -> DbResult<IncomeExpense> {
        let (income_cents, expense_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COALESCE(SUM(total_cents), 0) FROM order_bills
                 WHERE status = 'paid' AND closed_at >= ?1 AND closed_at < ?2),
                (SELECT COALESCE(SUM(total_cents), 0) FROM import_receipts
                 WHERE imported_at >= ?1 AND imported_at < ?2)
            "#,
        )
        .bind(window.from)
        .bind(window.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(IncomeExpense {
            income_cents,
            expense_cents,
        })
    }
}
