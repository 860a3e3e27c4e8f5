//! # Inventory Ledger
//!
//! The only code that changes `drinks.quantity`.
//!
//! ## Stock Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_drink ──── credit  (+initial_stock) ───┐                       │
//! │   approve PO ────── credit  (+purchase_received)┤                       │
//! │   cancel bill ───── release (+order_cancelled) ─┼──► drinks.quantity   │
//! │   add round ─────── reserve (−order_placed) ────┤    stock_movements   │
//! │   manual count ──── adjust  (±adjustment) ──────┘                       │
//! │                                                                         │
//! │   Σ stock_movements.delta (per drink) == drinks.quantity                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decrement Safety
//! `reserve` checks the whole demand map before touching any row, then
//! decrements with `WHERE quantity >= ?`. The caller holds the write lock
//! for the whole unit of work, and `CHECK (quantity >= 0)` backs it up, so
//! two rounds can never both spend the last bottle.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use bistro_core::{
    CoreError, StockLevel, StockMovement, StockMovementReason, StockRequirements,
};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

/// Stock ledger over `drinks` and `stock_movements`.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    // =========================================================================
    // Mutations (inside the caller's unit of work)
    // =========================================================================

    /// Decrements stock for every drink in `demand`, all or nothing.
    ///
    /// ## Errors
    /// - `ItemNotFound` if a drink does not exist
    /// - `StockInsufficient` for the first drink that is short; nothing has
    ///   been decremented at that point
    pub async fn reserve(
        &self,
        uow: &mut UnitOfWork,
        demand: &StockRequirements,
        reference_id: &str,
    ) -> DbResult<()> {
        if demand.is_empty() {
            return Ok(());
        }

        let levels = self.levels_in(uow, demand.drink_ids()).await?;
        demand.check_against(&levels)?;

        for (drink_id, quantity) in demand.iter() {
            let result = sqlx::query(
                r#"
                UPDATE drinks
                SET quantity = quantity - ?2, updated_at = ?3
                WHERE id = ?1 AND quantity >= ?2
                "#,
            )
            .bind(drink_id)
            .bind(quantity)
            .bind(Utc::now())
            .execute(uow.conn())
            .await?;

            if result.rows_affected() == 0 {
                // Only reachable if another writer slipped in; report it the same way.
                let level = self
                    .level_in(uow, drink_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Drink", drink_id))?;
                warn!(drink_id = %drink_id, available = level.quantity, "Conditional decrement refused");
                return Err(CoreError::StockInsufficient {
                    drink_id: drink_id.to_string(),
                    name: level.name,
                    available: level.quantity,
                    requested: quantity,
                    shortfall: quantity - level.quantity,
                }
                .into());
            }

            self.record_movement(
                uow,
                drink_id,
                -quantity,
                StockMovementReason::OrderPlaced,
                Some(reference_id),
                None,
            )
            .await?;
        }

        debug!(drinks = demand.len(), reference_id = %reference_id, "Stock reserved");
        Ok(())
    }

    /// Returns stock for every drink in `demand`.
    pub async fn release(
        &self,
        uow: &mut UnitOfWork,
        demand: &StockRequirements,
        reason: StockMovementReason,
        reference_id: &str,
    ) -> DbResult<()> {
        for (drink_id, quantity) in demand.iter() {
            self.credit(uow, drink_id, quantity, reason, Some(reference_id), None)
                .await?;
        }

        debug!(drinks = demand.len(), reference_id = %reference_id, ?reason, "Stock released");
        Ok(())
    }

    /// Increments one drink's stock by `quantity` base units.
    pub async fn credit(
        &self,
        uow: &mut UnitOfWork,
        drink_id: &str,
        quantity: i64,
        reason: StockMovementReason,
        reference_id: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<()> {
        if quantity <= 0 {
            return Err(CoreError::invalid("credited quantity must be positive").into());
        }

        let current: Option<i64> = sqlx::query_scalar("SELECT quantity FROM drinks WHERE id = ?1")
            .bind(drink_id)
            .fetch_optional(uow.conn())
            .await?;
        let current = current.ok_or_else(|| DbError::not_found("Drink", drink_id))?;
        let next = current.checked_add(quantity).ok_or_else(|| {
            CoreError::invalid(format!("stock of drink {} would overflow", drink_id))
        })?;

        sqlx::query("UPDATE drinks SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(drink_id)
            .bind(next)
            .bind(Utc::now())
            .execute(uow.conn())
            .await?;

        self.record_movement(uow, drink_id, quantity, reason, reference_id, note)
            .await
    }

    /// Stock levels as seen inside the unit of work, in `drink_ids` order.
    /// Unknown drinks are left out.
    pub(crate) async fn levels_in<'a>(
        &self,
        uow: &mut UnitOfWork,
        drink_ids: impl Iterator<Item = &'a str>,
    ) -> DbResult<Vec<StockLevel>> {
        let mut levels = Vec::new();
        for drink_id in drink_ids {
            if let Some(level) = self.level_in(uow, drink_id).await? {
                levels.push(level);
            }
        }
        Ok(levels)
    }

    async fn level_in(&self, uow: &mut UnitOfWork, drink_id: &str) -> DbResult<Option<StockLevel>> {
        let level = sqlx::query_as::<_, StockLevel>(
            "SELECT id AS drink_id, name, quantity FROM drinks WHERE id = ?1",
        )
        .bind(drink_id)
        .fetch_optional(uow.conn())
        .await?;
        Ok(level)
    }

    async fn record_movement(
        &self,
        uow: &mut UnitOfWork,
        drink_id: &str,
        delta: i64,
        reason: StockMovementReason,
        reference_id: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, drink_id, delta, reason, reference_id, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(new_id())
        .bind(drink_id)
        .bind(delta)
        .bind(reason)
        .bind(reference_id)
        .bind(note)
        .bind(Utc::now())
        .execute(uow.conn())
        .await?;
        Ok(())
    }

    // =========================================================================
    // Standalone operations
    // =========================================================================

    /// Manual stock correction (breakage, recount).
    ///
    /// A negative `delta` larger than the stock on hand fails with
    /// `StockInsufficient` and changes nothing.
    pub async fn adjust(&self, drink_id: &str, delta: i64, note: Option<&str>) -> DbResult<StockLevel> {
        if delta == 0 {
            return Err(CoreError::invalid("adjustment must not be zero").into());
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !uow
            .lock_row("UPDATE drinks SET quantity = quantity WHERE id = ?1", drink_id)
            .await?
        {
            return Err(DbError::not_found("Drink", drink_id));
        }

        if delta > 0 {
            self.credit(
                &mut uow,
                drink_id,
                delta,
                StockMovementReason::Adjustment,
                None,
                note,
            )
            .await?;
        } else {
            let mut demand = StockRequirements::new();
            demand.add(drink_id, -delta, 1)?;
            let levels = self.levels_in(&mut uow, demand.drink_ids()).await?;
            demand.check_against(&levels)?;

            sqlx::query("UPDATE drinks SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1")
                .bind(drink_id)
                .bind(delta)
                .bind(Utc::now())
                .execute(uow.conn())
                .await?;
            self.record_movement(
                &mut uow,
                drink_id,
                delta,
                StockMovementReason::Adjustment,
                None,
                note,
            )
            .await?;
        }

        let level = self
            .level_in(&mut uow, drink_id)
            .await?
            .ok_or_else(|| DbError::not_found("Drink", drink_id))?;
        uow.commit().await?;

        info!(drink_id = %drink_id, delta, quantity = level.quantity, "Stock adjusted");
        Ok(level)
    }

    /// Verifies a whole demand map against committed stock.
    ///
    /// Advisory only: the order engine re-checks inside its unit of work.
    pub async fn check_availability(&self, demand: &StockRequirements) -> DbResult<()> {
        let mut levels = Vec::with_capacity(demand.len());
        for drink_id in demand.drink_ids() {
            levels.push(self.stock_level(drink_id).await?);
        }
        demand.check_against(&levels)?;
        Ok(())
    }

    pub async fn stock_level(&self, drink_id: &str) -> DbResult<StockLevel> {
        sqlx::query_as::<_, StockLevel>(
            "SELECT id AS drink_id, name, quantity FROM drinks WHERE id = ?1",
        )
        .bind(drink_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Drink", drink_id))
    }

    pub async fn stock_levels(&self) -> DbResult<Vec<StockLevel>> {
        let levels = sqlx::query_as::<_, StockLevel>(
            "SELECT id AS drink_id, name, quantity FROM drinks ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(levels)
    }

    /// Movement history of a drink, oldest first.
    pub async fn movements(&self, drink_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, drink_id, delta, reason, reference_id, note, created_at
            FROM stock_movements
            WHERE drink_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(drink_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    /// Σ delta over a drink's movements. Equals its on-hand quantity.
    pub async fn movement_balance(&self, drink_id: &str) -> DbResult<i64> {
        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM stock_movements WHERE drink_id = ?1",
        )
        .bind(drink_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bistro_core::{ErrorKind, NewDrink};

    async fn setup(quantity: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let unit = db.catalog().create_unit("can").await.unwrap();
        let (drink, _) = db
            .catalog()
            .create_drink(&NewDrink {
                name: "Cola".into(),
                category_id: None,
                unit_id: unit.id,
                price_cents: 200,
                initial_quantity: quantity,
                image_url: None,
            })
            .await
            .unwrap();
        (db, drink.id)
    }

    #[tokio::test]
    async fn test_reserve_and_release_round_trip() {
        let (db, cola) = setup(10).await;
        let ledger = db.inventory();

        let mut demand = StockRequirements::new();
        demand.add(&cola, 4, 1).unwrap();

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        ledger.reserve(&mut uow, &demand, "round-1").await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(ledger.stock_level(&cola).await.unwrap().quantity, 6);

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        ledger
            .release(&mut uow, &demand, StockMovementReason::OrderCancelled, "bill-1")
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(ledger.stock_level(&cola).await.unwrap().quantity, 10);
        assert_eq!(ledger.movement_balance(&cola).await.unwrap(), 10);
        assert_eq!(ledger.movements(&cola).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reserve_shortfall_changes_nothing() {
        let (db, cola) = setup(1).await;
        let ledger = db.inventory();

        let mut demand = StockRequirements::new();
        demand.add(&cola, 2, 1).unwrap();

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        let err = ledger.reserve(&mut uow, &demand, "round-1").await.unwrap_err();
        drop(uow);

        assert_eq!(err.kind(), ErrorKind::StockInsufficient);
        match err.as_domain() {
            Some(CoreError::StockInsufficient { shortfall, .. }) => assert_eq!(*shortfall, 1),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(ledger.stock_level(&cola).await.unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_reserve_unknown_drink() {
        let (db, _) = setup(1).await;
        let mut demand = StockRequirements::new();
        demand.add(&new_id(), 1, 1).unwrap();

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        let err = db
            .inventory()
            .reserve(&mut uow, &demand, "round-1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemNotFound);
    }

    #[tokio::test]
    async fn test_adjust_never_goes_negative() {
        let (db, cola) = setup(3).await;
        let ledger = db.inventory();

        let err = ledger.adjust(&cola, -4, Some("broken crate")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StockInsufficient);

        let level = ledger.adjust(&cola, -3, Some("broken crate")).await.unwrap();
        assert_eq!(level.quantity, 0);

        let level = ledger.adjust(&cola, 12, Some("recount")).await.unwrap();
        assert_eq!(level.quantity, 12);
        assert_eq!(ledger.movement_balance(&cola).await.unwrap(), 12);

        let err = ledger.adjust(&cola, 0, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_check_availability() {
        let (db, cola) = setup(5).await;
        let mut demand = StockRequirements::new();
        demand.add(&cola, 5, 1).unwrap();
        assert!(db.inventory().check_availability(&demand).await.is_ok());

        demand.add(&cola, 1, 1).unwrap();
        let err = db.inventory().check_availability(&demand).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StockInsufficient);
    }

    #[tokio::test]
    async fn test_credit_past_i64_is_refused() {
        let (db, cola) = setup(10).await;
        let ledger = db.inventory();

        let err = ledger.adjust(&cola, i64::MAX, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(ledger.stock_level(&cola).await.unwrap().quantity, 10);
        assert_eq!(ledger.movement_balance(&cola).await.unwrap(), 10);
    }
}
