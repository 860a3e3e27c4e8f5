//! # Catalog Repository
//!
//! Units, categories, drinks, product units and foods.
//!
//! ## Pricing a Round
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request line                catalog row              priced line       │
//! │  ─────────────               ────────────             ───────────       │
//! │  food f-1 × 2        ──►     foods.price_cents  ──►   600 × 2, no stock │
//! │  unit u-7 × 1        ──►     product_units      ──►   4800 × 1,         │
//! │  (client price                 .price_cents             draw lager × 24 │
//! │   never read)                  .base_items_count                        │
//! │                                                                         │
//! │  Unknown id → NotFound   Unavailable food / zero price → InvalidInput  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use bistro_core::validation::{
    validate_base_items_count, validate_name, validate_new_drink, validate_new_product_unit,
    validate_price_cents,
};
use bistro_core::{
    default_unit_name, Category, CoreError, Drink, DrinkUpdate, Food, LineItemRef,
    LineItemRequest, NewDrink, NewFood, NewProductUnit, PricedLine, ProductUnit, ProductUnitUpdate, StockDraw,
    StockMovementReason, Unit,
};

use super::inventory::InventoryLedger;
use super::new_id;
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

/// Repository for catalog records.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog();
/// let bottle = catalog.create_unit("bottle").await?;
/// let (lager, single) = catalog.create_drink(&new_drink).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Units & Categories
    // =========================================================================

    pub async fn create_unit(&self, name: &str) -> DbResult<Unit> {
        validate_name("name", name)?;

        let unit = Unit {
            id: new_id(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO units (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&unit.id)
            .bind(&unit.name)
            .bind(unit.created_at)
            .execute(&self.pool)
            .await?;

        debug!(unit_id = %unit.id, name = %unit.name, "Unit created");
        Ok(unit)
    }

    pub async fn list_units(&self) -> DbResult<Vec<Unit>> {
        let units = sqlx::query_as::<_, Unit>("SELECT id, name, created_at FROM units ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(units)
    }

    pub async fn create_category(&self, name: &str) -> DbResult<Category> {
        validate_name("name", name)?;

        let category = Category {
            id: new_id(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await?;

        Ok(category)
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    // =========================================================================
    // Drinks
    // =========================================================================

    /// Creates a drink together with its default single product unit.
    ///
    /// ## What This Does (one unit of work)
    /// 1. Inserts the drink with zero stock
    /// 2. Inserts `"<drink> (<unit>)"` with `base_items_count = 1` at the given price
    /// 3. Credits `initial_quantity` through the ledger as `initial_stock`
    pub async fn create_drink(&self, input: &NewDrink) -> DbResult<(Drink, ProductUnit)> {
        validate_new_drink(input)?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let unit_name: Option<String> = sqlx::query_scalar("SELECT name FROM units WHERE id = ?1")
            .bind(&input.unit_id)
            .fetch_optional(uow.conn())
            .await?;
        let unit_name = unit_name.ok_or_else(|| DbError::not_found("Unit", &input.unit_id))?;

        let now = Utc::now();
        let mut drink = Drink {
            id: new_id(),
            name: input.name.trim().to_string(),
            category_id: input.category_id.clone(),
            unit_id: input.unit_id.clone(),
            quantity: 0,
            image_url: input.image_url.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO drinks (id, name, category_id, unit_id, quantity, image_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?6)
            "#,
        )
        .bind(&drink.id)
        .bind(&drink.name)
        .bind(&drink.category_id)
        .bind(&drink.unit_id)
        .bind(&drink.image_url)
        .bind(now)
        .execute(uow.conn())
        .await?;

        let default_unit = ProductUnit {
            id: new_id(),
            drink_id: drink.id.clone(),
            name: default_unit_name(&drink.name, &unit_name),
            price_cents: input.price_cents,
            base_items_count: 1,
            created_at: now,
            updated_at: now,
        };
        insert_product_unit(&mut uow, &default_unit).await?;

        if input.initial_quantity > 0 {
            InventoryLedger::new(self.pool.clone())
                .credit(
                    &mut uow,
                    &drink.id,
                    input.initial_quantity,
                    StockMovementReason::InitialStock,
                    None,
                    None,
                )
                .await?;
            drink.quantity = input.initial_quantity;
        }

        uow.commit().await?;

        info!(
            drink_id = %drink.id,
            name = %drink.name,
            quantity = drink.quantity,
            "Drink created"
        );
        Ok((drink, default_unit))
    }

    pub async fn get_drink(&self, id: &str) -> DbResult<Drink> {
        sqlx::query_as::<_, Drink>(
            r#"
            SELECT id, name, category_id, unit_id, quantity, image_url, created_at, updated_at
            FROM drinks WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Drink", id))
    }

    pub async fn list_drinks(&self) -> DbResult<Vec<Drink>> {
        let drinks = sqlx::query_as::<_, Drink>(
            r#"
            SELECT id, name, category_id, unit_id, quantity, image_url, created_at, updated_at
            FROM drinks ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(drinks)
    }

    /// Renames a drink or moves it to another category or base unit.
    ///
    /// Stock is never written here; use the inventory ledger.
    pub async fn update_drink(&self, id: &str, update: &DrinkUpdate) -> DbResult<Drink> {
        if let Some(name) = &update.name {
            validate_name("name", name)?;
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !uow
            .lock_row("UPDATE drinks SET id = id WHERE id = ?1", id)
            .await?
        {
            return Err(DbError::not_found("Drink", id));
        }

        if let Some(unit_id) = &update.unit_id {
            if !row_exists(&mut uow, "SELECT EXISTS(SELECT 1 FROM units WHERE id = ?1)", unit_id)
                .await?
            {
                return Err(DbError::not_found("Unit", unit_id));
            }
        }
        if let Some(category_id) = &update.category_id {
            if !row_exists(
                &mut uow,
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
                category_id,
            )
            .await?
            {
                return Err(DbError::not_found("Category", category_id));
            }
        }

        sqlx::query(
            r#"
            UPDATE drinks
            SET name = COALESCE(?2, name),
                category_id = COALESCE(?3, category_id),
                unit_id = COALESCE(?4, unit_id),
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.category_id)
        .bind(&update.unit_id)
        .bind(Utc::now())
        .execute(uow.conn())
        .await?;

        let drink = fetch_drink(&mut uow, id)
            .await?
            .ok_or_else(|| DbError::not_found("Drink", id))?;
        uow.commit().await?;

        debug!(drink_id = %id, name = %drink.name, "Drink updated");
        Ok(drink)
    }

    /// Deletes a drink with its product units and stock history.
    ///
    /// Fails with `Conflict` while any of its units appears on an order or a
    /// purchase order.
    pub async fn delete_drink(&self, id: &str) -> DbResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !uow
            .lock_row("UPDATE drinks SET id = id WHERE id = ?1", id)
            .await?
        {
            return Err(DbError::not_found("Drink", id));
        }

        let in_use: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM order_details d
                INNER JOIN product_units pu ON pu.id = d.product_unit_id
                WHERE pu.drink_id = ?1
            ) OR EXISTS(
                SELECT 1 FROM purchase_order_details d
                INNER JOIN product_units pu ON pu.id = d.product_unit_id
                WHERE pu.drink_id = ?1
            )
            "#,
        )
        .bind(id)
        .fetch_one(uow.conn())
        .await?;
        if in_use {
            return Err(CoreError::Conflict(format!(
                "drink {} is part of existing orders and cannot be deleted",
                id
            ))
            .into());
        }

        // product_units and stock_movements cascade
        sqlx::query("DELETE FROM drinks WHERE id = ?1")
            .bind(id)
            .execute(uow.conn())
            .await?;

        uow.commit().await?;

        info!(drink_id = %id, "Drink deleted");
        Ok(())
    }

    // =========================================================================
    // Product Units
    // =========================================================================

    pub async fn create_product_unit(&self, input: &NewProductUnit) -> DbResult<ProductUnit> {
        validate_new_product_unit(input)?;

        let drink_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM drinks WHERE id = ?1)")
                .bind(&input.drink_id)
                .fetch_one(&self.pool)
                .await?;
        if !drink_exists {
            return Err(DbError::not_found("Drink", &input.drink_id));
        }

        let now = Utc::now();
        let unit = ProductUnit {
            id: new_id(),
            drink_id: input.drink_id.clone(),
            name: input.name.trim().to_string(),
            price_cents: input.price_cents,
            base_items_count: input.base_items_count,
            created_at: now,
            updated_at: now,
        };

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        insert_product_unit(&mut uow, &unit).await?;
        uow.commit().await?;

        debug!(
            product_unit_id = %unit.id,
            drink_id = %unit.drink_id,
            base_items_count = unit.base_items_count,
            "Product unit created"
        );
        Ok(unit)
    }

    pub async fn get_product_unit(&self, id: &str) -> DbResult<ProductUnit> {
        sqlx::query_as::<_, ProductUnit>(
            r#"
            SELECT id, drink_id, name, price_cents, base_items_count, created_at, updated_at
            FROM product_units WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("ProductUnit", id))
    }

    /// Lists product units, optionally only those of one drink.
    pub async fn list_product_units(&self, drink_id: Option<&str>) -> DbResult<Vec<ProductUnit>> {
        let units = sqlx::query_as::<_, ProductUnit>(
            r#"
            SELECT id, drink_id, name, price_cents, base_items_count, created_at, updated_at
            FROM product_units
            WHERE ?1 IS NULL OR drink_id = ?1
            ORDER BY drink_id, base_items_count
            "#,
        )
        .bind(drink_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(units)
    }

    /// Updates name / price / conversion factor of a product unit.
    ///
    /// Changing `base_items_count` after the unit appears on any order or
    /// purchase order fails with `Conflict`: it would change what past
    /// rounds restore on cancellation.
    pub async fn update_product_unit(
        &self,
        id: &str,
        update: &ProductUnitUpdate,
    ) -> DbResult<ProductUnit> {
        if let Some(name) = &update.name {
            validate_name("name", name)?;
        }
        if let Some(price) = update.price_cents {
            validate_price_cents("price", price)?;
        }
        if let Some(count) = update.base_items_count {
            validate_base_items_count(count)?;
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !uow
            .lock_row("UPDATE product_units SET id = id WHERE id = ?1", id)
            .await?
        {
            return Err(DbError::not_found("ProductUnit", id));
        }

        let current = fetch_product_unit(&mut uow, id)
            .await?
            .ok_or_else(|| DbError::not_found("ProductUnit", id))?;

        if let Some(count) = update.base_items_count {
            if count != current.base_items_count && product_unit_in_use(&mut uow, id).await? {
                return Err(CoreError::Conflict(format!(
                    "product unit {} is already used by orders; base items count cannot change",
                    id
                ))
                .into());
            }
        }

        let updated = ProductUnit {
            name: update
                .name
                .as_deref()
                .map(|n| n.trim().to_string())
                .unwrap_or(current.name),
            price_cents: update.price_cents.unwrap_or(current.price_cents),
            base_items_count: update.base_items_count.unwrap_or(current.base_items_count),
            updated_at: Utc::now(),
            ..current
        };

        sqlx::query(
            r#"
            UPDATE product_units
            SET name = ?2, price_cents = ?3, base_items_count = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&updated.name)
        .bind(updated.price_cents)
        .bind(updated.base_items_count)
        .bind(updated.updated_at)
        .execute(uow.conn())
        .await?;

        uow.commit().await?;

        debug!(product_unit_id = %id, "Product unit updated");
        Ok(updated)
    }

    /// Deletes a product unit nothing references yet.
    pub async fn delete_product_unit(&self, id: &str) -> DbResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !uow
            .lock_row("UPDATE product_units SET id = id WHERE id = ?1", id)
            .await?
        {
            return Err(DbError::not_found("ProductUnit", id));
        }

        if product_unit_in_use(&mut uow, id).await? {
            return Err(CoreError::Conflict(format!(
                "product unit {} is referenced by orders and cannot be deleted",
                id
            ))
            .into());
        }

        sqlx::query("DELETE FROM product_units WHERE id = ?1")
            .bind(id)
            .execute(uow.conn())
            .await?;

        uow.commit().await?;

        info!(product_unit_id = %id, "Product unit deleted");
        Ok(())
    }

    // =========================================================================
    // Foods
    // =========================================================================

    pub async fn create_food(&self, input: &NewFood) -> DbResult<Food> {
        validate_name("name", &input.name)?;
        validate_price_cents("price", input.price_cents)?;

        let now = Utc::now();
        let food = Food {
            id: new_id(),
            name: input.name.trim().to_string(),
            category_id: input.category_id.clone(),
            price_cents: input.price_cents,
            is_available: true,
            image_url: input.image_url.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO foods (id, name, category_id, price_cents, is_available, image_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6)
            "#,
        )
        .bind(&food.id)
        .bind(&food.name)
        .bind(&food.category_id)
        .bind(food.price_cents)
        .bind(&food.image_url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(food_id = %food.id, name = %food.name, "Food created");
        Ok(food)
    }

    pub async fn get_food(&self, id: &str) -> DbResult<Food> {
        sqlx::query_as::<_, Food>(
            r#"
            SELECT id, name, category_id, price_cents, is_available, image_url, created_at, updated_at
            FROM foods WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Food", id))
    }

    pub async fn list_foods(&self) -> DbResult<Vec<Food>> {
        let foods = sqlx::query_as::<_, Food>(
            r#"
            SELECT id, name, category_id, price_cents, is_available, image_url, created_at, updated_at
            FROM foods ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(foods)
    }

    /// Changes a food's menu price. Already placed rounds keep their price.
    pub async fn update_food_price(&self, id: &str, price_cents: i64) -> DbResult<Food> {
        validate_price_cents("price", price_cents)?;

        let result = sqlx::query("UPDATE foods SET price_cents = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(price_cents)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Food", id));
        }
        self.get_food(id).await
    }

    /// Puts a food on or takes it off the menu.
    pub async fn set_food_availability(&self, id: &str, available: bool) -> DbResult<Food> {
        let result =
            sqlx::query("UPDATE foods SET is_available = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(available)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Food", id));
        }
        self.get_food(id).await
    }

    /// Deletes a food no order references. Referenced foods fail with
    /// `Conflict`; take them off the menu instead.
    pub async fn delete_food(&self, id: &str) -> DbResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !uow
            .lock_row("UPDATE foods SET id = id WHERE id = ?1", id)
            .await?
        {
            return Err(DbError::not_found("Food", id));
        }

        if row_exists(
            &mut uow,
            "SELECT EXISTS(SELECT 1 FROM order_details WHERE food_id = ?1)",
            id,
        )
        .await?
        {
            return Err(CoreError::Conflict(format!(
                "food {} is part of existing orders and cannot be deleted",
                id
            ))
            .into());
        }

        sqlx::query("DELETE FROM foods WHERE id = ?1")
            .bind(id)
            .execute(uow.conn())
            .await?;

        uow.commit().await?;

        info!(food_id = %id, "Food deleted");
        Ok(())
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Re-prices request lines from the catalog inside a unit of work.
    pub(crate) async fn price_lines(
        &self,
        uow: &mut UnitOfWork,
        lines: &[LineItemRequest],
    ) -> DbResult<Vec<PricedLine>> {
        let mut priced = Vec::with_capacity(lines.len());

        for line in lines {
            let (unit_price, stock) = match &line.item {
                LineItemRef::Food { food_id } => {
                    let food = sqlx::query_as::<_, Food>(
                        r#"
                        SELECT id, name, category_id, price_cents, is_available, image_url, created_at, updated_at
                        FROM foods WHERE id = ?1
                        "#,
                    )
                    .bind(food_id)
                    .fetch_optional(uow.conn())
                    .await?
                    .ok_or_else(|| DbError::not_found("Food", food_id))?;

                    if !food.is_available {
                        return Err(CoreError::invalid(format!(
                            "{} is not available",
                            food.name
                        ))
                        .into());
                    }
                    (food.price(), None)
                }
                LineItemRef::ProductUnit { product_unit_id } => {
                    let unit = fetch_product_unit(uow, product_unit_id)
                        .await?
                        .ok_or_else(|| DbError::not_found("ProductUnit", product_unit_id))?;
                    let draw = StockDraw {
                        drink_id: unit.drink_id.clone(),
                        base_items_count: unit.base_items_count,
                    };
                    (unit.price(), Some(draw))
                }
            };

            if !unit_price.is_positive() {
                return Err(CoreError::invalid(format!(
                    "{} has no price",
                    line.item.id()
                ))
                .into());
            }

            priced.push(PricedLine {
                item: line.item.clone(),
                quantity: line.quantity,
                unit_price,
                stock,
            });
        }

        Ok(priced)
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn insert_product_unit(uow: &mut UnitOfWork, unit: &ProductUnit) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO product_units (id, drink_id, name, price_cents, base_items_count, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&unit.id)
    .bind(&unit.drink_id)
    .bind(&unit.name)
    .bind(unit.price_cents)
    .bind(unit.base_items_count)
    .bind(unit.created_at)
    .bind(unit.updated_at)
    .execute(uow.conn())
    .await?;
    Ok(())
}

pub(crate) async fn fetch_product_unit(
    uow: &mut UnitOfWork,
    id: &str,
) -> DbResult<Option<ProductUnit>> {
    let unit = sqlx::query_as::<_, ProductUnit>(
        r#"
        SELECT id, drink_id, name, price_cents, base_items_count, created_at, updated_at
        FROM product_units WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(uow.conn())
    .await?;
    Ok(unit)
}

async fn fetch_drink(uow: &mut UnitOfWork, id: &str) -> DbResult<Option<Drink>> {
    let drink = sqlx::query_as::<_, Drink>(
        r#"
        SELECT id, name, category_id, unit_id, quantity, image_url, created_at, updated_at
        FROM drinks WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(uow.conn())
    .await?;
    Ok(drink)
}

async fn row_exists(uow: &mut UnitOfWork, sql: &'static str, id: &str) -> DbResult<bool> {
    let exists: bool = sqlx::query_scalar(sql)
        .bind(id)
        .fetch_one(uow.conn())
        .await?;
    Ok(exists)
}

async fn product_unit_in_use(uow: &mut UnitOfWork, id: &str) -> DbResult<bool> {
    let in_use: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(SELECT 1 FROM order_details WHERE product_unit_id = ?1)
            OR EXISTS(SELECT 1 FROM purchase_order_details WHERE product_unit_id = ?1)
        "#,
    )
    .bind(id)
    .fetch_one(uow.conn())
    .await?;
    Ok(in_use)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bistro_core::ErrorKind;

    async fn setup() -> (Database, Unit) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let unit = db.catalog().create_unit("bottle").await.unwrap();
        (db, unit)
    }

    fn new_drink(unit: &Unit, quantity: i64) -> NewDrink {
        NewDrink {
            name: "Lager".to_string(),
            category_id: None,
            unit_id: unit.id.clone(),
            price_cents: 350,
            initial_quantity: quantity,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_drink_adds_default_unit() {
        let (db, unit) = setup().await;
        let (drink, single) = db.catalog().create_drink(&new_drink(&unit, 40)).await.unwrap();

        assert_eq!(drink.quantity, 40);
        assert_eq!(single.name, "Lager (bottle)");
        assert_eq!(single.base_items_count, 1);
        assert_eq!(single.price_cents, 350);

        let stored = db.catalog().get_drink(&drink.id).await.unwrap();
        assert_eq!(stored.quantity, 40);

        let units = db.catalog().list_product_units(Some(&drink.id)).await.unwrap();
        assert_eq!(units.len(), 1);
    }

    #[tokio::test]
    async fn test_create_drink_with_unknown_unit_writes_nothing() {
        let (db, unit) = setup().await;
        let mut input = new_drink(&unit, 5);
        input.unit_id = new_id();

        let err = db.catalog().create_drink(&input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemNotFound);
        assert!(db.catalog().list_drinks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_base_items_count_locked_once_ordered() {
        let (db, unit) = setup().await;
        let (drink, _) = db.catalog().create_drink(&new_drink(&unit, 0)).await.unwrap();
        let case = db
            .catalog()
            .create_product_unit(&NewProductUnit {
                drink_id: drink.id.clone(),
                name: "Lager case".into(),
                price_cents: 7200,
                base_items_count: 24,
            })
            .await
            .unwrap();

        // Unused: free to change
        let changed = db
            .catalog()
            .update_product_unit(
                &case.id,
                &ProductUnitUpdate {
                    base_items_count: Some(12),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(changed.base_items_count, 12);

        // Reference it from a purchase order line
        let supplier = db
            .directory()
            .create_supplier(&bistro_core::NewSupplier {
                name: "Brewery".into(),
                phone: None,
                address: None,
            })
            .await
            .unwrap();
        db.purchasing()
            .create_purchase_order(&bistro_core::CreatePurchaseOrderRequest {
                supplier_id: supplier.id,
                details: vec![bistro_core::PurchaseLineRequest {
                    product_unit_id: case.id.clone(),
                    quantity: 1,
                    unit_cost_cents: 5000,
                }],
                note: None,
            })
            .await
            .unwrap();

        let err = db
            .catalog()
            .update_product_unit(
                &case.id,
                &ProductUnitUpdate {
                    base_items_count: Some(6),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Price is still editable
        let repriced = db
            .catalog()
            .update_product_unit(
                &case.id,
                &ProductUnitUpdate {
                    price_cents: Some(6900),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(repriced.price_cents, 6900);
        assert_eq!(repriced.base_items_count, 12);

        let err = db.catalog().delete_product_unit(&case.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_food_availability() {
        let (db, _) = setup().await;
        let food = db
            .catalog()
            .create_food(&NewFood {
                name: "Fried rice".into(),
                category_id: None,
                price_cents: 600,
                image_url: None,
            })
            .await
            .unwrap();
        assert!(food.is_available);

        let off = db.catalog().set_food_availability(&food.id, false).await.unwrap();
        assert!(!off.is_available);

        let repriced = db.catalog().update_food_price(&food.id, 650).await.unwrap();
        assert_eq!(repriced.price_cents, 650);
    }

    #[tokio::test]
    async fn test_update_drink_never_touches_stock() {
        let (db, unit) = setup().await;
        let (drink, _) = db.catalog().create_drink(&new_drink(&unit, 40)).await.unwrap();
        let can = db.catalog().create_unit("can").await.unwrap();
        let beer = db.catalog().create_category("Beer").await.unwrap();

        let updated = db
            .catalog()
            .update_drink(
                &drink.id,
                &DrinkUpdate {
                    name: Some("  Pilsner ".into()),
                    category_id: Some(beer.id.clone()),
                    unit_id: Some(can.id.clone()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Pilsner");
        assert_eq!(updated.category_id.as_deref(), Some(beer.id.as_str()));
        assert_eq!(updated.unit_id, can.id);
        assert_eq!(updated.quantity, 40);
        assert_eq!(db.inventory().movement_balance(&drink.id).await.unwrap(), 40);

        let err = db
            .catalog()
            .update_drink(
                &drink.id,
                &DrinkUpdate {
                    unit_id: Some(new_id()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemNotFound);
        assert_eq!(db.catalog().get_drink(&drink.id).await.unwrap().name, "Pilsner");
    }

    #[tokio::test]
    async fn test_delete_drink_removes_its_units() {
        let (db, unit) = setup().await;
        let (drink, _) = db.catalog().create_drink(&new_drink(&unit, 12)).await.unwrap();
        db.catalog()
            .create_product_unit(&NewProductUnit {
                drink_id: drink.id.clone(),
                name: "Lager six-pack".into(),
                price_cents: 1800,
                base_items_count: 6,
            })
            .await
            .unwrap();

        db.catalog().delete_drink(&drink.id).await.unwrap();

        let err = db.catalog().get_drink(&drink.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemNotFound);
        assert!(db
            .catalog()
            .list_product_units(Some(&drink.id))
            .await
            .unwrap()
            .is_empty());

        let err = db.catalog().delete_drink(&drink.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemNotFound);
    }

    #[tokio::test]
    async fn test_delete_drink_on_purchase_order_conflicts() {
        let (db, unit) = setup().await;
        let (drink, single) = db.catalog().create_drink(&new_drink(&unit, 0)).await.unwrap();
        let supplier = db
            .directory()
            .create_supplier(&bistro_core::NewSupplier {
                name: "Brewery".into(),
                phone: None,
                address: None,
            })
            .await
            .unwrap();
        db.purchasing()
            .create_purchase_order(&bistro_core::CreatePurchaseOrderRequest {
                supplier_id: supplier.id,
                details: vec![bistro_core::PurchaseLineRequest {
                    product_unit_id: single.id.clone(),
                    quantity: 24,
                    unit_cost_cents: 200,
                }],
                note: None,
            })
            .await
            .unwrap();

        let err = db.catalog().delete_drink(&drink.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(db.catalog().list_product_units(Some(&drink.id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_unreferenced_food() {
        let (db, _) = setup().await;
        let food = db
            .catalog()
            .create_food(&NewFood {
                name: "Fried rice".into(),
                category_id: None,
                price_cents: 600,
                image_url: None,
            })
            .await
            .unwrap();

        db.catalog().delete_food(&food.id).await.unwrap();
        let err = db.catalog().get_food(&food.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemNotFound);
    }
}
