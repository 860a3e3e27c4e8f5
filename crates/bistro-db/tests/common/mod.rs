//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::path::Path;

use bistro_core::{
    AddItemsRequest, EmployeeRole, LineItemRequest, NewDiningTable, NewDrink, NewEmployee, NewFood,
    NewProductUnit, NewSupplier,
};
use bistro_db::{Database, DbConfig};

/// A small restaurant: one drink (lager) sold by the bottle and by the
/// case of 6, one food, two tables, one employee and one supplier.
pub struct Restaurant {
    pub db: Database,
    pub employee_id: String,
    pub supplier_id: String,
    pub table_id: String,
    pub other_table_id: String,
    pub lager_id: String,
    pub bottle_id: String,
    pub case_id: String,
    pub cola_id: String,
    pub can_id: String,
    pub food_id: String,
}

pub async fn restaurant(lager_stock: i64) -> Restaurant {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    build(db, lager_stock).await
}

/// Same restaurant on a file-backed database with several connections.
pub async fn restaurant_on_file(path: &Path, lager_stock: i64, connections: u32) -> Restaurant {
    let config = DbConfig::new(path)
        .max_connections(connections)
        .min_connections(1);
    let db = Database::new(config).await.unwrap();
    build(db, lager_stock).await
}

async fn build(db: Database, lager_stock: i64) -> Restaurant {
    let catalog = db.catalog();
    let bottle_unit = catalog.create_unit("bottle").await.unwrap();
    let can_unit = catalog.create_unit("can").await.unwrap();

    let (lager, bottle) = catalog
        .create_drink(&NewDrink {
            name: "Lager".into(),
            category_id: None,
            unit_id: bottle_unit.id,
            price_cents: 250,
            initial_quantity: lager_stock,
            image_url: None,
        })
        .await
        .unwrap();
    let case = catalog
        .create_product_unit(&NewProductUnit {
            drink_id: lager.id.clone(),
            name: "Lager (case of 6)".into(),
            price_cents: 1400,
            base_items_count: 6,
        })
        .await
        .unwrap();
    let (cola, can) = catalog
        .create_drink(&NewDrink {
            name: "Cola".into(),
            category_id: None,
            unit_id: can_unit.id,
            price_cents: 150,
            initial_quantity: 0,
            image_url: None,
        })
        .await
        .unwrap();
    let food = catalog
        .create_food(&NewFood {
            name: "Spring Rolls".into(),
            category_id: None,
            price_cents: 600,
            image_url: None,
        })
        .await
        .unwrap();

    let table = db
        .tables()
        .create(&NewDiningTable { number: 5, seats: 4 })
        .await
        .unwrap();
    let other_table = db
        .tables()
        .create(&NewDiningTable { number: 6, seats: 2 })
        .await
        .unwrap();

    let employee = db
        .directory()
        .create_employee(&NewEmployee {
            name: "Hoa".into(),
            email: "hoa@bistro.test".into(),
            role: EmployeeRole::Staff,
        })
        .await
        .unwrap();
    let supplier = db
        .directory()
        .create_supplier(&NewSupplier {
            name: "Riverside Beverages".into(),
            phone: None,
            address: None,
        })
        .await
        .unwrap();

    Restaurant {
        db,
        employee_id: employee.id,
        supplier_id: supplier.id,
        table_id: table.id,
        other_table_id: other_table.id,
        lager_id: lager.id,
        bottle_id: bottle.id,
        case_id: case.id,
        cola_id: cola.id,
        can_id: can.id,
        food_id: food.id,
    }
}

impl Restaurant {
    pub fn order(&self, items: Vec<LineItemRequest>) -> AddItemsRequest {
        AddItemsRequest {
            employee_id: self.employee_id.clone(),
            table_id: self.table_id.clone(),
            items,
        }
    }

    pub async fn stock(&self, drink_id: &str) -> i64 {
        self.db
            .inventory()
            .stock_level(drink_id)
            .await
            .unwrap()
            .quantity
    }
}
