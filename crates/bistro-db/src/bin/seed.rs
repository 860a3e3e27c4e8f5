//! # Seed Data Generator
//!
//! Populates a database with a small demo restaurant and runs one purchase
//! order and one table order through the engines.
//!
//! ## Usage
//! ```bash
//! # Use bistro.toml from the platform config dir (or defaults)
//! cargo run -p bistro-db --bin seed
//!
//! # Specify database path or config file
//! cargo run -p bistro-db --bin seed -- --db ./data/bistro.db
//! cargo run -p bistro-db --bin seed -- --config ./bistro.toml
//! ```
//!
//! ## Generated Data
//! - Units: bottle, can, plate
//! - Drinks with a single-unit product unit each, plus a 24-bottle case
//! - Foods, six tables, one employee, one supplier
//! - One approved purchase order (cases of lager) and one open bill

use std::env;
use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use bistro_core::{
    AddItemsRequest, CreatePurchaseOrderRequest, EmployeeRole, LineItemRequest, NewDiningTable,
    NewDrink, NewEmployee, NewFood, NewProductUnit, NewSupplier, PurchaseLineRequest,
};
use bistro_db::{AppConfig, Database};

/// (name, unit, price in cents, opening stock)
const DRINKS: &[(&str, &str, i64, i64)] = &[
    ("Lager", "bottle", 250, 48),
    ("Cola", "can", 150, 60),
    ("Sparkling Water", "bottle", 120, 36),
];

/// (name, price in cents)
const FOODS: &[(&str, i64)] = &[
    ("Spring Rolls", 600),
    ("Beef Pho", 1150),
    ("Grilled Pork Rice", 1050),
    ("Mango Salad", 700),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bistro POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides config)");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = PathBuf::from(path);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🌱 Bistro POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config())
        .await?
        .with_order_limits(config.order_limits());

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.tables().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} tables", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let catalog = db.catalog();
    let mut units = Vec::new();
    for name in ["bottle", "can", "plate"] {
        units.push(catalog.create_unit(name).await?);
    }
    let unit_id = |name: &str| {
        units
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.id.clone())
            .ok_or_else(|| format!("unit {name} missing"))
    };

    let drinks_category = catalog.create_category("Drinks").await?;
    let kitchen_category = catalog.create_category("Kitchen").await?;

    let mut singles = Vec::new();
    for (name, unit, price_cents, stock) in DRINKS {
        let (drink, single) = catalog
            .create_drink(&NewDrink {
                name: name.to_string(),
                category_id: Some(drinks_category.id.clone()),
                unit_id: unit_id(unit)?,
                price_cents: *price_cents,
                initial_quantity: *stock,
                image_url: None,
            })
            .await?;
        println!("  + {} ({} in stock)", single.name, drink.quantity);
        singles.push((drink, single));
    }

    let (lager, lager_bottle) = &singles[0];
    let lager_case = catalog
        .create_product_unit(&NewProductUnit {
            drink_id: lager.id.clone(),
            name: "Lager (case of 24)".to_string(),
            price_cents: 5400,
            base_items_count: 24,
        })
        .await?;

    let mut foods = Vec::new();
    for (name, price_cents) in FOODS {
        foods.push(
            catalog
                .create_food(&NewFood {
                    name: name.to_string(),
                    category_id: Some(kitchen_category.id.clone()),
                    price_cents: *price_cents,
                    image_url: None,
                })
                .await?,
        );
    }
    println!("✓ Catalog: {} drinks, {} foods", singles.len(), foods.len());

    // Floor and directory
    let mut tables = Vec::new();
    for number in 1..=6 {
        let seats = if number % 3 == 0 { 6 } else { 4 };
        tables.push(db.tables().create(&NewDiningTable { number, seats }).await?);
    }
    let employee = db
        .directory()
        .create_employee(&NewEmployee {
            name: "Demo Server".to_string(),
            email: "server@bistro.local".to_string(),
            role: EmployeeRole::Staff,
        })
        .await?;
    let supplier = db
        .directory()
        .create_supplier(&NewSupplier {
            name: "Riverside Beverages".to_string(),
            phone: Some("0283 555 0199".to_string()),
            address: None,
        })
        .await?;
    println!("✓ {} tables, 1 employee, 1 supplier", tables.len());

    // Receiving: two cases of lager
    let po = db
        .purchasing()
        .create_purchase_order(&CreatePurchaseOrderRequest {
            supplier_id: supplier.id.clone(),
            details: vec![PurchaseLineRequest {
                product_unit_id: lager_case.id.clone(),
                quantity: 2,
                unit_cost_cents: 3600,
            }],
            note: Some("Opening delivery".to_string()),
        })
        .await?;
    let approved = db.purchasing().approve_purchase_order(&po.order.id).await?;
    info!(receipt_id = %approved.receipt.receipt.id, "Demo purchase order received");

    let level = db.inventory().stock_level(&lager.id).await?;
    println!("✓ Purchase order approved, {} now at {}", level.name, level.quantity);

    // One round on table 1
    let bill = db
        .orders()
        .add_items_to_bill(&AddItemsRequest {
            employee_id: employee.id.clone(),
            table_id: tables[0].id.clone(),
            items: vec![
                LineItemRequest::product_unit(lager_bottle.id.clone(), 2),
                LineItemRequest::food(foods[0].id.clone(), 1),
            ],
        })
        .await?;
    println!("✓ Table 1 bill opened:");
    println!("{}", serde_json::to_string_pretty(&bill)?);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
