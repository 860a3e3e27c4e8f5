//! # bistro-db: Database Layer and Engines for Bistro POS
//!
//! SQLite storage for the restaurant floor, plus the engines that keep
//! bills, stock and purchase orders consistent with each other.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bistro POS Data Flow                             │
//! │                                                                         │
//! │  API handler (add items to table 5)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bistro-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌───────────────┐    │   │
//! │  │   │   Engines     │   │  Repositories │   │  Database     │    │   │
//! │  │   │               │   │               │   │  (pool.rs)    │    │   │
//! │  │   │ OrderEngine   │──►│ BillRepo      │──►│ SqlitePool    │    │   │
//! │  │   │ Purchasing    │   │ InventoryLedg │   │ UnitOfWork    │    │   │
//! │  │   │ Reservation   │   │ CatalogRepo   │   │ Migrations    │    │   │
//! │  │   └───────────────┘   └───────────────┘   └───────────────┘    │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - `bistro.toml` + environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`unit_of_work`] - One transaction per engine call
//! - [`repository`] - Table-level access
//! - [`engine`] - Multi-aggregate operations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bistro_db::{AppConfig, Database};
//!
//! let config = AppConfig::load_or_default(None);
//! let db = Database::new(config.db_config())
//!     .await?
//!     .with_order_limits(config.order_limits());
//!
//! let bill = db.orders().add_items_to_bill(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

pub use engine::{OrderEngine, PurchasingEngine, ReservationEngine};

// Repository re-exports for convenience
pub use repository::{
    BillRepository, CatalogRepository, DirectoryRepository, InventoryLedger, PurchaseRepository,
    ReportRepository, ReservationRepository, TableRepository,
};
