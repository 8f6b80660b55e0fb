//! # shoplink-db: Database Layer for Shoplink
//!
//! This crate provides local persistence for the catalog sync engine.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shoplink Data Flow                               │
//! │                                                                         │
//! │  SyncService (bulk_import, run_history, ...)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    shoplink-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CatalogRepo   │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ SettingsRepo  │    │   _schema    │  │   │
//! │  │   │               │    │ RunRepo       │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (path from [database] in config.toml)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shoplink_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("shoplink.db")).await?;
//! let entries = db.catalog().list_all().await?;
//! let history = db.runs().recent(10).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::runs::RunRepository;
pub use repository::settings::SettingsRepository;
