//! # Repository Module
//!
//! Database repository implementations for Shoplink.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  shoplink-sync store traits          Repositories (this module)        │
//! │  ───────────────────────────         ──────────────────────────        │
//! │  CatalogStore  ──────────────────►   CatalogRepository                 │
//! │    list_all / create / update          catalog_entries                 │
//! │                                                                         │
//! │  SettingsStore ──────────────────►   SettingsRepository                │
//! │    get / put / delete                  settings                        │
//! │                                                                         │
//! │  LedgerStore   ──────────────────►   RunRepository                     │
//! │    append / trim / recent              sync_runs                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Local catalog CRUD
//! - [`SettingsRepository`](settings::SettingsRepository) - Key/value settings
//! - [`RunRepository`](runs::RunRepository) - Sync run history

pub mod catalog;
pub mod runs;
pub mod settings;
