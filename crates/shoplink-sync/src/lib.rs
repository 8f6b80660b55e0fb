//! # shoplink-sync: Marketplace Catalog Sync Engine
//!
//! Pulls product listings from a remote marketplace and reconciles them
//! into the local catalog, idempotently and under explicit budgets.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Sync Engine                                    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 SyncService (composition root)                   │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ ShopDirectory  │  │SyncOrchestrator│  │  RunLedger             │    │
//! │  │                │  │                │  │                        │    │
//! │  │ list / select  │  │ pages under    │  │ bounded audit trail,   │    │
//! │  │ bound shop     │  │ budgets, cycle │  │ best effort            │    │
//! │  │                │  │ detection      │  │                        │    │
//! │  └───────┬────────┘  └───┬────────┬───┘  └────────────────────────┘    │
//! │          │               ▼        ▼                                     │
//! │          │        ┌───────────┐ ┌──────────────────┐                    │
//! │          │        │CatalogPager│ │ProductReconciler │                   │
//! │          │        └─────┬─────┘ └──────────────────┘                    │
//! │          ▼              ▼                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AuthGateway: encrypted credentials, refresh-and-retry-once      │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  RemoteCatalogProvider: LiveProvider (signed HTTP) | Fixture     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! ### Foundations
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types and categories
//! - [`signing`] - Request signatures (HMAC-SHA256)
//! - [`crypto`] - Encryption of credentials at rest
//! - [`envelope`] - Typed response envelope decoding
//! - [`store`] - Store traits and their SQLite implementations
//! - [`provider`] - Marketplace capability (live and fixture)
//!
//! ### Engine
//! - [`auth`] - Token lifecycle
//! - [`shops`] - Shop listing and selection
//! - [`pager`] - One page per call
//! - [`reconciler`] - Idempotent upsert by SKU
//! - [`orchestrator`] - Multi-page runs
//! - [`ledger`] - Run history
//! - [`service`] - Operator-facing facade
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shoplink_sync::{SyncConfig, SyncService};
//! use shoplink_core::BulkImportRequest;
//!
//! let config = SyncConfig::load(None)?;
//! let service = SyncService::open(config).await?;
//!
//! service.configure_app(Some("app-key"), "app-secret").await?;
//! service.authorize("auth-code-from-redirect").await?;
//!
//! let result = service
//!     .bulk_import(BulkImportRequest { dry_run: true, ..Default::default() })
//!     .await;
//! println!("created={} updated={} skipped={}", result.created, result.updated, result.skipped);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod provider;
pub mod signing;
pub mod store;

pub mod auth;
pub mod ledger;
pub mod orchestrator;
pub mod pager;
pub mod reconciler;
pub mod service;
pub mod shops;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{AuthGateway, AuthState, AuthStatus, Credentials};
pub use config::{ProviderKind, SyncConfig};
pub use crypto::SecretCipher;
pub use envelope::Envelope;
pub use error::{SyncError, SyncResult};
pub use ledger::RunLedger;
pub use orchestrator::SyncOrchestrator;
pub use pager::CatalogPager;
pub use provider::{
    AccessContext, AppCredentials, CatalogPage, FixtureProvider, LiveProvider, PageQuery,
    RemoteCatalogProvider, TokenGrant,
};
pub use reconciler::{ProductReconciler, SkuIndex};
pub use service::SyncService;
pub use shops::{ShopBinding, ShopDirectory};
pub use store::{CatalogStore, LedgerStore, SettingsStore, Stores};
