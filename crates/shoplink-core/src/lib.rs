//! # shoplink-core: Pure Domain Logic for Shoplink
//!
//! This crate holds the catalog-sync rules as pure functions with zero I/O
//! dependencies. The engine in `shoplink-sync` feeds it remote listings and
//! persists whatever it decides.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shoplink Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Operator surface (CLI)                       │   │
//! │  │    authorize ──► shops ──► preview ──► import ──► history       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    shoplink-sync (engine)                       │   │
//! │  │    AuthGateway, CatalogPager, ProductReconciler, Orchestrator   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shoplink-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  import   │  │ validation│  │   │
//! │  │   │ Catalog   │  │  Money    │  │ Import    │  │ SKU rules │  │   │
//! │  │   │ Remote    │  │  parsing  │  │ RunLedger │  │ status map│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog entries, remote listings, authorized shops
//! - [`money`] - Integer-cent money and marketplace price parsing
//! - [`import`] - Import results, budgets and run ledger records
//! - [`validation`] - SKU normalization, status mapping, product checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use shoplink_core::money::Money;
//! use shoplink_core::validation::normalize_sku;
//!
//! let price = Money::parse_amount("199.00").unwrap();
//! assert_eq!(price.cents(), 19900);
//!
//! assert_eq!(normalize_sku("  SKU-A1 "), "sku-a1");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod import;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use import::*;
pub use money::{Money, PriceUnit};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page the marketplace accepts on product search.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Upper bound on pages a single bulk import may fetch.
pub const MAX_PAGES_LIMIT: u32 = 200;

/// Upper bound on products a single bulk import may process.
pub const MAX_PRODUCTS_LIMIT: u32 = 10_000;

/// Failures kept per import result before the list is capped.
pub const DEFAULT_FAILURE_CAP: usize = 50;

/// Prefix of the synthetic SKU used when a listing carries no seller SKU.
pub const SYNTHETIC_SKU_PREFIX: &str = "remote:";
