//! # Error Types
//!
//! Domain-specific error types for shoplink-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shoplink-core errors (this file)                                      │
//! │  ├── CoreError        - Catalog rule violations                        │
//! │  └── ValidationError  - Why a remote listing cannot be imported        │
//! │                                                                         │
//! │  shoplink-db errors (separate crate)                                   │
//! │  └── DbError          - Store operation failures                       │
//! │                                                                         │
//! │  shoplink-sync errors (separate crate)                                 │
//! │  └── SyncError        - Auth, provider, transport, config failures     │
//! │                                                                         │
//! │  Flow: ValidationError → ImportFailure.reason (never aborts a run)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Catalog rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Catalog entry cannot be found.
    #[error("Catalog entry not found: {0}")]
    EntryNotFound(String),

    /// A new entry would collide with an existing normalized SKU.
    #[error("SKU '{sku}' already exists")]
    DuplicateSku { sku: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Reasons a remote listing is skipped.
///
/// The `Display` text is what lands in `ImportFailure::reason`, so price
/// problems always mention "price".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The listing has no remote id.
    #[error("missing product id")]
    MissingProductId,

    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// No price string on the first variant.
    #[error("missing price")]
    MissingPrice,

    /// Price string is not numeric.
    #[error("invalid price '{raw}'")]
    InvalidPrice { raw: String },

    /// Price parsed but is zero or negative.
    #[error("price must be positive, got {cents} cents")]
    NonPositivePrice { cents: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
