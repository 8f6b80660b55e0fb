//! # Validation Module
//!
//! The rules that decide whether and how a remote listing lands in the
//! local catalog.
//!
//! ## Decision Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Remote Listing                                   │
//! │                                                                         │
//! │  validate_remote_product()                                             │
//! │  ├── id blank?            → skip "missing product id"                  │
//! │  ├── title blank?         → skip "title is required"                   │
//! │  └── price not positive?  → skip "... price ..."                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  import_sku()     seller SKU, or "remote:<id>" when there is none      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  normalize_sku()  trim + lowercase → index lookup key                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  map_remote_status()  allow-list → published, anything else → draft    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shoplink_core::validation::{import_sku, map_remote_status, normalize_sku};
//! use shoplink_core::CatalogStatus;
//!
//! assert_eq!(import_sku(None, "p1"), "remote:p1");
//! assert_eq!(normalize_sku(" Mug-01 "), "mug-01");
//! assert_eq!(map_remote_status("ACTIVATE"), (true, CatalogStatus::Published));
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CatalogStatus, RemoteProductPreview};
use crate::SYNTHETIC_SKU_PREFIX;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Remote statuses that make an entry sellable. Compared after trim + lowercase.
pub const PUBLISHED_STATUSES: &[&str] = &[
    "active",
    "activate",
    "available",
    "on_sale",
    "live",
    "approved",
];

// =============================================================================
// SKU Rules
// =============================================================================

/// Normalizes a SKU for matching: trim + lowercase.
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_lowercase()
}

/// Picks the SKU a remote listing is imported under.
///
/// A non-blank seller SKU wins (trimmed); otherwise the listing gets the
/// synthetic `remote:<id>` SKU so re-imports still update-match.
pub fn import_sku(seller_sku: Option<&str>, remote_id: &str) -> String {
    match seller_sku.map(str::trim) {
        Some(sku) if !sku.is_empty() => sku.to_string(),
        _ => format!("{}{}", SYNTHETIC_SKU_PREFIX, remote_id.trim()),
    }
}

// =============================================================================
// Status Mapping
// =============================================================================

/// Maps a remote status onto `(is_active, status)`.
///
/// Unknown and empty statuses land on draft/inactive.
pub fn map_remote_status(remote: &str) -> (bool, CatalogStatus) {
    let remote = remote.trim().to_lowercase();
    if PUBLISHED_STATUSES.contains(&remote.as_str()) {
        (true, CatalogStatus::Published)
    } else {
        (false, CatalogStatus::Draft)
    }
}

// =============================================================================
// Provenance Tags
// =============================================================================

/// Tags recording where an entry came from.
pub fn provenance_tags(shop_id: &str, remote_id: &str) -> Vec<String> {
    vec![format!("shop:{}", shop_id), format!("remote:{}", remote_id)]
}

/// Unions two tag lists, keeping first-seen order and dropping blanks.
pub fn merge_tags(existing: &[String], extra: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + extra.len());
    for tag in existing.iter().chain(extra) {
        let tag = tag.trim();
        if !tag.is_empty() && !merged.iter().any(|t| t == tag) {
            merged.push(tag.to_string());
        }
    }
    merged
}

// =============================================================================
// Listing Validation
// =============================================================================

/// Checks that a listing can be imported and returns its price.
///
/// ## Example
/// ```rust
/// use shoplink_core::validation::validate_remote_product;
/// use shoplink_core::{PriceUnit, RemoteProductPreview};
///
/// let mut listing = RemoteProductPreview {
///     id: "p1".into(),
///     title: "Mug".into(),
///     status: "ACTIVATE".into(),
///     seller_sku: None,
///     price: "12.00".into(),
///     currency: None,
///     price_unit: PriceUnit::Major,
/// };
/// assert_eq!(validate_remote_product(&listing).unwrap().cents(), 1200);
///
/// listing.price = "0".into();
/// assert!(validate_remote_product(&listing).is_err());
/// ```
pub fn validate_remote_product(product: &RemoteProductPreview) -> ValidationResult<Money> {
    if product.id.trim().is_empty() {
        return Err(ValidationError::MissingProductId);
    }

    if product.title.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "title".to_string(),
        });
    }

    let raw = product.price.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingPrice);
    }

    let price = Money::parse_price(raw, product.price_unit).ok_or_else(|| ValidationError::InvalidPrice {
        raw: raw.to_string(),
    })?;

    if !price.is_positive() {
        return Err(ValidationError::NonPositivePrice {
            cents: price.cents(),
        });
    }

    Ok(price)
}

// =============================================================================
// Unit Tests
// =============================================================================
