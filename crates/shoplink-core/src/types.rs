//! # Domain Types
//!
//! Catalog and marketplace types shared by the db and sync crates.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  REMOTE (transient)                    LOCAL (source of truth)          │
//! │  ┌─────────────────────┐               ┌─────────────────────┐          │
//! │  │ AuthorizedShop      │               │ CatalogEntry        │          │
//! │  │  id, name, region   │               │  id (UUID)          │          │
//! │  │  cipher (per call)  │               │  sku (match key)    │          │
//! │  └─────────────────────┘               │  name, price_cents  │          │
//! │  ┌─────────────────────┐   reconcile   │  is_active, status  │          │
//! │  │ RemoteProductPreview│ ────────────► │  tags (provenance)  │          │
//! │  │  id, title, status  │               └─────────────────────┘          │
//! │  │  seller_sku, price  │                                                │
//! │  └─────────────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every catalog entry has:
//! - `id`: UUID v4 - immutable, used by the catalog store
//! - `sku`: business identifier, matched after trim + lowercase

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, PriceUnit};

// =============================================================================
// Catalog Status
// =============================================================================

/// Publication status of a local catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    /// Visible on the storefront.
    Published,
    /// Hidden; also the landing state for any unrecognized remote status.
    #[default]
    Draft,
}

impl CatalogStatus {
    /// Lowercase wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogStatus::Published => "published",
            CatalogStatus::Draft => "draft",
        }
    }
}

impl std::fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Catalog Entry
// =============================================================================

/// A product in the merchant's own catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit as imported (original casing kept).
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Price in cents.
    pub price_cents: i64,

    /// ISO currency code reported by the marketplace, if any.
    pub currency: Option<String>,

    /// Whether the entry is sellable.
    pub is_active: bool,

    /// Publication status.
    pub status: CatalogStatus,

    /// De-duplicated tag set (includes import provenance).
    pub tags: Vec<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Fields required to create a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogEntry {
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub currency: Option<String>,
    pub is_active: bool,
    pub status: CatalogStatus,
    pub tags: Vec<String>,
}

/// Partial update applied to an existing catalog entry.
///
/// `None` fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPatch {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
    pub status: Option<CatalogStatus>,
    pub tags: Option<Vec<String>>,
}

impl CatalogPatch {
    /// Applies the patch to an in-memory entry.
    pub fn apply_to(&self, entry: &mut CatalogEntry, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            entry.name = name.clone();
        }
        if let Some(price) = self.price_cents {
            entry.price_cents = price;
        }
        if let Some(currency) = &self.currency {
            entry.currency = Some(currency.clone());
        }
        if let Some(active) = self.is_active {
            entry.is_active = active;
        }
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(tags) = &self.tags {
            entry.tags = tags.clone();
        }
        entry.updated_at = now;
    }
}

// =============================================================================
// Marketplace Types
// =============================================================================

/// A remote shop the current credentials are authorized for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedShop {
    /// Human-readable remote shop id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Marketplace region code (e.g. "US", "GB").
    pub region: String,

    /// Opaque identifier required on every shop-scoped call.
    pub cipher: String,

    /// Seller-facing shop code, when the marketplace provides one.
    pub code: Option<String>,
}

/// Normalized view of one remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProductPreview {
    /// Remote product id (may be empty on malformed listings).
    pub id: String,

    /// Listing title.
    pub title: String,

    /// Raw remote status string.
    pub status: String,

    /// Seller SKU of the first variant, if present.
    pub seller_sku: Option<String>,

    /// Raw decimal price string of the first variant.
    pub price: String,

    /// Currency of the first variant's price.
    pub currency: Option<String>,

    /// Unit the provider reports `price` in.
    #[serde(default)]
    pub price_unit: PriceUnit,
}

impl RemoteProductPreview {
    /// Price converted to cents, if the raw string is numeric.
    pub fn price_money(&self) -> Option<Money> {
        Money::parse_price(&self.price, self.price_unit)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CatalogEntry {
        let at = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        CatalogEntry {
            id: "id-1".to_string(),
            sku: "SKU-1".to_string(),
            name: "Old".to_string(),
            price_cents: 100,
            currency: None,
            is_active: false,
            status: CatalogStatus::Draft,
            tags: vec!["keep".to_string()],
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_status_default_is_draft() {
        assert_eq!(CatalogStatus::default(), CatalogStatus::Draft);
        assert_eq!(CatalogStatus::Published.to_string(), "published");
    }

    #[test]
    fn test_patch_only_touches_set_fields() {
        let mut e = entry();
        let now = Utc::now();
        CatalogPatch {
            price_cents: Some(250),
            is_active: Some(true),
            ..Default::default()
        }
        .apply_to(&mut e, now);

        assert_eq!(e.name, "Old");
        assert_eq!(e.price_cents, 250);
        assert!(e.is_active);
        assert_eq!(e.tags, vec!["keep".to_string()]);
        assert_eq!(e.updated_at, now);
    }

    #[test]
    fn test_preview_price_money() {
        let preview = RemoteProductPreview {
            id: "p1".to_string(),
            title: "Mug".to_string(),
            status: "ACTIVATE".to_string(),
            seller_sku: None,
            price: "12.50".to_string(),
            currency: Some("USD".to_string()),
            price_unit: PriceUnit::Major,
        };
        assert_eq!(preview.price_money(), Some(Money::from_cents(1250)));
    }
}
