//! # Fixture Provider
//!
//! Deterministic in-process marketplace. Used for demos, local development
//! and engine tests; it never touches the network.
//!
//! The generated catalog deliberately contains listings the reconciler
//! must skip (zero prices, missing titles) and listings without a seller
//! SKU, so a fixture import exercises every path.

use async_trait::async_trait;

use super::{AccessContext, AppCredentials, CatalogPage, PageQuery, RemoteCatalogProvider, TokenGrant};
use crate::error::{SyncError, SyncResult};
use shoplink_core::{AuthorizedShop, PriceUnit, RemoteProductPreview};

/// Number of listings in the default fixture catalog.
pub const FIXTURE_PRODUCT_COUNT: usize = 45;

const ACCESS_TTL_SECS: i64 = 7 * 24 * 3600;
const REFRESH_TTL_SECS: i64 = 30 * 24 * 3600;

/// Envelope code the fixture uses for an unknown shop cipher.
const SHOP_NOT_FOUND: i64 = 36009003;

/// In-memory provider with a fixed shop list and catalog.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    shops: Vec<AuthorizedShop>,
    products: Vec<RemoteProductPreview>,
}

impl Default for FixtureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureProvider {
    /// One shop and the generated catalog.
    pub fn new() -> Self {
        Self::with_products(generate_catalog(FIXTURE_PRODUCT_COUNT))
    }

    /// One shop serving the given listings.
    pub fn with_products(products: Vec<RemoteProductPreview>) -> Self {
        FixtureProvider {
            shops: vec![fixture_shop()],
            products,
        }
    }

    /// Replaces the authorized shop list.
    pub fn with_shops(mut self, shops: Vec<AuthorizedShop>) -> Self {
        self.shops = shops;
        self
    }

    fn grant(&self, access_token: String) -> TokenGrant {
        TokenGrant {
            access_token,
            access_token_expire_in: ACCESS_TTL_SECS,
            refresh_token: format!("fixture-refresh-{}", uuid::Uuid::new_v4()),
            refresh_token_expire_in: REFRESH_TTL_SECS,
            seller_name: Some("Fixture Seller".to_string()),
        }
    }
}

/// The shop every fixture provider starts with.
pub fn fixture_shop() -> AuthorizedShop {
    AuthorizedShop {
        id: "fixture-shop".to_string(),
        name: "Fixture Shop".to_string(),
        region: "US".to_string(),
        cipher: "fixture-cipher".to_string(),
        code: Some("FIXTURE01".to_string()),
    }
}

/// Generates `count` listings with stable ids `fx-001`, `fx-002`, ...
///
/// Every 7th listing has no seller SKU, every 9th is a draft, every 11th
/// has a zero price and every 13th has no title.
pub fn generate_catalog(count: usize) -> Vec<RemoteProductPreview> {
    (1..=count)
        .map(|i| RemoteProductPreview {
            id: format!("fx-{:03}", i),
            title: if i % 13 == 0 {
                String::new()
            } else {
                format!("Fixture product {}", i)
            },
            status: if i % 9 == 0 { "DRAFT" } else { "ACTIVATE" }.to_string(),
            seller_sku: if i % 7 == 0 {
                None
            } else {
                Some(format!("FX-{:03}", i))
            },
            price: if i % 11 == 0 {
                "0".to_string()
            } else {
                format!("{}.{:02}", 4 + i, (i * 37) % 100)
            },
            currency: Some("USD".to_string()),
            price_unit: PriceUnit::Major,
        })
        .collect()
}

#[async_trait]
impl RemoteCatalogProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn exchange_code(&self, _app: &AppCredentials, auth_code: &str) -> SyncResult<TokenGrant> {
        if auth_code.trim().is_empty() {
            return Err(SyncError::Provider {
                code: 36004003,
                message: "auth_code is required".to_string(),
                request_id: None,
            });
        }
        Ok(self.grant(format!("fixture-access-{}", uuid::Uuid::new_v4())))
    }

    async fn refresh_token(
        &self,
        _app: &AppCredentials,
        _refresh_token: &str,
    ) -> SyncResult<TokenGrant> {
        Ok(self.grant(format!("fixture-access-{}", uuid::Uuid::new_v4())))
    }

    async fn list_shops(&self, _ctx: &AccessContext) -> SyncResult<Vec<AuthorizedShop>> {
        Ok(self.shops.clone())
    }

    async fn search_products(
        &self,
        _ctx: &AccessContext,
        query: &PageQuery,
    ) -> SyncResult<CatalogPage> {
        if !self.shops.iter().any(|s| s.cipher == query.shop_cipher) {
            return Err(SyncError::Provider {
                code: SHOP_NOT_FOUND,
                message: format!("shop cipher '{}' is not authorized", query.shop_cipher),
                request_id: None,
            });
        }

        let offset = match query.page_token.as_deref() {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| SyncError::Provider {
                code: 36009004,
                message: format!("invalid page_token '{}'", token),
                request_id: None,
            })?,
        };

        let start = offset.min(self.products.len());
        let end = (start + query.page_size.max(1) as usize).min(self.products.len());

        Ok(CatalogPage {
            products: self.products[start..end].to_vec(),
            total_count: Some(self.products.len() as u64),
            next_page_token: (end < self.products.len()).then(|| end.to_string()),
        })
    }
}
