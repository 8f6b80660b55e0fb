//! # Remote Catalog Providers
//!
//! The engine talks to the marketplace only through [`RemoteCatalogProvider`].
//! Which implementation it gets is decided once, from `[provider].kind`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     RemoteCatalogProvider                               │
//! │                                                                         │
//! │   exchange_code ─┐                                                      │
//! │   refresh_token ─┴── token API (unsigned, app key + secret)             │
//! │                                                                         │
//! │   list_shops ─────┐                                                     │
//! │   search_products ┴── open API (signed, access token header)            │
//! │                                                                         │
//! │   ┌─────────────────────┐        ┌─────────────────────┐               │
//! │   │ LiveProvider        │        │ FixtureProvider     │               │
//! │   │ reqwest + signing   │        │ in-process catalog  │               │
//! │   └─────────────────────┘        └─────────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod fixture;
mod live;

pub use fixture::{fixture_shop, generate_catalog, FixtureProvider, FIXTURE_PRODUCT_COUNT};
pub use live::{LiveProvider, ACCESS_TOKEN_HEADER};

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::SyncResult;
use shoplink_core::{AuthorizedShop, RemoteProductPreview};

// =============================================================================
// Call Inputs
// =============================================================================

/// App-level credentials used by the token API.
#[derive(Clone)]
pub struct AppCredentials {
    pub app_key: String,
    pub app_secret: String,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// Everything a signed open API call needs.
#[derive(Clone)]
pub struct AccessContext {
    pub app_key: String,
    pub app_secret: String,
    pub access_token: String,
}

impl std::fmt::Debug for AccessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessContext")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// One page request against a shop's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub shop_cipher: String,
    pub page_size: u32,
    /// `None` requests the first page.
    pub page_token: Option<String>,
}

// =============================================================================
// Call Outputs
// =============================================================================

/// Token payload returned by both grant types.
///
/// Expiry values are relative seconds, though some regions send an
/// absolute unix timestamp instead.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub access_token_expire_in: i64,
    pub refresh_token: String,
    #[serde(default)]
    pub refresh_token_expire_in: i64,
    #[serde(default)]
    pub seller_name: Option<String>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token_expire_in", &self.access_token_expire_in)
            .field("refresh_token_expire_in", &self.refresh_token_expire_in)
            .field("seller_name", &self.seller_name)
            .finish_non_exhaustive()
    }
}

/// One page of remote listings, already normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub products: Vec<RemoteProductPreview>,
    pub total_count: Option<u64>,
    pub next_page_token: Option<String>,
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Marketplace capability used by the gateway, directory and pager.
#[async_trait]
pub trait RemoteCatalogProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Exchanges a one-time authorization code for tokens.
    async fn exchange_code(&self, app: &AppCredentials, auth_code: &str) -> SyncResult<TokenGrant>;

    /// Trades a refresh token for a new token pair.
    async fn refresh_token(
        &self,
        app: &AppCredentials,
        refresh_token: &str,
    ) -> SyncResult<TokenGrant>;

    /// Shops authorized under the access token.
    async fn list_shops(&self, ctx: &AccessContext) -> SyncResult<Vec<AuthorizedShop>>;

    /// One page of a shop's product listings.
    async fn search_products(&self, ctx: &AccessContext, query: &PageQuery)
        -> SyncResult<CatalogPage>;
}

/// Builds the provider selected in configuration.
pub fn from_settings(settings: &ProviderSettings) -> SyncResult<Arc<dyn RemoteCatalogProvider>> {
    Ok(match settings.kind {
        ProviderKind::Live => Arc::new(LiveProvider::new(settings)?),
        ProviderKind::Fixture => Arc::new(FixtureProvider::new()),
    })
}
