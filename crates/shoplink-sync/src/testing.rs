//! Scripted provider and builders shared by the engine's unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::auth::AuthGateway;
use crate::crypto::SecretCipher;
use crate::error::{SyncError, SyncResult};
use crate::provider::{
    AccessContext, AppCredentials, CatalogPage, PageQuery, RemoteCatalogProvider, TokenGrant,
};
use crate::store::memory::MemorySettings;
use crate::store::SettingsStore;
use shoplink_core::{AuthorizedShop, PriceUnit, RemoteProductPreview};

pub fn cipher() -> SecretCipher {
    SecretCipher::from_key([3u8; 32])
}

pub fn shop(id: &str, cipher: &str) -> AuthorizedShop {
    AuthorizedShop {
        id: id.to_string(),
        name: format!("Shop {}", id),
        region: "US".to_string(),
        cipher: cipher.to_string(),
        code: None,
    }
}

pub fn product(id: &str, seller_sku: Option<&str>, price: &str, status: &str) -> RemoteProductPreview {
    RemoteProductPreview {
        id: id.to_string(),
        title: format!("Product {}", id),
        status: status.to_string(),
        seller_sku: seller_sku.map(String::from),
        price: price.to_string(),
        currency: Some("USD".to_string()),
        price_unit: PriceUnit::Major,
    }
}

pub fn page(products: Vec<RemoteProductPreview>, next: Option<&str>) -> CatalogPage {
    CatalogPage {
        total_count: Some(products.len() as u64),
        products,
        next_page_token: next.map(String::from),
    }
}

/// Provider whose responses are queued up front.
///
/// Search calls pop scripted pages in order; once the queue is empty the
/// fallback page (if any) is returned forever.
#[derive(Default)]
pub struct ScriptedProvider {
    shops: Mutex<Vec<AuthorizedShop>>,
    pages: Mutex<VecDeque<SyncResult<CatalogPage>>>,
    fallback: Mutex<Option<CatalogPage>>,
    reject_remaining: AtomicU32,
    refresh_failure: Mutex<Option<fn() -> SyncError>>,
    tokens_issued: AtomicU32,
    refreshes: AtomicU32,
    searches: AtomicU32,
    seen_tokens: Mutex<Vec<String>>,
    seen_queries: Mutex<Vec<PageQuery>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shops(shops: Vec<AuthorizedShop>) -> Self {
        let provider = Self::default();
        *provider.shops.lock().unwrap() = shops;
        provider
    }

    pub fn push_page(&self, page: CatalogPage) {
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self, err: SyncError) {
        self.pages.lock().unwrap().push_back(Err(err));
    }

    pub fn set_fallback(&self, page: CatalogPage) {
        *self.fallback.lock().unwrap() = Some(page);
    }

    /// Rejects the next `n` authenticated calls with an auth error.
    pub fn reject_next(&self, n: u32) {
        self.reject_remaining.store(n, Ordering::SeqCst);
    }

    /// Makes every refresh grant fail with the error `make` builds.
    pub fn fail_refreshes(&self, make: fn() -> SyncError) {
        *self.refresh_failure.lock().unwrap() = Some(make);
    }

    pub fn refreshes(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> u32 {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }

    pub fn seen_queries(&self) -> Vec<PageQuery> {
        self.seen_queries.lock().unwrap().clone()
    }

    fn grant(&self) -> TokenGrant {
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        TokenGrant {
            access_token: format!("access-{}", n),
            access_token_expire_in: 3600,
            refresh_token: format!("refresh-{}", n),
            refresh_token_expire_in: 86400,
            seller_name: Some("Scripted Seller".to_string()),
        }
    }

    fn gate(&self, ctx: &AccessContext) -> SyncResult<()> {
        self.seen_tokens.lock().unwrap().push(ctx.access_token.clone());
        let remaining = self.reject_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reject_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::AuthRejected {
                code: Some(105002),
                message: "access token expired".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCatalogProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn exchange_code(&self, _app: &AppCredentials, _code: &str) -> SyncResult<TokenGrant> {
        Ok(self.grant())
    }

    async fn refresh_token(&self, _app: &AppCredentials, _rt: &str) -> SyncResult<TokenGrant> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = *self.refresh_failure.lock().unwrap() {
            return Err(make());
        }
        Ok(self.grant())
    }

    async fn list_shops(&self, ctx: &AccessContext) -> SyncResult<Vec<AuthorizedShop>> {
        self.gate(ctx)?;
        Ok(self.shops.lock().unwrap().clone())
    }

    async fn search_products(
        &self,
        ctx: &AccessContext,
        query: &PageQuery,
    ) -> SyncResult<CatalogPage> {
        self.gate(ctx)?;
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.seen_queries.lock().unwrap().push(query.clone());

        if let Some(next) = self.pages.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SyncError::transport("no scripted page left"))
    }
}

/// Gateway over in-memory settings, app configured but not yet authorized.
pub async fn configured_gateway(
    provider: Arc<ScriptedProvider>,
) -> (AuthGateway, Arc<MemorySettings>) {
    let settings = Arc::new(MemorySettings::default());
    let gateway = AuthGateway::new(
        provider,
        settings.clone() as Arc<dyn SettingsStore>,
        cipher(),
        std::time::Duration::from_secs(30),
    );
    gateway.configure_app("app-key", "app-secret").await.unwrap();
    (gateway, settings)
}

/// Gateway that has exchanged an authorization code.
pub async fn authorized_gateway(
    provider: Arc<ScriptedProvider>,
) -> (AuthGateway, Arc<MemorySettings>) {
    let (gateway, settings) = configured_gateway(provider).await;
    gateway.exchange_authorization_code("code-1").await.unwrap();
    (gateway, settings)
}
