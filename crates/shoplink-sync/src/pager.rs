//! # Catalog Pager
//!
//! Fetches exactly one page of a shop's listings per call.
//!
//! Page sizes are clamped to `[1, 100]`. A blank cursor means "first page",
//! and a blank or absent next cursor means "last page". Listings are passed
//! through as normalized previews; bad prices are left for the reconciler
//! to report.

use std::sync::Arc;
use tracing::debug;

use crate::auth::AuthGateway;
use crate::error::SyncResult;
use crate::provider::{CatalogPage, PageQuery, RemoteCatalogProvider};
use shoplink_core::clamp_page_size;

pub struct CatalogPager {
    provider: Arc<dyn RemoteCatalogProvider>,
    auth: Arc<AuthGateway>,
}

impl CatalogPager {
    pub fn new(provider: Arc<dyn RemoteCatalogProvider>, auth: Arc<AuthGateway>) -> Self {
        CatalogPager { provider, auth }
    }

    pub async fn fetch_page(
        &self,
        shop_cipher: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> SyncResult<CatalogPage> {
        let query = PageQuery {
            shop_cipher: shop_cipher.to_string(),
            page_size: clamp_page_size(page_size),
            page_token: non_blank(page_token),
        };

        let provider = &self.provider;
        let query_ref = &query;
        let mut page = self
            .auth
            .authorized(|ctx| async move { provider.search_products(&ctx, query_ref).await })
            .await?;

        page.next_page_token = non_blank(page.next_page_token.as_deref());

        debug!(
            shop_cipher = %query.shop_cipher,
            page_size = query.page_size,
            products = page.products.len(),
            has_next = page.next_page_token.is_some(),
            "Fetched catalog page"
        );
        Ok(page)
    }
}

fn non_blank(token: Option<&str>) -> Option<String> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}
