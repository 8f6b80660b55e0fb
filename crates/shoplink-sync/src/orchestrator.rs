//! # Sync Orchestrator
//!
//! Drives the pager and the reconciler across pages under explicit budgets.
//!
//! ## Bulk Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  index = build once                                                     │
//! │  token = start token (resume) | first page                              │
//! │                                                                         │
//! │  loop:                                                                  │
//! │    page = fetch(token)                      error → stop, resume=token  │
//! │    if remaining product budget < page len:                              │
//! │        reconcile slice, truncated, resume = page.next          → stop   │
//! │    reconcile page                                                       │
//! │    next = page.next                                                     │
//! │      none                                   → done                      │
//! │      next == token or previous token        → cycle, truncated, no      │
//! │                                               resume               stop │
//! │      page or product budget spent           → truncated, resume = next  │
//! │    previous = token; token = next                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One page is reconciled before the next is fetched; there is never more
//! than one remote call in flight. Failures stop the run but a result is
//! always returned, with `error` set.

use std::sync::Arc;
use tracing::{info, warn};

use crate::pager::CatalogPager;
use crate::reconciler::ProductReconciler;
use crate::shops::ShopBinding;
use shoplink_core::{BulkImportResult, ImportResult, PageRequest, SyncBudget};

pub struct SyncOrchestrator {
    pager: Arc<CatalogPager>,
    reconciler: Arc<ProductReconciler>,
    failure_cap: usize,
}

impl SyncOrchestrator {
    pub fn new(
        pager: Arc<CatalogPager>,
        reconciler: Arc<ProductReconciler>,
        failure_cap: usize,
    ) -> Self {
        SyncOrchestrator {
            pager,
            reconciler,
            failure_cap,
        }
    }

    /// Fetches and reconciles a single page.
    pub async fn run_page(&self, shop: &ShopBinding, request: &PageRequest) -> ImportResult {
        let page_token = request
            .page_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);

        let page = match self
            .pager
            .fetch_page(&shop.cipher, request.page_size, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "Page fetch failed");
                let mut result = ImportResult::failed(request.dry_run, err.to_string());
                result.page_token = page_token;
                return result;
            }
        };

        let mut index = match self.reconciler.build_index().await {
            Ok(index) => index,
            Err(err) => {
                warn!(error = %err, "Could not list local catalog");
                let mut result = ImportResult::failed(request.dry_run, err.to_string());
                result.page_token = page_token;
                return result;
            }
        };

        let mut result = self
            .reconciler
            .reconcile(&mut index, shop.tag_id(), &page.products, request.dry_run)
            .await;
        result.page_token = page_token;
        result.next_page_token = page.next_page_token;
        result.total_count = page.total_count;
        result
    }

    /// Walks the catalog until it ends, a budget runs out or a cycle shows.
    pub async fn run_bulk(
        &self,
        shop: &ShopBinding,
        budget: SyncBudget,
        start_token: Option<&str>,
        dry_run: bool,
    ) -> BulkImportResult {
        let mut result = BulkImportResult::new(dry_run);
        let mut page_token: Option<String> = start_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        let mut previous_token: Option<String> = None;

        let mut index = match self.reconciler.build_index().await {
            Ok(index) => index,
            Err(err) => {
                warn!(error = %err, "Could not list local catalog");
                result.error = Some(err.to_string());
                result.next_page_token = page_token;
                return result;
            }
        };

        info!(
            shop_cipher = %shop.cipher,
            page_size = budget.page_size,
            max_pages = budget.max_pages,
            max_products = budget.max_products,
            dry_run,
            "Starting bulk import"
        );

        loop {
            let page = match self
                .pager
                .fetch_page(&shop.cipher, Some(budget.page_size), page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(error = %err, pages = result.pages_fetched, "Bulk import stopped on page error");
                    result.error = Some(err.to_string());
                    result.next_page_token = page_token;
                    break;
                }
            };
            result.pages_fetched += 1;

            let remaining = budget.max_products.saturating_sub(result.products_fetched) as usize;
            if remaining < page.products.len() {
                let slice = &page.products[..remaining];
                let page_result = self
                    .reconciler
                    .reconcile(&mut index, shop.tag_id(), slice, dry_run)
                    .await;
                result.products_fetched += slice.len() as u32;
                result.absorb(page_result, self.failure_cap);
                result.truncated = true;
                result.next_page_token = page.next_page_token;
                info!(products = result.products_fetched, "Product budget reached mid-page");
                break;
            }

            let page_result = self
                .reconciler
                .reconcile(&mut index, shop.tag_id(), &page.products, dry_run)
                .await;
            result.products_fetched += page.products.len() as u32;
            result.absorb(page_result, self.failure_cap);

            let Some(next) = page.next_page_token else {
                result.next_page_token = None;
                break;
            };

            if Some(&next) == page_token.as_ref() || Some(&next) == previous_token.as_ref() {
                warn!(token = %next, "Remote cursor repeated, stopping");
                result.truncated = true;
                result.next_page_token = None;
                break;
            }

            if result.pages_fetched >= budget.max_pages
                || result.products_fetched >= budget.max_products
            {
                result.truncated = true;
                result.next_page_token = Some(next);
                break;
            }

            previous_token = page_token.replace(next);
        }

        info!(
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            pages = result.pages_fetched,
            products = result.products_fetched,
            truncated = result.truncated,
            "Bulk import finished"
        );
        result
    }
}
