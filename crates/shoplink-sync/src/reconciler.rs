//! # Product Reconciler
//!
//! Merges one page of remote listings into the local catalog.
//!
//! ## Per-Product Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  listing ──► validate (id, title, positive price) ──✗──► skipped        │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  import sku = seller sku  |  "remote:<id>"                              │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  SkuIndex[normalize(sku)] ──found──► update (tags merged) ──► updated   │
//! │                 │                                                       │
//! │                 └─missing──► create (provenance tags)    ──► created    │
//! │                                                                         │
//! │  dry run: only the index changes; the store is never written            │
//! │  store error on one product: recorded as a skip, page continues         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The index is built from one full catalog listing and then kept current
//! in memory, so a run lists the catalog once no matter how many pages it
//! reconciles. Two listings with the same seller SKU land on the same
//! local entry; the later one wins.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::store::CatalogStore;
use shoplink_core::validation::{
    import_sku, map_remote_status, merge_tags, normalize_sku, provenance_tags,
    validate_remote_product,
};
use shoplink_core::{
    CatalogEntry, CatalogPatch, ImportFailure, ImportResult, NewCatalogEntry, RemoteProductPreview,
};

#[derive(Debug, Clone)]
struct IndexedEntry {
    id: String,
    tags: Vec<String>,
}

/// Local catalog entries keyed by normalized SKU.
#[derive(Debug, Clone, Default)]
pub struct SkuIndex {
    entries: HashMap<String, IndexedEntry>,
}

impl SkuIndex {
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        SkuIndex {
            entries: entries
                .iter()
                .map(|e| {
                    (
                        normalize_sku(&e.sku),
                        IndexedEntry {
                            id: e.id.clone(),
                            tags: e.tags.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.entries.contains_key(&normalize_sku(sku))
    }
}

/// Idempotent upsert of remote listings by SKU.
pub struct ProductReconciler {
    catalog: Arc<dyn CatalogStore>,
    failure_cap: usize,
}

impl ProductReconciler {
    pub fn new(catalog: Arc<dyn CatalogStore>, failure_cap: usize) -> Self {
        ProductReconciler {
            catalog,
            failure_cap,
        }
    }

    /// Lists the catalog once and indexes it.
    pub async fn build_index(&self) -> SyncResult<SkuIndex> {
        let entries = self.catalog.list_all().await?;
        let index = SkuIndex::from_entries(&entries);
        debug!(entries = index.len(), "Built SKU index");
        Ok(index)
    }

    /// Reconciles one batch of listings against `index`.
    pub async fn reconcile(
        &self,
        index: &mut SkuIndex,
        shop_tag_id: &str,
        products: &[RemoteProductPreview],
        dry_run: bool,
    ) -> ImportResult {
        let mut result = ImportResult::new(dry_run);
        result.products_fetched = products.len() as u32;

        for product in products {
            let price = match validate_remote_product(product) {
                Ok(price) => price,
                Err(err) => {
                    debug!(product_id = %product.id, reason = %err, "Skipping listing");
                    result.record_skip(ImportFailure::new(&product.id, err.to_string()), self.failure_cap);
                    continue;
                }
            };

            let remote_id = product.id.trim();
            let sku = import_sku(product.seller_sku.as_deref(), remote_id);
            let key = normalize_sku(&sku);
            let (is_active, status) = map_remote_status(&product.status);
            let provenance = provenance_tags(shop_tag_id, remote_id);
            let name = product.title.trim().to_string();

            match index.entries.get_mut(&key) {
                Some(existing) => {
                    let tags = merge_tags(&existing.tags, &provenance);
                    if dry_run {
                        existing.tags = tags;
                        result.updated += 1;
                        continue;
                    }

                    let patch = CatalogPatch {
                        name: Some(name),
                        price_cents: Some(price.cents()),
                        currency: product.currency.clone(),
                        is_active: Some(is_active),
                        status: Some(status),
                        tags: Some(tags),
                    };
                    match self.catalog.update(&existing.id, &patch).await {
                        Ok(entry) => {
                            existing.tags = entry.tags;
                            result.updated += 1;
                        }
                        Err(err) => {
                            warn!(product_id = %remote_id, sku = %sku, error = %err, "Catalog update failed");
                            result.record_skip(
                                ImportFailure::new(remote_id, format!("update failed: {}", err)),
                                self.failure_cap,
                            );
                        }
                    }
                }
                None => {
                    if dry_run {
                        index.entries.insert(
                            key,
                            IndexedEntry {
                                id: format!("dry-run:{}", remote_id),
                                tags: provenance,
                            },
                        );
                        result.created += 1;
                        continue;
                    }

                    let new_entry = NewCatalogEntry {
                        sku: sku.clone(),
                        name,
                        price_cents: price.cents(),
                        currency: product.currency.clone(),
                        is_active,
                        status,
                        tags: provenance,
                    };
                    match self.catalog.create(&new_entry).await {
                        Ok(entry) => {
                            index.entries.insert(
                                key,
                                IndexedEntry {
                                    id: entry.id,
                                    tags: entry.tags,
                                },
                            );
                            result.created += 1;
                        }
                        Err(err) => {
                            warn!(product_id = %remote_id, sku = %sku, error = %err, "Catalog insert failed");
                            result.record_skip(
                                ImportFailure::new(remote_id, format!("create failed: {}", err)),
                                self.failure_cap,
                            );
                        }
                    }
                }
            }
        }

        info!(
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            dry_run,
            "Reconciled page"
        );
        result
    }
}
