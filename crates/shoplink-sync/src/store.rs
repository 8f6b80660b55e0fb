//! # Store Interfaces
//!
//! The narrow persistence surface the engine depends on. SQLite
//! repositories from `shoplink-db` implement these traits. Unit tests use
//! the in-process stores of the test-only `memory` module.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CatalogStore   list_all · create · update        ← ProductReconciler   │
//! │  SettingsStore  get · put · delete                ← AuthGateway         │
//! │  LedgerStore    append · trim · recent            ← RunLedger           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SyncResult;
use shoplink_core::{CatalogEntry, CatalogPatch, NewCatalogEntry, RunLedgerEntry};
use shoplink_db::{CatalogRepository, Database, RunRepository, SettingsRepository};

/// Local catalog the reconciler writes to.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_all(&self) -> SyncResult<Vec<CatalogEntry>>;
    async fn create(&self, entry: &NewCatalogEntry) -> SyncResult<CatalogEntry>;
    async fn update(&self, id: &str, patch: &CatalogPatch) -> SyncResult<CatalogEntry>;
}

/// String key/value settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> SyncResult<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> SyncResult<()>;
    async fn delete(&self, key: &str) -> SyncResult<()>;
}

/// Append-only run history.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, entry: &RunLedgerEntry) -> SyncResult<()>;
    /// Keeps the `keep` most recent entries; returns how many were removed.
    async fn trim(&self, keep: u32) -> SyncResult<u64>;
    /// Newest first.
    async fn recent(&self, limit: u32) -> SyncResult<Vec<RunLedgerEntry>>;
}

/// The three stores, shared by every component of one service.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub ledger: Arc<dyn LedgerStore>,
}

impl Stores {
    /// Stores backed by a SQLite database.
    pub fn from_database(db: &Database) -> Self {
        Stores {
            catalog: Arc::new(db.catalog()),
            settings: Arc::new(db.settings()),
            ledger: Arc::new(db.runs()),
        }
    }

    /// Fresh in-memory stores.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Stores {
            catalog: Arc::new(memory::MemoryCatalog::default()),
            settings: Arc::new(memory::MemorySettings::default()),
            ledger: Arc::new(memory::MemoryLedger::default()),
        }
    }
}

// =============================================================================
// SQLite Implementations
// =============================================================================

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn list_all(&self) -> SyncResult<Vec<CatalogEntry>> {
        Ok(CatalogRepository::list_all(self).await?)
    }

    async fn create(&self, entry: &NewCatalogEntry) -> SyncResult<CatalogEntry> {
        Ok(self.insert(entry).await?)
    }

    async fn update(&self, id: &str, patch: &CatalogPatch) -> SyncResult<CatalogEntry> {
        Ok(CatalogRepository::update(self, id, patch).await?)
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(SettingsRepository::get(self, key).await?)
    }

    async fn put(&self, key: &str, value: &str) -> SyncResult<()> {
        Ok(SettingsRepository::put(self, key, value).await?)
    }

    async fn delete(&self, key: &str) -> SyncResult<()> {
        SettingsRepository::delete(self, key).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for RunRepository {
    async fn append(&self, entry: &RunLedgerEntry) -> SyncResult<()> {
        Ok(RunRepository::append(self, entry).await?)
    }

    async fn trim(&self, keep: u32) -> SyncResult<u64> {
        Ok(RunRepository::trim(self, keep).await?)
    }

    async fn recent(&self, limit: u32) -> SyncResult<Vec<RunLedgerEntry>> {
        Ok(RunRepository::recent(self, limit).await?)
    }
}

// =============================================================================
// In-Memory Implementations
// =============================================================================
