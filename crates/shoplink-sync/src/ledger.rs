//! # Run Ledger
//!
//! Bounded audit trail of sync attempts. Every page preview and bulk
//! import, dry run or not, appends one record; history is then trimmed to
//! the configured number of most recent entries.
//!
//! Recording never fails a sync: store errors are logged and dropped.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::store::LedgerStore;
use shoplink_core::{BulkImportResult, ImportResult, RunLedgerEntry};

pub struct RunLedger {
    store: Arc<dyn LedgerStore>,
    max_entries: u32,
    failure_cap: usize,
}

impl RunLedger {
    pub fn new(store: Arc<dyn LedgerStore>, max_entries: u32, failure_cap: usize) -> Self {
        RunLedger {
            store,
            max_entries: max_entries.max(1),
            failure_cap,
        }
    }

    /// Appends a record and trims history. Errors are logged, not returned.
    pub async fn record(&self, entry: RunLedgerEntry) {
        if let Err(err) = self.store.append(&entry).await {
            warn!(run_id = %entry.id, error = %err, "Failed to record sync run");
            return;
        }

        match self.store.trim(self.max_entries).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, keep = self.max_entries, "Trimmed run history"),
            Err(err) => warn!(error = %err, "Failed to trim run history"),
        }
    }

    pub async fn record_page(
        &self,
        result: &ImportResult,
        started_at: DateTime<Utc>,
    ) {
        let entry = RunLedgerEntry::from_page(
            new_run_id(),
            result,
            started_at,
            Utc::now(),
            self.failure_cap,
        );
        self.record(entry).await;
    }

    pub async fn record_bulk(
        &self,
        result: &BulkImportResult,
        page_token: Option<String>,
        started_at: DateTime<Utc>,
    ) {
        let entry = RunLedgerEntry::from_bulk(
            new_run_id(),
            result,
            page_token,
            started_at,
            Utc::now(),
            self.failure_cap,
        );
        self.record(entry).await;
    }

    /// Most recent runs, newest first.
    pub async fn history(&self, limit: u32) -> SyncResult<Vec<RunLedgerEntry>> {
        self.store.recent(limit.min(self.max_entries)).await
    }
}

fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLedger;
    use shoplink_core::{ImportFailure, RunScope};

    #[tokio::test]
    async fn test_history_is_capped_newest_first() {
        let store = Arc::new(MemoryLedger::default());
        let ledger = RunLedger::new(store.clone(), 3, 10);

        for i in 0..5 {
            let mut result = ImportResult::new(false);
            result.created = i;
            ledger.record_page(&result, Utc::now()).await;
        }

        assert_eq!(store.len().await, 3);
        let history = ledger.history(10).await.unwrap();
        let created: Vec<u32> = history.iter().map(|e| e.created).collect();
        assert_eq!(created, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let store = Arc::new(MemoryLedger::default());
        store.set_failing(true);
        let ledger = RunLedger::new(store.clone(), 3, 10);

        ledger
            .record_bulk(&BulkImportResult::new(true), None, Utc::now())
            .await;
        assert!(ledger.history(10).await.is_err());

        store.set_failing(false);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_bulk_record_fields() {
        let store = Arc::new(MemoryLedger::default());
        let ledger = RunLedger::new(store, 50, 1);

        let mut result = BulkImportResult::new(false);
        result.truncated = true;
        result.pages_fetched = 3;
        result.next_page_token = Some("t3".into());
        result.failures = vec![ImportFailure::new("p1", "missing price"), ImportFailure::new("p2", "x")];
        ledger.record_bulk(&result, Some("t0".into()), Utc::now()).await;

        let entry = &ledger.history(1).await.unwrap()[0];
        assert_eq!(entry.scope, RunScope::Bulk);
        assert!(entry.success);
        assert!(entry.truncated);
        assert_eq!(entry.pages_fetched, 3);
        assert_eq!(entry.page_token.as_deref(), Some("t0"));
        assert_eq!(entry.next_page_token.as_deref(), Some("t3"));
        assert_eq!(entry.failures.len(), 1);
        assert!(entry.started_at <= entry.finished_at);
    }
}
