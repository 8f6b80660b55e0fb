//! # Import Results, Budgets and Run Records
//!
//! Everything an import produces or consumes that is not a catalog entry.
//!
//! ## Result Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PageRequest ───► one page ───► ImportResult ─────┐                    │
//! │                                                    ├──► RunLedgerEntry │
//! │  BulkImportRequest ─► N pages ─► BulkImportResult ─┘    (persisted)    │
//! │                                                                         │
//! │  Per-product problems become ImportFailure rows (capped), never errors │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{DEFAULT_PAGE_SIZE, MAX_PAGES_LIMIT, MAX_PAGE_SIZE, MAX_PRODUCTS_LIMIT};

// =============================================================================
// Failures
// =============================================================================

/// One product that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub product_id: String,
    pub reason: String,
}

impl ImportFailure {
    pub fn new(product_id: impl Into<String>, reason: impl Into<String>) -> Self {
        ImportFailure {
            product_id: product_id.into(),
            reason: reason.into(),
        }
    }
}

/// Appends failures up to `cap`, counting the ones that did not fit.
///
/// Returns how many were dropped.
pub fn push_capped(
    list: &mut Vec<ImportFailure>,
    incoming: impl IntoIterator<Item = ImportFailure>,
    cap: usize,
) -> usize {
    let mut dropped = 0;
    for failure in incoming {
        if list.len() < cap {
            list.push(failure);
        } else {
            dropped += 1;
        }
    }
    dropped
}

// =============================================================================
// Requests
// =============================================================================

/// Clamps a requested page size into `[1, MAX_PAGE_SIZE]`; `None` → default.
pub fn clamp_page_size(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

/// Input of a single-page preview sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page_size: Option<u32>,
    /// Opaque cursor; empty or absent means the first page.
    pub page_token: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Input of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportRequest {
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    pub max_products: Option<u32>,
    /// Resume from a previously returned `next_page_token`.
    pub page_token: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Budgets of a bulk import after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncBudget {
    pub page_size: u32,
    pub max_pages: u32,
    pub max_products: u32,
}

impl SyncBudget {
    /// Clamps a request into the allowed ranges, filling gaps from defaults.
    ///
    /// ```rust
    /// use shoplink_core::{BulkImportRequest, SyncBudget};
    ///
    /// let budget = SyncBudget::from_request(
    ///     &BulkImportRequest { page_size: Some(500), max_pages: Some(0), ..Default::default() },
    ///     SyncBudget { page_size: 20, max_pages: 50, max_products: 1000 },
    /// );
    /// assert_eq!(budget.page_size, 100);
    /// assert_eq!(budget.max_pages, 1);
    /// assert_eq!(budget.max_products, 1000);
    /// ```
    pub fn from_request(request: &BulkImportRequest, defaults: SyncBudget) -> Self {
        SyncBudget {
            page_size: clamp_page_size(request.page_size.or(Some(defaults.page_size))),
            max_pages: request
                .max_pages
                .unwrap_or(defaults.max_pages)
                .clamp(1, MAX_PAGES_LIMIT),
            max_products: request
                .max_products
                .unwrap_or(defaults.max_products)
                .clamp(1, MAX_PRODUCTS_LIMIT),
        }
    }
}

impl Default for SyncBudget {
    fn default() -> Self {
        SyncBudget {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: 50,
            max_products: 1_000,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of reconciling one page (or one preview sync).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failures: Vec<ImportFailure>,
    /// Failures beyond the cap that were counted but not listed.
    pub failures_omitted: u32,
    pub dry_run: bool,
    /// Cursor the page was fetched with (page previews only).
    pub page_token: Option<String>,
    pub next_page_token: Option<String>,
    pub total_count: Option<u64>,
    pub products_fetched: u32,
    /// Set when the page or credentials failed; counts are then partial.
    pub error: Option<String>,
}

impl ImportResult {
    pub fn new(dry_run: bool) -> Self {
        ImportResult {
            dry_run,
            ..Default::default()
        }
    }

    /// Creates a failed result carrying only the error.
    pub fn failed(dry_run: bool, error: impl Into<String>) -> Self {
        ImportResult {
            dry_run,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Records a skipped product, honoring the failure cap.
    pub fn record_skip(&mut self, failure: ImportFailure, cap: usize) {
        self.skipped += 1;
        self.failures_omitted += push_capped(&mut self.failures, [failure], cap) as u32;
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Number of products that were looked at.
    pub fn processed(&self) -> u32 {
        self.created + self.updated + self.skipped
    }
}

/// Outcome of a multi-page import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResult {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failures: Vec<ImportFailure>,
    pub failures_omitted: u32,
    pub pages_fetched: u32,
    pub products_fetched: u32,
    /// True when the run stopped before the remote catalog was exhausted.
    pub truncated: bool,
    /// Resume cursor; `None` once the end of the catalog was reached.
    pub next_page_token: Option<String>,
    pub dry_run: bool,
    pub error: Option<String>,
}

impl BulkImportResult {
    pub fn new(dry_run: bool) -> Self {
        BulkImportResult {
            dry_run,
            ..Default::default()
        }
    }

    /// Folds one page's result into the running totals.
    pub fn absorb(&mut self, page: ImportResult, cap: usize) {
        self.created += page.created;
        self.updated += page.updated;
        self.skipped += page.skipped;
        self.failures_omitted += page.failures_omitted;
        self.failures_omitted += push_capped(&mut self.failures, page.failures, cap) as u32;
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// =============================================================================
// Run Ledger
// =============================================================================

/// Whether a run covered one page or a whole catalog walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RunScope {
    Page,
    Bulk,
}

/// Whether a run persisted its effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    DryRun,
    Commit,
}

impl RunMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            RunMode::DryRun
        } else {
            RunMode::Commit
        }
    }
}

/// Immutable audit record of one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RunLedgerEntry {
    pub id: String,
    pub scope: RunScope,
    pub mode: RunMode,
    pub success: bool,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failures: Vec<ImportFailure>,
    pub error: Option<String>,
    pub truncated: bool,
    pub pages_fetched: u32,
    pub products_fetched: u32,
    pub page_token: Option<String>,
    pub next_page_token: Option<String>,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub finished_at: DateTime<Utc>,
}

impl RunLedgerEntry {
    /// Builds the record of a page preview.
    pub fn from_page(
        id: String,
        result: &ImportResult,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        cap: usize,
    ) -> Self {
        RunLedgerEntry {
            id,
            scope: RunScope::Page,
            mode: RunMode::from_dry_run(result.dry_run),
            success: result.is_success(),
            created: result.created,
            updated: result.updated,
            skipped: result.skipped,
            failures: result.failures.iter().take(cap).cloned().collect(),
            error: result.error.clone(),
            truncated: false,
            pages_fetched: u32::from(result.error.is_none()),
            products_fetched: result.products_fetched,
            page_token: result.page_token.clone(),
            next_page_token: result.next_page_token.clone(),
            started_at,
            finished_at,
        }
    }

    /// Builds the record of a bulk import.
    pub fn from_bulk(
        id: String,
        result: &BulkImportResult,
        page_token: Option<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        cap: usize,
    ) -> Self {
        RunLedgerEntry {
            id,
            scope: RunScope::Bulk,
            mode: RunMode::from_dry_run(result.dry_run),
            success: result.is_success(),
            created: result.created,
            updated: result.updated,
            skipped: result.skipped,
            failures: result.failures.iter().take(cap).cloned().collect(),
            error: result.error.clone(),
            truncated: result.truncated,
            pages_fetched: result.pages_fetched,
            products_fetched: result.products_fetched,
            page_token,
            next_page_token: result.next_page_token.clone(),
            started_at,
            finished_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(None), 20);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(250)), 100);
        assert_eq!(clamp_page_size(Some(37)), 37);
    }

    #[test]
    fn test_budget_clamps_every_field() {
        let budget = SyncBudget::from_request(
            &BulkImportRequest {
                page_size: Some(0),
                max_pages: Some(1_000),
                max_products: Some(50_000),
                ..Default::default()
            },
            SyncBudget::default(),
        );
        assert_eq!(
            budget,
            SyncBudget {
                page_size: 1,
                max_pages: 200,
                max_products: 10_000
            }
        );
    }

    #[test]
    fn test_record_skip_respects_cap() {
        let mut result = ImportResult::new(false);
        for i in 0..5 {
            result.record_skip(ImportFailure::new(format!("p{}", i), "bad price"), 3);
        }
        assert_eq!(result.skipped, 5);
        assert_eq!(result.failures.len(), 3);
        assert_eq!(result.failures_omitted, 2);
    }

    #[test]
    fn test_bulk_absorb_accumulates_and_caps() {
        let mut bulk = BulkImportResult::new(true);
        let mut page = ImportResult::new(true);
        page.created = 2;
        page.updated = 1;
        page.record_skip(ImportFailure::new("a", "x"), 10);
        page.record_skip(ImportFailure::new("b", "y"), 10);

        bulk.absorb(page.clone(), 3);
        bulk.absorb(page, 3);

        assert_eq!(bulk.created, 4);
        assert_eq!(bulk.updated, 2);
        assert_eq!(bulk.skipped, 4);
        assert_eq!(bulk.failures.len(), 3);
        assert_eq!(bulk.failures_omitted, 1);
    }

    #[test]
    fn test_ledger_entry_from_failed_page() {
        let now = Utc::now();
        let result = ImportResult::failed(false, "provider error");
        let entry = RunLedgerEntry::from_page("r1".into(), &result, now, now, 10);
        assert!(!entry.success);
        assert_eq!(entry.scope, RunScope::Page);
        assert_eq!(entry.mode, RunMode::Commit);
        assert_eq!(entry.pages_fetched, 0);
        assert_eq!(entry.error.as_deref(), Some("provider error"));
    }
}
