//! # Run Repository
//!
//! Append-only history of sync attempts, trimmed to the most recent N.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sync_runs.seq (AUTOINCREMENT) is the only ordering key.                │
//! │                                                                         │
//! │  append ──► seq 41, 42, 43 ...                                          │
//! │  trim(2) ─► keep the two highest seq values, delete the rest           │
//! │  recent(n) ► ORDER BY seq DESC LIMIT n   (newest first)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use shoplink_core::{ImportFailure, RunLedgerEntry, RunMode, RunScope};

#[derive(Debug, sqlx::FromRow)]
struct RunRow {
    id: String,
    scope: RunScope,
    mode: RunMode,
    success: bool,
    created: i64,
    updated: i64,
    skipped: i64,
    failures: String,
    error: Option<String>,
    truncated: bool,
    pages_fetched: i64,
    products_fetched: i64,
    page_token: Option<String>,
    next_page_token: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl TryFrom<RunRow> for RunLedgerEntry {
    type Error = DbError;

    fn try_from(row: RunRow) -> DbResult<Self> {
        let failures: Vec<ImportFailure> =
            serde_json::from_str(&row.failures).map_err(|e| DbError::corrupt("failures", e))?;
        Ok(RunLedgerEntry {
            id: row.id,
            scope: row.scope,
            mode: row.mode,
            success: row.success,
            created: row.created as u32,
            updated: row.updated as u32,
            skipped: row.skipped as u32,
            failures,
            error: row.error,
            truncated: row.truncated,
            pages_fetched: row.pages_fetched as u32,
            products_fetched: row.products_fetched as u32,
            page_token: row.page_token,
            next_page_token: row.next_page_token,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

/// Repository for sync run history.
#[derive(Debug, Clone)]
pub struct RunRepository {
    pool: SqlitePool,
}

impl RunRepository {
    /// Creates a new RunRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RunRepository { pool }
    }

    /// Appends one run record.
    pub async fn append(&self, entry: &RunLedgerEntry) -> DbResult<()> {
        debug!(run_id = %entry.id, success = entry.success, "Recording sync run");

        let failures =
            serde_json::to_string(&entry.failures).map_err(|e| DbError::corrupt("failures", e))?;

        sqlx::query(
            r#"
            INSERT INTO sync_runs (
                id, scope, mode, success, created, updated, skipped,
                failures, error, truncated, pages_fetched, products_fetched,
                page_token, next_page_token, started_at, finished_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&entry.id)
        .bind(entry.scope)
        .bind(entry.mode)
        .bind(entry.success)
        .bind(i64::from(entry.created))
        .bind(i64::from(entry.updated))
        .bind(i64::from(entry.skipped))
        .bind(failures)
        .bind(&entry.error)
        .bind(entry.truncated)
        .bind(i64::from(entry.pages_fetched))
        .bind(i64::from(entry.products_fetched))
        .bind(&entry.page_token)
        .bind(&entry.next_page_token)
        .bind(entry.started_at)
        .bind(entry.finished_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes everything but the `keep` most recent records.
    ///
    /// Returns the number of records removed.
    pub async fn trim(&self, keep: u32) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sync_runs
            WHERE seq NOT IN (
                SELECT seq FROM sync_runs ORDER BY seq DESC LIMIT ?1
            )
            "#,
        )
        .bind(i64::from(keep))
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(removed, keep, "Trimmed sync run history");
        }
        Ok(removed)
    }

    /// Returns up to `limit` records, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<RunLedgerEntry>> {
        let rows: Vec<RunRow> = sqlx::query_as(
            r#"
            SELECT id, scope, mode, success, created, updated, skipped,
                   failures, error, truncated, pages_fetched, products_fetched,
                   page_token, next_page_token, started_at, finished_at
            FROM sync_runs
            ORDER BY seq DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RunLedgerEntry::try_from).collect()
    }

    /// Counts stored records.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_runs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::pool::{Database, DbConfig};
    use shoplink_core::{ImportFailure, RunLedgerEntry, RunMode, RunScope};

    fn run(id: &str) -> RunLedgerEntry {
        let now = Utc::now();
        RunLedgerEntry {
            id: id.to_string(),
            scope: RunScope::Bulk,
            mode: RunMode::DryRun,
            success: true,
            created: 3,
            updated: 1,
            skipped: 1,
            failures: vec![ImportFailure::new("p9", "missing price")],
            error: None,
            truncated: true,
            pages_fetched: 2,
            products_fetched: 5,
            page_token: None,
            next_page_token: Some("tok-3".to_string()),
            started_at: now,
            finished_at: now,
        }
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.runs();

        let entry = run("r1");
        repo.append(&entry).await.unwrap();

        let recent = repo.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "r1");
        assert_eq!(recent[0].scope, RunScope::Bulk);
        assert_eq!(recent[0].mode, RunMode::DryRun);
        assert_eq!(recent[0].failures, entry.failures);
        assert_eq!(recent[0].next_page_token.as_deref(), Some("tok-3"));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.runs();
        for id in ["r1", "r2", "r3"] {
            repo.append(&run(id)).await.unwrap();
        }

        let ids: Vec<String> = repo
            .recent(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["r3", "r2"]);
    }

    #[tokio::test]
    async fn test_trim_keeps_most_recent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.runs();
        for i in 0..5 {
            repo.append(&run(&format!("r{}", i))).await.unwrap();
        }

        assert_eq!(repo.trim(3).await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.trim(3).await.unwrap(), 0);

        let oldest_kept = repo.recent(10).await.unwrap().pop().unwrap();
        assert_eq!(oldest_kept.id, "r2");
    }
}
