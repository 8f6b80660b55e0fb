//! # Catalog Repository
//!
//! Database operations for the local catalog the importer writes into.
//!
//! ## Matching Key
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  catalog_entries                                                        │
//! │                                                                         │
//! │  sku          sku_key       ← trim + lowercase, UNIQUE                 │
//! │  ─────────    ─────────                                                 │
//! │  "MUG-1"      "mug-1"                                                   │
//! │  "remote:p7"  "remote:p7"                                               │
//! │                                                                         │
//! │  A second create for " mug-1 " fails with UniqueViolation.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use shoplink_core::validation::normalize_sku;
use shoplink_core::{CatalogEntry, CatalogPatch, CatalogStatus, NewCatalogEntry};

const SELECT_COLUMNS: &str = r#"
    SELECT id, sku, name, price_cents, currency, is_active, status, tags,
           created_at, updated_at
    FROM catalog_entries
"#;

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    id: String,
    sku: String,
    name: String,
    price_cents: i64,
    currency: Option<String>,
    is_active: bool,
    status: CatalogStatus,
    tags: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CatalogRow> for CatalogEntry {
    type Error = DbError;

    fn try_from(row: CatalogRow) -> DbResult<Self> {
        let tags = serde_json::from_str(&row.tags).map_err(|e| DbError::corrupt("tags", e))?;
        Ok(CatalogEntry {
            id: row.id,
            sku: row.sku,
            name: row.name,
            price_cents: row.price_cents,
            currency: row.currency,
            is_active: row.is_active,
            status: row.status,
            tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for catalog entries.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.catalog();
/// let entries = repo.list_all().await?;
/// let created = repo.insert(&new_entry).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Lists every entry, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<CatalogEntry>> {
        let rows: Vec<CatalogRow> =
            sqlx::query_as(&format!("{} ORDER BY created_at, id", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await?;

        debug!(count = rows.len(), "Listed catalog entries");
        rows.into_iter().map(CatalogEntry::try_from).collect()
    }

    /// Gets an entry by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CatalogEntry>> {
        let row: Option<CatalogRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CatalogEntry::try_from).transpose()
    }

    /// Gets an entry by SKU, matched after trim + lowercase.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<CatalogEntry>> {
        let row: Option<CatalogRow> =
            sqlx::query_as(&format!("{} WHERE sku_key = ?1", SELECT_COLUMNS))
                .bind(normalize_sku(sku))
                .fetch_optional(&self.pool)
                .await?;

        row.map(CatalogEntry::try_from).transpose()
    }

    /// Inserts a new entry with a fresh UUID.
    ///
    /// ## Returns
    /// * `Ok(CatalogEntry)` - The stored entry
    /// * `Err(DbError::UniqueViolation)` - Normalized SKU already exists
    pub async fn insert(&self, new: &NewCatalogEntry) -> DbResult<CatalogEntry> {
        debug!(sku = %new.sku, "Inserting catalog entry");

        let now = Utc::now();
        let entry = CatalogEntry {
            id: Uuid::new_v4().to_string(),
            sku: new.sku.trim().to_string(),
            name: new.name.clone(),
            price_cents: new.price_cents,
            currency: new.currency.clone(),
            is_active: new.is_active,
            status: new.status,
            tags: new.tags.clone(),
            created_at: now,
            updated_at: now,
        };
        let tags = serde_json::to_string(&entry.tags).map_err(|e| DbError::corrupt("tags", e))?;

        sqlx::query(
            r#"
            INSERT INTO catalog_entries (
                id, sku, sku_key, name, price_cents, currency,
                is_active, status, tags, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.sku)
        .bind(normalize_sku(&entry.sku))
        .bind(&entry.name)
        .bind(entry.price_cents)
        .bind(&entry.currency)
        .bind(entry.is_active)
        .bind(entry.status)
        .bind(tags)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &entry.sku),
            other => other,
        })?;

        Ok(entry)
    }

    /// Applies a partial update and returns the stored result.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No entry with that ID
    pub async fn update(&self, id: &str, patch: &CatalogPatch) -> DbResult<CatalogEntry> {
        debug!(id = %id, "Updating catalog entry");

        let mut entry = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("CatalogEntry", id))?;
        patch.apply_to(&mut entry, Utc::now());

        let tags = serde_json::to_string(&entry.tags).map_err(|e| DbError::corrupt("tags", e))?;

        let result = sqlx::query(
            r#"
            UPDATE catalog_entries SET
                name = ?2,
                price_cents = ?3,
                currency = ?4,
                is_active = ?5,
                status = ?6,
                tags = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.name)
        .bind(entry.price_cents)
        .bind(&entry.currency)
        .bind(entry.is_active)
        .bind(entry.status)
        .bind(tags)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CatalogEntry", id));
        }

        Ok(entry)
    }

    /// Counts all entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
