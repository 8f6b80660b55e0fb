//! # Settings Repository
//!
//! A small key/value table. Values are opaque strings; the sync crate stores
//! its credentials document here as JSON with the secrets already encrypted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for key/value settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads a value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Inserts or replaces a value.
    pub async fn put(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Writing setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes a value. Returns whether anything was deleted.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        debug!(key = %key, "Deleting setting");

        let result = sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_put_get_overwrite_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        assert_eq!(repo.get("credentials").await.unwrap(), None);

        repo.put("credentials", "{\"a\":1}").await.unwrap();
        repo.put("credentials", "{\"a\":2}").await.unwrap();
        assert_eq!(
            repo.get("credentials").await.unwrap().as_deref(),
            Some("{\"a\":2}")
        );

        assert!(repo.delete("credentials").await.unwrap());
        assert!(!repo.delete("credentials").await.unwrap());
        assert_eq!(repo.get("credentials").await.unwrap(), None);
    }
}
