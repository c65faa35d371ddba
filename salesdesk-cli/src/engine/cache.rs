//! Reconciliation cache
//!
//! Reconciling a document means loading and scanning every tab; the
//! result is worth keeping for a while. SQLite-backed key/value store
//! with a TTL. Cache trouble is never fatal, the engine recomputes.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Key-schema version; bump when cached payload shapes change.
pub const CACHE_VERSION: &str = "v3";

pub fn customer_list_key(document_id: &str, staff_name: Option<&str>) -> String {
    format!(
        "{CACHE_VERSION}:customers:{document_id}:{}",
        staff_name.unwrap_or("ALL")
    )
}

#[derive(Clone)]
pub struct ListCache {
    pool: SqlitePool,
}

impl ListCache {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create cache dir: {}", parent.display()))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open cache db: {}", path.display()))?;
        Self::init(pool).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory cache db")?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS list_cache (
                 cache_key TEXT PRIMARY KEY,
                 payload TEXT NOT NULL,
                 expires_at INTEGER NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("Failed to create cache schema")?;
        Ok(Self { pool })
    }

    /// Unexpired payload for a key, if any.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT payload FROM list_cache WHERE cache_key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read cache")?;
        Ok(row.map(|(payload,)| payload))
    }

    pub async fn put(&self, key: &str, payload: &str, ttl: Duration) -> Result<()> {
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        sqlx::query(
            "INSERT INTO list_cache (cache_key, payload, expires_at)
             VALUES (?, ?, ?)
             ON CONFLICT(cache_key)
             DO UPDATE SET payload = excluded.payload, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .context("Failed to write cache")?;
        Ok(())
    }

    /// Drop every cached view of a document. Called after any write to it.
    pub async fn invalidate_document(&self, document_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM list_cache WHERE cache_key LIKE ?")
            .bind(format!("%:{document_id}:%"))
            .execute(&self.pool)
            .await
            .context("Failed to invalidate cache")?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM list_cache WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .context("Failed to purge cache")?;
        Ok(result.rows_affected())
    }
}
