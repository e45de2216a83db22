//! SQLite implementation of the short URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use super::pool::timed;
use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::domain::repositories::{ShortUrlRepository, StoreSummary};
use crate::error::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct ShortUrlRow {
    id: i64,
    code: String,
    original_url: String,
    created_at: i64,
    expires_at: i64,
    click_count: i64,
}

impl TryFrom<ShortUrlRow> for ShortUrl {
    type Error = StoreError;

    fn try_from(row: ShortUrlRow) -> Result<Self, Self::Error> {
        Ok(ShortUrl {
            id: row.id,
            code: row.code,
            original_url: row.original_url,
            created_at: from_epoch(row.created_at)?,
            expires_at: from_epoch(row.expires_at)?,
            click_count: row.click_count,
        })
    }
}

fn from_epoch(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        StoreError::Database(sqlx::Error::Protocol(format!(
            "timestamp out of range: {secs}"
        )))
    })
}

/// SQLite repository for short URL mappings.
///
/// Every call runs under `timeout`; queries are bound parameters only.
pub struct SqliteShortUrlRepository {
    pool: Arc<SqlitePool>,
    timeout: Duration,
}

impl SqliteShortUrlRepository {
    /// Creates a repository over a connection pool.
    pub fn new(pool: Arc<SqlitePool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl ShortUrlRepository for SqliteShortUrlRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortUrl>, StoreError> {
        timed(self.timeout, async {
            let row = sqlx::query_as::<_, ShortUrlRow>(
                r#"
                SELECT id, code, original_url, created_at, expires_at, click_count
                FROM short_urls
                WHERE code = ?1
                "#,
            )
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

            row.map(ShortUrl::try_from).transpose()
        })
        .await
    }

    async fn find_by_url(
        &self,
        original_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortUrl>, StoreError> {
        timed(self.timeout, async {
            let row = sqlx::query_as::<_, ShortUrlRow>(
                r#"
                SELECT id, code, original_url, created_at, expires_at, click_count
                FROM short_urls
                WHERE original_url = ?1 AND expires_at > ?2
                "#,
            )
            .bind(original_url)
            .bind(now.timestamp())
            .fetch_optional(self.pool.as_ref())
            .await?;

            row.map(ShortUrl::try_from).transpose()
        })
        .await
    }

    async fn insert(&self, new_url: NewShortUrl) -> Result<ShortUrl, StoreError> {
        timed(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let superseded = sqlx::query(
                r#"
                DELETE FROM short_urls
                WHERE (code = ?1 OR original_url = ?2) AND expires_at <= ?3
                "#,
            )
            .bind(&new_url.code)
            .bind(&new_url.original_url)
            .bind(new_url.created_at.timestamp())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if superseded > 0 {
                tracing::debug!(
                    code = %new_url.code,
                    superseded,
                    "Replacing expired short URL rows"
                );
            }

            let row = sqlx::query_as::<_, ShortUrlRow>(
                r#"
                INSERT INTO short_urls (code, original_url, created_at, expires_at)
                VALUES (?1, ?2, ?3, ?4)
                RETURNING id, code, original_url, created_at, expires_at, click_count
                "#,
            )
            .bind(&new_url.code)
            .bind(&new_url.original_url)
            .bind(new_url.created_at.timestamp())
            .bind(new_url.expires_at.timestamp())
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;

            ShortUrl::try_from(row)
        })
        .await
    }

    async fn increment_clicks(&self, code: &str) -> Result<bool, StoreError> {
        timed(self.timeout, async {
            let result =
                sqlx::query("UPDATE short_urls SET click_count = click_count + 1 WHERE code = ?1")
                    .bind(code)
                    .execute(self.pool.as_ref())
                    .await?;

            Ok::<_, StoreError>(result.rows_affected() > 0)
        })
        .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        timed(self.timeout, async {
            let result = sqlx::query("DELETE FROM short_urls WHERE expires_at <= ?1")
                .bind(now.timestamp())
                .execute(self.pool.as_ref())
                .await?;

            Ok::<_, StoreError>(result.rows_affected())
        })
        .await
    }

    async fn summary(&self, now: DateTime<Utc>) -> Result<StoreSummary, StoreError> {
        timed(self.timeout, async {
            let (total, live, clicks) = sqlx::query_as::<_, (i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN expires_at > ?1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(click_count), 0)
                FROM short_urls
                "#,
            )
            .bind(now.timestamp())
            .fetch_one(self.pool.as_ref())
            .await?;

            Ok::<_, StoreError>(StoreSummary {
                total,
                live,
                clicks,
            })
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        timed(self.timeout, async {
            sqlx::query_scalar::<_, i64>("SELECT 1")
                .fetch_one(self.pool.as_ref())
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
