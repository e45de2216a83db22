//! SQLite implementation of the abuse counter repository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use super::pool::timed;
use crate::domain::repositories::WindowRepository;
use crate::error::StoreError;

/// SQLite repository for fixed-window counters.
///
/// Each hit is one `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement,
/// so concurrent hits on the same key serialize inside SQLite and none is lost.
pub struct SqliteWindowRepository {
    pool: Arc<SqlitePool>,
    timeout: Duration,
}

impl SqliteWindowRepository {
    pub fn new(pool: Arc<SqlitePool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl WindowRepository for SqliteWindowRepository {
    async fn hit_rate_window(
        &self,
        ip: &str,
        bucket: &str,
        window_start: i64,
    ) -> Result<i64, StoreError> {
        timed(self.timeout, async {
            let count = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO rate_limits (ip, bucket, window_start, count)
                VALUES (?1, ?2, ?3, 1)
                ON CONFLICT (ip, bucket) DO UPDATE SET
                    count = CASE
                        WHEN rate_limits.window_start = excluded.window_start
                        THEN rate_limits.count + 1
                        ELSE 1
                    END,
                    window_start = excluded.window_start
                RETURNING count
                "#,
            )
            .bind(ip)
            .bind(bucket)
            .bind(window_start)
            .fetch_one(self.pool.as_ref())
            .await?;

            Ok::<_, StoreError>(count)
        })
        .await
    }

    async fn hit_duplicate_window(
        &self,
        ip: &str,
        original_url: &str,
        window_start: i64,
    ) -> Result<i64, StoreError> {
        timed(self.timeout, async {
            let count = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO duplicate_submissions (ip, original_url, window_start, count)
                VALUES (?1, ?2, ?3, 1)
                ON CONFLICT (ip, original_url) DO UPDATE SET
                    count = CASE
                        WHEN duplicate_submissions.window_start = excluded.window_start
                        THEN duplicate_submissions.count + 1
                        ELSE 1
                    END,
                    window_start = excluded.window_start
                RETURNING count
                "#,
            )
            .bind(ip)
            .bind(original_url)
            .bind(window_start)
            .fetch_one(self.pool.as_ref())
            .await?;

            Ok::<_, StoreError>(count)
        })
        .await
    }

    async fn purge_stale(&self, before: i64) -> Result<u64, StoreError> {
        timed(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let rate = sqlx::query("DELETE FROM rate_limits WHERE window_start < ?1")
                .bind(before)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            let duplicates = sqlx::query("DELETE FROM duplicate_submissions WHERE window_start < ?1")
                .bind(before)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            tx.commit().await?;

            Ok::<_, StoreError>(rate + duplicates)
        })
        .await
    }
}
