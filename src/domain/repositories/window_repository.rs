//! Repository trait for the fixed-window abuse counters.

use crate::error::StoreError;
use async_trait::async_trait;

/// Counter storage for the rate limiter and the duplicate-submission throttle.
///
/// Every `hit_*` call is a single atomic upsert: the stored row is created
/// with `count = 1`, reset to `count = 1` when its `window_start` differs from
/// the one passed in, or incremented otherwise. The post-increment count is
/// returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WindowRepository: Send + Sync {
    /// Records one request from `ip` in `bucket`.
    async fn hit_rate_window(
        &self,
        ip: &str,
        bucket: &str,
        window_start: i64,
    ) -> Result<i64, StoreError>;

    /// Records one submission of `original_url` from `ip`.
    async fn hit_duplicate_window(
        &self,
        ip: &str,
        original_url: &str,
        window_start: i64,
    ) -> Result<i64, StoreError>;

    /// Deletes counter rows whose window started before `before` (epoch seconds).
    async fn purge_stale(&self, before: i64) -> Result<u64, StoreError>;
}
