//! Per-IP admission control for shorten requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::entities::WindowPolicy;
use crate::domain::repositories::WindowRepository;
use crate::error::AppError;

/// Rate-limit bucket charged by shorten requests.
pub const SHORTEN_BUCKET: &str = "shorten";

/// Two independent fixed-window counters kept in the store.
///
/// - the rate limiter counts every shorten request per IP
/// - the duplicate throttle counts submissions of one URL per IP
///
/// Counters record attempts, so rejected requests still count.
pub struct AbuseGuard<W: WindowRepository> {
    repository: Arc<W>,
    rate: WindowPolicy,
    duplicate: WindowPolicy,
}

impl<W: WindowRepository> AbuseGuard<W> {
    pub fn new(repository: Arc<W>, rate: WindowPolicy, duplicate: WindowPolicy) -> Self {
        Self {
            repository,
            rate,
            duplicate,
        }
    }

    /// Admits or rejects one shorten request from `ip` for `original_url`.
    ///
    /// The rate limiter runs first; a rate-limited request does not touch the
    /// duplicate counter.
    ///
    /// # Errors
    ///
    /// - [`AppError::RateLimited`] when `ip` exceeded its per-window ceiling
    /// - [`AppError::Throttled`] when `ip` resubmitted `original_url` too often
    /// - store errors as [`AppError::TransientStoreFailure`] / [`AppError::Internal`]
    pub async fn check(
        &self,
        ip: &str,
        original_url: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let count = self
            .repository
            .hit_rate_window(ip, SHORTEN_BUCKET, self.rate.window_start(now))
            .await?;

        if self.rate.is_exceeded(count) {
            tracing::info!(ip, count, limit = self.rate.max, "Shorten rate limit exceeded");
            metrics::counter!("guard_rejections_total", "reason" => "rate_limited").increment(1);
            return Err(AppError::RateLimited {
                retry_after: self.rate.retry_after(now),
            });
        }

        let count = self
            .repository
            .hit_duplicate_window(ip, original_url, self.duplicate.window_start(now))
            .await?;

        if self.duplicate.is_exceeded(count) {
            tracing::info!(ip, count, "Duplicate submission throttled");
            metrics::counter!("guard_rejections_total", "reason" => "throttled").increment(1);
            return Err(AppError::Throttled {
                retry_after: self.duplicate.retry_after(now),
            });
        }

        Ok(())
    }
}
