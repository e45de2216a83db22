//! Repository trait for short URL mappings.

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Aggregate figures shown by the admin CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub total: i64,
    pub live: i64,
    pub clicks: i64,
}

/// Repository interface for code → URL mappings.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::SqliteShortUrlRepository`] - SQLite implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortUrlRepository: Send + Sync {
    /// Finds a mapping by code, live or expired.
    ///
    /// Expired rows are returned so callers can tell "expired" from "unknown".
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortUrl>, StoreError>;

    /// Finds the live mapping for an original URL.
    ///
    /// Rows with `expires_at <= now` never match.
    async fn find_by_url(
        &self,
        original_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortUrl>, StoreError>;

    /// Inserts a new mapping.
    ///
    /// Expired rows holding the same code or URL (relative to
    /// `new_url.created_at`) are removed in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a live row already uses the code
    /// or the URL.
    async fn insert(&self, new_url: NewShortUrl) -> Result<ShortUrl, StoreError>;

    /// Atomically adds one to `click_count`. Returns `false` if no row matched.
    async fn increment_clicks(&self, code: &str) -> Result<bool, StoreError>;

    /// Deletes rows whose `expires_at` is at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn summary(&self, now: DateTime<Utc>) -> Result<StoreSummary, StoreError>;

    /// Cheap round-trip used by health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
