//! Housekeeping operations used by the admin CLI.

use std::sync::Arc;

use crate::domain::clock::Clock;
use crate::domain::entities::{ShortUrl, WindowPolicy};
use crate::domain::repositories::{ShortUrlRepository, StoreSummary, WindowRepository};
use crate::error::AppError;

/// Rows removed by one cleanup sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeReport {
    pub expired_urls: u64,
    pub stale_windows: u64,
}

/// A mapping together with its state at lookup time.
#[derive(Debug, Clone)]
pub struct MappingStatus {
    pub short_url: ShortUrl,
    pub live: bool,
}

/// Cleanup sweep, store statistics and single-code lookup.
///
/// Expiry is enforced on read, so nothing here is needed for correctness;
/// the sweep only keeps the tables small.
pub struct MaintenanceService<S: ShortUrlRepository, W: WindowRepository> {
    short_urls: Arc<S>,
    windows: Arc<W>,
    clock: Arc<dyn Clock>,
    longest_window_secs: i64,
}

impl<S: ShortUrlRepository, W: WindowRepository> MaintenanceService<S, W> {
    /// `policies` are the window policies in force; counter rows are kept
    /// until the longest of them has moved past their window.
    pub fn new(
        short_urls: Arc<S>,
        windows: Arc<W>,
        clock: Arc<dyn Clock>,
        policies: &[WindowPolicy],
    ) -> Self {
        let longest_window_secs = policies
            .iter()
            .map(|p| p.size_secs)
            .max()
            .unwrap_or(1)
            .max(1);

        Self {
            short_urls,
            windows,
            clock,
            longest_window_secs,
        }
    }

    /// Deletes expired mappings and counter rows whose window has closed
    /// under every policy.
    pub async fn purge(&self) -> Result<PurgeReport, AppError> {
        let now = self.clock.now();

        let expired_urls = self.short_urls.purge_expired(now).await?;

        // Oldest window start still current under the longest policy.
        let before = now.timestamp() - self.longest_window_secs + 1;
        let stale_windows = self.windows.purge_stale(before).await?;

        tracing::info!(expired_urls, stale_windows, "Cleanup sweep finished");

        Ok(PurgeReport {
            expired_urls,
            stale_windows,
        })
    }

    pub async fn summary(&self) -> Result<StoreSummary, AppError> {
        Ok(self.short_urls.summary(self.clock.now()).await?)
    }

    /// Looks up `code` including expired mappings.
    pub async fn lookup(&self, code: &str) -> Result<Option<MappingStatus>, AppError> {
        let now = self.clock.now();

        Ok(self
            .short_urls
            .find_by_code(code)
            .await?
            .map(|short_url| MappingStatus {
                live: short_url.is_live(now),
                short_url,
            }))
    }
}
