//! Shorten and redirect orchestration.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::abuse_guard::AbuseGuard;
use super::code_allocator::{CodeAllocator, DEFAULT_MAX_ATTEMPTS};
use crate::application::retry::retry_transient;
use crate::domain::clock::Clock;
use crate::domain::entities::{NewShortUrl, ShortUrl, WindowPolicy};
use crate::domain::repositories::{ShortUrlRepository, WindowRepository};
use crate::error::{AppError, StoreError};
use crate::utils::code_generator::{DEFAULT_CODE_LENGTH, is_plausible_code, validate_custom_code};
use crate::utils::url_validator::validate_url;

/// Tunable limits of the shortening service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenPolicy {
    /// Prefix of composed short URLs, e.g. `https://s.example.com`.
    pub base_url: String,
    /// Lifetime of a new mapping.
    pub ttl: Duration,
    pub code_length: usize,
    pub max_attempts: usize,
    pub rate: WindowPolicy,
    pub duplicate: WindowPolicy,
}

impl Default for ShortenPolicy {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            ttl: Duration::hours(24),
            code_length: DEFAULT_CODE_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate: WindowPolicy::new(10, 60),
            duplicate: WindowPolicy::new(1, 10),
        }
    }
}

/// One shorten request as received from the HTTP boundary.
#[derive(Debug, Clone)]
pub struct ShortenCommand {
    pub url: String,
    pub code: Option<String>,
    pub client_ip: String,
}

/// Result of a successful shorten request.
#[derive(Debug, Clone)]
pub struct ShortenOutcome {
    pub short_url: ShortUrl,
    /// True when an existing live mapping was returned instead of a new one.
    pub reused: bool,
}

/// Result of a successful redirect lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub code: String,
    pub target_url: String,
}

/// Coordinates validation, abuse limiting, lookup-or-create and redirects.
///
/// Stateless between requests: everything shared lives in the repositories.
pub struct ShortenService<S: ShortUrlRepository, W: WindowRepository> {
    short_urls: Arc<S>,
    allocator: CodeAllocator<S>,
    guard: AbuseGuard<W>,
    clock: Arc<dyn Clock>,
    base_url: String,
    ttl: Duration,
}

impl<S: ShortUrlRepository, W: WindowRepository> ShortenService<S, W> {
    /// Creates a new shortening service.
    pub fn new(
        short_urls: Arc<S>,
        windows: Arc<W>,
        clock: Arc<dyn Clock>,
        policy: ShortenPolicy,
    ) -> Self {
        Self {
            allocator: CodeAllocator::new(
                short_urls.clone(),
                policy.code_length,
                policy.max_attempts,
            ),
            guard: AbuseGuard::new(windows, policy.rate, policy.duplicate),
            short_urls,
            clock,
            base_url: policy.base_url.trim_end_matches('/').to_string(),
            ttl: policy.ttl,
        }
    }

    /// Shortens a URL, reusing the live mapping for it when one exists.
    ///
    /// # Flow
    ///
    /// 1. Validate URL and custom code (no store access on failure)
    /// 2. Abuse guard
    /// 3. Return the live mapping for the URL if there is one
    /// 4. Otherwise allocate a code and insert with `expires_at = now + ttl`
    ///
    /// An insert that loses a race (or times out) is followed by one more
    /// lookup of the URL; a live row found then is returned.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidUrl`], [`AppError::InvalidCode`] on bad input
    /// - [`AppError::RateLimited`], [`AppError::Throttled`] from the guard
    /// - [`AppError::CodeTaken`] if the custom code is held by a live mapping
    /// - [`AppError::AllocationExhausted`] if no random code could be found
    /// - [`AppError::TransientStoreFailure`] if the store stayed unavailable
    pub async fn shorten(&self, command: ShortenCommand) -> Result<ShortenOutcome, AppError> {
        let url = command.url.trim();
        validate_url(url).map_err(|e| AppError::InvalidUrl(e.to_string()))?;

        let custom_code = command
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if let Some(code) = custom_code {
            validate_custom_code(code)?;
        }

        let now = self.clock.now();

        self.guard.check(&command.client_ip, url, now).await?;

        if let Some(existing) = self.find_live(url, now).await? {
            tracing::debug!(code = %existing.code, "Reusing live short URL");
            metrics::counter!("shorten_reused_total").increment(1);
            return Ok(ShortenOutcome {
                short_url: existing,
                reused: true,
            });
        }

        let code = self.allocator.allocate(custom_code, now).await?;
        let new_url = NewShortUrl {
            code: code.clone(),
            original_url: url.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        match self.short_urls.insert(new_url).await {
            Ok(created) => {
                tracing::info!(code = %created.code, "Short URL created");
                metrics::counter!("shorten_created_total").increment(1);
                Ok(ShortenOutcome {
                    short_url: created,
                    reused: false,
                })
            }
            Err(e @ StoreError::Conflict { .. }) | Err(e @ StoreError::Timeout) => {
                tracing::warn!(code = %code, error = %e, "Insert did not go through, re-checking");
                self.recover_insert(url, &code, custom_code.is_some(), e, now)
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves a code to its target URL and counts the click.
    ///
    /// The click increment is best effort: its failure is logged and the
    /// redirect still succeeds.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] for unknown or impossible codes
    /// - [`AppError::Expired`] for mappings past `expires_at`
    pub async fn resolve(&self, code: &str) -> Result<ResolvedTarget, AppError> {
        if !is_plausible_code(code) {
            metrics::counter!("redirects_total", "outcome" => "not_found").increment(1);
            return Err(AppError::NotFound);
        }

        let now = self.clock.now();
        let repository = self.short_urls.as_ref();
        let Some(mapping) = retry_transient(move || repository.find_by_code(code)).await? else {
            metrics::counter!("redirects_total", "outcome" => "not_found").increment(1);
            return Err(AppError::NotFound);
        };

        if mapping.is_expired(now) {
            tracing::debug!(code, "Short URL expired");
            metrics::counter!("redirects_total", "outcome" => "expired").increment(1);
            return Err(AppError::Expired);
        }

        match self.short_urls.increment_clicks(code).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(code, "Short URL vanished before click was counted"),
            Err(e) => tracing::warn!(code, error = %e, "Failed to count click"),
        }

        metrics::counter!("redirects_total", "outcome" => "redirected").increment(1);
        Ok(ResolvedTarget {
            code: mapping.code,
            target_url: mapping.original_url,
        })
    }

    /// Composes the public short URL for `code`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    /// Checks that the store answers.
    pub async fn check_store(&self) -> Result<(), AppError> {
        self.short_urls.ping().await.map_err(AppError::from)
    }

    async fn find_live(
        &self,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortUrl>, AppError> {
        let repository = self.short_urls.as_ref();
        Ok(retry_transient(move || repository.find_by_url(url, now)).await?)
    }

    /// Second look after a conflicting or timed-out insert.
    ///
    /// A live row for the URL means a concurrent request (or our own
    /// timed-out insert) won; anything else is surfaced.
    async fn recover_insert(
        &self,
        url: &str,
        attempted_code: &str,
        custom: bool,
        cause: StoreError,
        now: DateTime<Utc>,
    ) -> Result<ShortenOutcome, AppError> {
        if let Some(existing) = self.find_live(url, now).await? {
            let reused = existing.code != attempted_code;
            return Ok(ShortenOutcome {
                short_url: existing,
                reused,
            });
        }

        match cause {
            StoreError::Conflict { .. } if custom => Err(AppError::CodeTaken {
                code: attempted_code.to_string(),
            }),
            _ => Err(AppError::TransientStoreFailure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::repositories::{MockShortUrlRepository, MockWindowRepository};

    const START: i64 = 1_700_000_040;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn mapping(code: &str, url: &str, created_at: DateTime<Utc>) -> ShortUrl {
        ShortUrl {
            id: 1,
            code: code.to_string(),
            original_url: url.to_string(),
            created_at,
            expires_at: created_at + Duration::hours(24),
            click_count: 0,
        }
    }

    fn open_guard() -> MockWindowRepository {
        let mut windows = MockWindowRepository::new();
        windows.expect_hit_rate_window().returning(|_, _, _| Ok(1));
        windows.expect_hit_duplicate_window().returning(|_, _, _| Ok(1));
        windows
    }

    fn service(
        short_urls: MockShortUrlRepository,
        windows: MockWindowRepository,
    ) -> ShortenService<MockShortUrlRepository, MockWindowRepository> {
        ShortenService::new(
            Arc::new(short_urls),
            Arc::new(windows),
            Arc::new(ManualClock::at_epoch(START)),
            ShortenPolicy {
                base_url: "https://s.example.com/".to_string(),
                ..ShortenPolicy::default()
            },
        )
    }

    fn command(url: &str, code: Option<&str>) -> ShortenCommand {
        ShortenCommand {
            url: url.to_string(),
            code: code.map(str::to_string),
            client_ip: "1.2.3.4".to_string(),
        }
    }

    #[tokio::test]
    async fn test_shorten_creates_mapping_with_ttl() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls.expect_find_by_url().times(1).returning(|_, _| Ok(None));
        short_urls.expect_find_by_code().times(1).returning(|_| Ok(None));
        short_urls
            .expect_insert()
            .withf(|new_url| {
                new_url.original_url == "https://example.com/very/long/path"
                    && new_url.created_at == at(START)
                    && new_url.expires_at == at(START) + Duration::hours(24)
                    && new_url.code.len() == 6
            })
            .times(1)
            .returning(|new_url| Ok(mapping(&new_url.code, &new_url.original_url, new_url.created_at)));

        let outcome = service(short_urls, open_guard())
            .shorten(command("  https://example.com/very/long/path ", None))
            .await
            .unwrap();

        assert!(!outcome.reused);
        assert_eq!(outcome.short_url.original_url, "https://example.com/very/long/path");
    }

    #[tokio::test]
    async fn test_shorten_reuses_live_mapping() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls
            .expect_find_by_url()
            .withf(|url, now| url == "https://example.com" && *now == at(START))
            .times(1)
            .returning(|url, _| Ok(Some(mapping("abc123", url, at(START - 60)))));
        short_urls.expect_find_by_code().times(0);
        short_urls.expect_insert().times(0);

        let outcome = service(short_urls, open_guard())
            .shorten(command("https://example.com", Some("ignored")))
            .await
            .unwrap();

        assert!(outcome.reused);
        assert_eq!(outcome.short_url.code, "abc123");
    }

    #[tokio::test]
    async fn test_invalid_url_skips_guard_and_store() {
        let mut windows = MockWindowRepository::new();
        windows.expect_hit_rate_window().times(0);
        let mut short_urls = MockShortUrlRepository::new();
        short_urls.expect_find_by_url().times(0);

        let svc = service(short_urls, windows);

        for bad in ["", "   ", "ftp://host/file", "not-a-valid-url"] {
            let result = svc.shorten(command(bad, None)).await;
            assert!(matches!(result, Err(AppError::InvalidUrl(_))), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn test_invalid_custom_code_skips_guard() {
        let mut windows = MockWindowRepository::new();
        windows.expect_hit_rate_window().times(0);

        let result = service(MockShortUrlRepository::new(), windows)
            .shorten(command("https://example.com", Some("a b")))
            .await;

        assert!(matches!(result, Err(AppError::InvalidCode(_))));
    }

    #[tokio::test]
    async fn test_blank_custom_code_means_random() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls.expect_find_by_url().returning(|_, _| Ok(None));
        short_urls.expect_find_by_code().times(1).returning(|_| Ok(None));
        short_urls
            .expect_insert()
            .withf(|new_url| new_url.code.len() == 6)
            .times(1)
            .returning(|new_url| Ok(mapping(&new_url.code, &new_url.original_url, new_url.created_at)));

        let result = service(short_urls, open_guard())
            .shorten(command("https://example.com", Some("  ")))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_guard_rejection_stops_before_lookup() {
        let mut windows = MockWindowRepository::new();
        windows.expect_hit_rate_window().returning(|_, _, _| Ok(11));
        let mut short_urls = MockShortUrlRepository::new();
        short_urls.expect_find_by_url().times(0);

        let result = service(short_urls, windows)
            .shorten(command("https://example.com", None))
            .await;

        assert!(matches!(result, Err(AppError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_insert_conflict_returns_concurrent_winner() {
        let mut short_urls = MockShortUrlRepository::new();
        let mut seq = mockall::Sequence::new();
        short_urls
            .expect_find_by_url()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(None));
        short_urls.expect_find_by_code().returning(|_| Ok(None));
        short_urls
            .expect_insert()
            .times(1)
            .returning(|_| Err(StoreError::Conflict { constraint: None }));
        short_urls
            .expect_find_by_url()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|url, _| Ok(Some(mapping("winner", url, at(START)))));

        let outcome = service(short_urls, open_guard())
            .shorten(command("https://example.com", None))
            .await
            .unwrap();

        assert!(outcome.reused);
        assert_eq!(outcome.short_url.code, "winner");
    }

    #[tokio::test]
    async fn test_insert_conflict_on_custom_code_is_code_taken() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls.expect_find_by_url().times(2).returning(|_, _| Ok(None));
        short_urls.expect_find_by_code().returning(|_| Ok(None));
        short_urls
            .expect_insert()
            .times(1)
            .returning(|_| Err(StoreError::Conflict { constraint: None }));

        let result = service(short_urls, open_guard())
            .shorten(command("https://example.com", Some("my-link")))
            .await;

        assert!(matches!(result, Err(AppError::CodeTaken { .. })));
    }

    #[tokio::test]
    async fn test_insert_conflict_on_random_code_is_transient() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls.expect_find_by_url().times(2).returning(|_, _| Ok(None));
        short_urls.expect_find_by_code().returning(|_| Ok(None));
        short_urls
            .expect_insert()
            .times(1)
            .returning(|_| Err(StoreError::Conflict { constraint: None }));

        let result = service(short_urls, open_guard())
            .shorten(command("https://example.com", None))
            .await;

        assert!(matches!(result, Err(AppError::TransientStoreFailure)));
    }

    #[tokio::test]
    async fn test_timed_out_insert_that_committed_is_not_reused() {
        let mut short_urls = MockShortUrlRepository::new();
        let mut seq = mockall::Sequence::new();
        short_urls
            .expect_find_by_url()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(None));
        short_urls.expect_find_by_code().returning(|_| Ok(None));
        short_urls
            .expect_insert()
            .times(1)
            .returning(|_| Err(StoreError::Timeout));
        short_urls
            .expect_find_by_url()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|url, _| Ok(Some(mapping("mine1", url, at(START)))));

        let outcome = service(short_urls, open_guard())
            .shorten(command("https://example.com", Some("mine1")))
            .await
            .unwrap();

        assert!(!outcome.reused);
        assert_eq!(outcome.short_url.code, "mine1");
    }

    #[tokio::test]
    async fn test_resolve_counts_click() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls
            .expect_find_by_code()
            .returning(|code| Ok(Some(mapping(code, "https://example.com/x", at(START)))));
        short_urls
            .expect_increment_clicks()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(|_| Ok(true));

        let target = service(short_urls, MockWindowRepository::new())
            .resolve("abc123")
            .await
            .unwrap();

        assert_eq!(target.target_url, "https://example.com/x");
    }

    #[tokio::test]
    async fn test_resolve_survives_click_failure() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls
            .expect_find_by_code()
            .returning(|code| Ok(Some(mapping(code, "https://example.com/x", at(START)))));
        short_urls
            .expect_increment_clicks()
            .times(1)
            .returning(|_| Err(StoreError::Timeout));

        let result = service(short_urls, MockWindowRepository::new())
            .resolve("abc123")
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_expired() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls
            .expect_find_by_code()
            .returning(|code| Ok(Some(mapping(code, "https://example.com/x", at(START) - Duration::hours(25)))));
        short_urls.expect_increment_clicks().times(0);

        let result = service(short_urls, MockWindowRepository::new())
            .resolve("abc123")
            .await;

        assert!(matches!(result, Err(AppError::Expired)));
    }

    #[tokio::test]
    async fn test_resolve_unknown_and_implausible() {
        let mut short_urls = MockShortUrlRepository::new();
        short_urls.expect_find_by_code().times(1).returning(|_| Ok(None));

        let svc = service(short_urls, MockWindowRepository::new());

        assert!(matches!(svc.resolve("nope").await, Err(AppError::NotFound)));
        assert!(matches!(svc.resolve("favicon.ico").await, Err(AppError::NotFound)));
        assert!(matches!(
            svc.resolve(&"a".repeat(33)).await,
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_short_url_trims_base_slash() {
        let svc = service(MockShortUrlRepository::new(), MockWindowRepository::new());
        assert_eq!(svc.short_url("abc123"), "https://s.example.com/abc123");
    }
}
