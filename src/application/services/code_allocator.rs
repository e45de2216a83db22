//! Short code allocation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::retry::retry_transient;
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::utils::code_generator::{
    DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH, MIN_CODE_LENGTH, generate_code, is_reserved,
    validate_custom_code,
};

/// Default bound on random generation attempts.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Hands out codes that no live mapping currently holds.
///
/// Availability is checked against the store but not reserved: the final say
/// belongs to the store's uniqueness constraint at insert time.
pub struct CodeAllocator<R: ShortUrlRepository> {
    repository: Arc<R>,
    code_length: usize,
    max_attempts: usize,
}

impl<R: ShortUrlRepository> CodeAllocator<R> {
    /// Creates an allocator producing `code_length`-symbol random codes with
    /// at most `max_attempts` tries.
    ///
    /// `code_length` is clamped to the accepted code length range and
    /// `max_attempts` to at least one.
    pub fn new(repository: Arc<R>, code_length: usize, max_attempts: usize) -> Self {
        Self {
            repository,
            code_length: code_length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Creates an allocator with the default code length and attempt bound.
    pub fn with_defaults(repository: Arc<R>) -> Self {
        Self::new(repository, DEFAULT_CODE_LENGTH, DEFAULT_MAX_ATTEMPTS)
    }

    /// Returns a code for a new mapping.
    ///
    /// With `requested`, validates it and checks that no live row holds it.
    /// Without, draws random codes until one is free.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidCode`] if `requested` breaks the charset or length rule
    /// - [`AppError::CodeTaken`] if `requested` belongs to a live mapping
    /// - [`AppError::AllocationExhausted`] if every random attempt collided
    /// - [`AppError::TransientStoreFailure`] / [`AppError::Internal`] on store errors
    pub async fn allocate(
        &self,
        requested: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        match requested {
            Some(code) => self.allocate_custom(code, now).await,
            None => self.allocate_random(now).await,
        }
    }

    async fn allocate_custom(&self, code: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        validate_custom_code(code)?;

        if self.is_taken(code, now).await? {
            return Err(AppError::CodeTaken {
                code: code.to_string(),
            });
        }

        Ok(code.to_string())
    }

    async fn allocate_random(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        for attempt in 1..=self.max_attempts {
            let code = generate_code(self.code_length);

            if !is_reserved(&code) && !self.is_taken(&code, now).await? {
                return Ok(code);
            }

            tracing::debug!(attempt, "Generated code collided with a live mapping");
        }

        tracing::error!(
            attempts = self.max_attempts,
            code_length = self.code_length,
            "Random code allocation exhausted"
        );
        Err(AppError::AllocationExhausted)
    }

    /// Expired rows do not hold their code; the insert supersedes them.
    async fn is_taken(&self, code: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let repository = self.repository.as_ref();
        let existing = retry_transient(move || repository.find_by_code(code)).await?;

        Ok(existing.is_some_and(|row| row.is_live(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ShortUrl;
    use crate::domain::repositories::MockShortUrlRepository;
    use crate::error::StoreError;
    use crate::utils::code_generator::is_code_char;
    use chrono::Duration;

    fn row(code: &str, expires_at: DateTime<Utc>) -> ShortUrl {
        ShortUrl {
            id: 1,
            code: code.to_string(),
            original_url: "https://example.com".to_string(),
            created_at: expires_at - Duration::hours(24),
            expires_at,
            click_count: 0,
        }
    }

    #[tokio::test]
    async fn test_random_code_shape() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| Ok(None));

        let allocator = CodeAllocator::with_defaults(Arc::new(repo));
        let code = allocator.allocate(None, Utc::now()).await.unwrap();

        assert_eq!(code.len(), 6);
        assert!(code.chars().all(is_code_char));
    }

    #[tokio::test]
    async fn test_random_code_retries_on_collision() {
        let now = Utc::now();
        let mut repo = MockShortUrlRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_find_by_code()
            .times(2)
            .in_sequence(&mut seq)
            .returning(move |code| Ok(Some(row(code, now + Duration::hours(1)))));
        repo.expect_find_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));

        let allocator = CodeAllocator::with_defaults(Arc::new(repo));
        assert!(allocator.allocate(None, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_random_code_exhaustion() {
        let now = Utc::now();
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code()
            .times(5)
            .returning(move |code| Ok(Some(row(code, now + Duration::hours(1)))));

        let allocator = CodeAllocator::new(Arc::new(repo), 6, 5);
        let result = allocator.allocate(None, now).await;

        assert!(matches!(result, Err(AppError::AllocationExhausted)));
    }

    #[tokio::test]
    async fn test_expired_holder_does_not_block_code() {
        let now = Utc::now();
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code()
            .times(1)
            .returning(move |code| Ok(Some(row(code, now - Duration::seconds(1)))));

        let allocator = CodeAllocator::with_defaults(Arc::new(repo));
        let code = allocator.allocate(Some("my-link"), now).await.unwrap();

        assert_eq!(code, "my-link");
    }

    #[tokio::test]
    async fn test_custom_code_taken() {
        let now = Utc::now();
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code()
            .withf(|code| code == "my-link")
            .times(1)
            .returning(move |code| Ok(Some(row(code, now + Duration::hours(1)))));

        let allocator = CodeAllocator::with_defaults(Arc::new(repo));
        let result = allocator.allocate(Some("my-link"), now).await;

        assert!(matches!(result, Err(AppError::CodeTaken { code }) if code == "my-link"));
    }

    #[tokio::test]
    async fn test_custom_code_invalid_skips_store() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_code().times(0);

        let allocator = CodeAllocator::with_defaults(Arc::new(repo));

        for bad in ["ab", "has space", "dot.ted"] {
            let result = allocator.allocate(Some(bad), Utc::now()).await;
            assert!(matches!(result, Err(AppError::InvalidCode(_))), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_transient_lookup_is_retried() {
        let mut repo = MockShortUrlRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_find_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StoreError::Timeout));
        repo.expect_find_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));

        let allocator = CodeAllocator::with_defaults(Arc::new(repo));
        let code = allocator.allocate(Some("retry-me"), Utc::now()).await.unwrap();

        assert_eq!(code, "retry-me");
    }

    #[test]
    fn test_code_length_is_clamped() {
        let allocator = CodeAllocator::new(Arc::new(MockShortUrlRepository::new()), 1, 0);
        assert_eq!(allocator.code_length, MIN_CODE_LENGTH);
        assert_eq!(allocator.max_attempts, 1);
    }
}
