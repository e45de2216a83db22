//! Single-retry policy for idempotent store reads.

use std::future::Future;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use crate::error::StoreError;

/// Pause before the one retry of a transient failure.
const RETRY_DELAY_MS: u64 = 50;

/// Runs `action`, retrying it once if it fails with a transient [`StoreError`].
///
/// Only use for reads: a timed-out write may already have committed.
pub(crate) async fn retry_transient<T, F, Fut>(action: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    RetryIf::spawn(
        FixedInterval::from_millis(RETRY_DELAY_MS).take(1),
        action,
        |e: &StoreError| e.is_transient(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retries_transient_once() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = retry_transient(move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StoreError::Timeout)
            } else {
                Ok(5)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_second_failure() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), StoreError> = retry_transient(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Timeout)
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_conflict() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), StoreError> = retry_transient(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Conflict { constraint: None })
        })
        .await;

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
