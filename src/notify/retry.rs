use backoff::backoff::Constant;
use backoff::future::retry;
use std::future::Future;
use std::time::Duration;

use crate::utils::DeliveryError;

/// Errors that can tell whether another attempt is worthwhile
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for DeliveryError {
    fn is_transient(&self) -> bool {
        DeliveryError::is_transient(self)
    }
}

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A single attempt, no retry
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
///
/// Transient errors are retried every `policy.delay`; permanent errors and the error
/// of the last attempt are returned as-is.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts;
    let mut attempt = 0;

    retry(Constant::new(policy.delay), || {
        attempt += 1;
        let current = attempt;
        let call = operation();
        async move {
            match call.await {
                Ok(result) => Ok(result),
                Err(e) if !e.is_transient() => {
                    tracing::error!(error = %e, attempt = current, "Permanent error, not retrying");
                    Err(backoff::Error::permanent(e))
                }
                Err(e) if current >= max_attempts => {
                    tracing::error!(error = %e, attempts = current, "Giving up after final attempt");
                    Err(backoff::Error::permanent(e))
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt = current,
                        max_attempts,
                        "Retryable error, will retry..."
                    );
                    Err(backoff::Error::transient(e))
                }
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn transient() -> DeliveryError {
        DeliveryError::Transport("connection reset".to_string())
    }

    #[test]
    fn default_policy_should_make_three_attempts_two_seconds_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }

    #[test]
    fn policy_should_always_allow_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn with_retry_should_succeed_on_first_try() {
        let result = with_retry(&RetryPolicy::default(), || async {
            Ok::<_, DeliveryError>("sent")
        })
        .await;

        assert_eq!(result, Ok("sent"));
    }

    #[tokio::test(start_paused = true)]
    async fn with_retry_should_succeed_on_third_attempt_after_two_delays() {
        // Arrange
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);
        let started = Instant::now();

        // Act
        let result = with_retry(&RetryPolicy::default(), || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(transient())
                } else {
                    Ok("sent")
                }
            }
        })
        .await;

        // Assert
        assert_eq!(result, Ok("sent"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn with_retry_should_stop_after_max_attempts() {
        // Arrange
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        // Act
        let result = with_retry(&RetryPolicy::default(), || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transient())
            }
        })
        .await;

        // Assert
        assert_eq!(result, Err(transient()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_should_not_retry_on_permanent_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = with_retry(&RetryPolicy::default(), || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DeliveryError::Rejected {
                    status: 401,
                    description: "Unauthorized".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(DeliveryError::Rejected { status: 401, .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
