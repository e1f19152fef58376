//! Fixed-interval retry for registry requests.
//!
//! The registry is assumed to come back eventually, so the default policy
//! waits the same interval after every transient failure and never gives up.
//! An attempt cap exists for callers that cannot block indefinitely.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry behaviour for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Maximum number of attempts (including the first one). `None` = unbounded.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever with a fixed delay.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total delay accumulated.
    pub total_delay: Duration,
    /// Whether the operation ultimately succeeded.
    pub success: bool,
    /// Last error message if failed.
    pub last_error: Option<String>,
}

/// Retry an async operation while `should_retry` accepts its error.
///
/// Returns the final result together with [`RetryStats`].
pub async fn retry_async<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut stats = RetryStats::default();

    loop {
        stats.attempts += 1;

        match operation().await {
            Ok(value) => {
                stats.success = true;
                if stats.attempts > 1 {
                    debug!("Operation succeeded after {} attempts", stats.attempts);
                }
                return (Ok(value), stats);
            }
            Err(e) => {
                stats.last_error = Some(e.to_string());

                if !should_retry(&e) {
                    debug!("Error is not retryable: {}", e);
                    return (Err(e), stats);
                }

                if policy.exhausted(stats.attempts) {
                    warn!(
                        "All {} retry attempts exhausted. Last error: {}",
                        stats.attempts, e
                    );
                    return (Err(e), stats);
                }

                warn!(
                    "Attempt {} failed: {}. Retrying in {:?}",
                    stats.attempts, e, policy.interval
                );
                stats.total_delay += policy.interval;
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let policy = RetryPolicy::fixed(Duration::from_secs(60));

        let (result, stats) =
            retry_async(&policy, || async { Ok::<_, String>(42) }, |_: &String| true).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.total_delay, Duration::ZERO);
        assert!(stats.success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_retry_outlasts_many_failures() {
        let policy = RetryPolicy::fixed(Duration::from_secs(60));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let (result, stats) = retry_async(
            &policy,
            || {
                let counter = counter_clone.clone();
                async move {
                    let count = counter.fetch_add(1, Ordering::SeqCst);
                    if count < 25 {
                        Err("HTTP 500".to_string())
                    } else {
                        Ok(count)
                    }
                }
            },
            |_: &String| true,
        )
        .await;

        assert_eq!(result.unwrap(), 25);
        assert_eq!(stats.attempts, 26);
        // Fixed interval, no exponential growth.
        assert_eq!(stats.total_delay, Duration::from_secs(60 * 25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capped_retry_exhausted() {
        let policy = RetryPolicy::fixed(Duration::from_secs(1)).with_max_attempts(Some(3));

        let (result, stats) = retry_async(
            &policy,
            || async { Err::<i32, _>("always fails".to_string()) },
            |_: &String| true,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(stats.attempts, 3);
        assert!(!stats.success);
        assert_eq!(stats.last_error, Some("always fails".to_string()));
    }

    #[tokio::test]
    async fn test_retry_non_retryable_error() {
        let policy = RetryPolicy::fixed(Duration::from_secs(60));

        let (result, stats) = retry_async(
            &policy,
            || async { Err::<i32, _>("permanent failure".to_string()) },
            |e: &String| !e.contains("permanent"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(stats.attempts, 1);
        assert!(!stats.success);
    }
}
