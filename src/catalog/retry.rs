//! Rate-limit aware retry policy for catalog requests.
//!
//! Only a rate-limit response (HTTP 429) is retried. The first retry waits a
//! short fixed cooldown; every later retry waits a longer fixed interval.
//! All other failures end the call immediately.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use mangadex_core::catalog::{CatalogError, FailureType, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(5));
//! let error = CatalogError::http_status("https://api.mangadex.org/chapter", 429, None);
//!
//! match policy.should_retry(classify_error(&error), 0) {
//!     RetryDecision::Retry { delay, retry } => assert_eq!((delay, retry), (Duration::from_secs(1), 1)),
//!     RetryDecision::DoNotRetry { .. } => unreachable!(),
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use super::CatalogError;
use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT_COOLDOWN, DEFAULT_RETRY_INTERVAL};

/// Classification of a failed request for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// The server asked us to slow down (HTTP 429).
    RateLimited,
    /// Anything else; retrying would not help.
    Terminal,
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after waiting `delay`.
    Retry {
        /// How long to wait before the retry.
        delay: Duration,
        /// Which retry this will be (1-indexed).
        retry: u32,
    },

    /// Give up.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Retry configuration applied by the catalog client to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts allowed after the first rate-limit response.
    max_retries: u32,

    /// Wait before the first retry.
    cooldown: Duration,

    /// Wait before every retry after the first.
    interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit retry count and waits.
    #[must_use]
    pub fn new(max_retries: u32, cooldown: Duration, interval: Duration) -> Self {
        Self {
            max_retries,
            cooldown,
            interval,
        }
    }

    /// Returns the maximum number of additional attempts.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides what to do after a failure.
    ///
    /// `retries_done` is the number of retries already performed for this call.
    #[must_use]
    pub fn should_retry(&self, failure_type: FailureType, retries_done: u32) -> RetryDecision {
        if failure_type == FailureType::Terminal {
            return RetryDecision::DoNotRetry {
                reason: "not a rate-limit response".to_string(),
            };
        }

        if retries_done >= self.max_retries {
            debug!(retries_done, max = self.max_retries, "max retries reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }

        RetryDecision::Retry {
            delay: self.delay_before(retries_done + 1),
            retry: retries_done + 1,
        }
    }

    fn delay_before(&self, retry: u32) -> Duration {
        if retry <= 1 {
            self.cooldown
        } else {
            self.interval
        }
    }

    /// Runs `operation`, retrying it while it fails with a rate-limit error.
    ///
    /// Returns the first success, the first non-rate-limit error, or
    /// [`CatalogError::RateLimitExhausted`] once the retry budget is spent.
    /// Waits use the tokio clock, so tests can drive them with a paused runtime.
    ///
    /// # Errors
    ///
    /// See above.
    pub async fn run<T, F, Fut>(&self, url: &str, mut operation: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let mut retries_done = 0u32;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            match self.should_retry(failure_type, retries_done) {
                RetryDecision::Retry { delay, retry } => {
                    info!(
                        url,
                        retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis(),
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retries_done = retry;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url, %reason, "not retrying request");
                    return Err(if failure_type == FailureType::RateLimited {
                        CatalogError::rate_limit_exhausted(url, retries_done)
                    } else {
                        error
                    });
                }
            }
        }
    }
}

/// Classifies a catalog error into a [`FailureType`].
#[must_use]
pub fn classify_error(error: &CatalogError) -> FailureType {
    match error {
        CatalogError::HttpStatus { status: 429, .. } => FailureType::RateLimited,
        _ => FailureType::Terminal,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    const URL: &str = "https://api.mangadex.org/chapter";

    fn rate_limited() -> CatalogError {
        CatalogError::http_status(URL, 429, None)
    }

    /// Paused-clock sleeps land on millisecond ticks, so allow a little slack.
    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "expected ~{expected:?}, waited {elapsed:?}"
        );
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_secs(1), Duration::from_secs(5))
    }

    // ==================== Decision Tests ====================

    #[test]
    fn test_default_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.cooldown, Duration::from_secs(1));
        assert_eq!(policy.interval, Duration::from_secs(5));
    }

    #[test]
    fn test_first_retry_uses_cooldown_then_interval() {
        let policy = policy(3);
        assert_eq!(
            policy.should_retry(FailureType::RateLimited, 0),
            RetryDecision::Retry {
                delay: Duration::from_secs(1),
                retry: 1
            }
        );
        assert_eq!(
            policy.should_retry(FailureType::RateLimited, 1),
            RetryDecision::Retry {
                delay: Duration::from_secs(5),
                retry: 2
            }
        );
        assert_eq!(
            policy.should_retry(FailureType::RateLimited, 2),
            RetryDecision::Retry {
                delay: Duration::from_secs(5),
                retry: 3
            }
        );
    }

    #[test]
    fn test_exhausted_budget_does_not_retry() {
        let decision = policy(3).should_retry(FailureType::RateLimited, 3);
        assert!(
            matches!(&decision, RetryDecision::DoNotRetry { reason } if reason.contains("exhausted"))
        );
    }

    #[test]
    fn test_terminal_failure_never_retries() {
        let decision = policy(3).should_retry(FailureType::Terminal, 0);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
    }

    #[test]
    fn test_classify_only_429_is_rate_limited() {
        assert_eq!(classify_error(&rate_limited()), FailureType::RateLimited);
        for status in [400, 403, 404, 500, 503] {
            let error = CatalogError::http_status(URL, status, None);
            assert_eq!(classify_error(&error), FailureType::Terminal, "status {status}");
        }
        let timeout = CatalogError::Timeout {
            url: URL.to_string(),
        };
        assert_eq!(classify_error(&timeout), FailureType::Terminal);
    }

    // ==================== Run Loop Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_first_success_after_rate_limit() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = policy(3)
            .run(URL, || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(rate_limited())
                    } else {
                        Ok(call)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_elapsed(start, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_exactly_max_retries() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = policy(3)
            .run(URL, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::RateLimitExhausted { retries: 3, .. })
        ));
        // One initial attempt plus three retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Cooldown, then two intervals.
        assert_elapsed(start, Duration::from_secs(1 + 5 + 5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_zero_retries_fails_without_waiting() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = policy(0)
            .run(URL, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::RateLimitExhausted { retries: 0, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_does_not_retry_other_errors() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy(3)
            .run(URL, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CatalogError::http_status(URL, 500, None)) }
            })
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::HttpStatus { status: 500, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_non_rate_limit_error_during_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy(3)
            .run(URL, || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(rate_limited())
                    } else {
                        Err(CatalogError::http_status(URL, 404, None))
                    }
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::HttpStatus { status: 404, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
