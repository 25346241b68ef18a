//! Bounded exponential backoff for transient service failures.
//!
//! `RateLimited` and `ServiceUnavailable` responses are worth retrying; the
//! rest of the taxonomy is not (see [`crate::error::StreamError::is_transient`]).
//! Every retry loop here is bounded — after `max_retries` failed attempts the
//! last error is returned.
//!
//! ```ignore
//! use oxbow_client::retry::{retry_with_backoff, RetryPolicy};
//!
//! let policy = RetryPolicy::default(); // 3 retries, 1s doubling, capped at 30s
//!
//! let stream = retry_with_backoff(&policy, || async {
//!     service.get_stream(stream_id).await
//! }).await?;
//! ```

use crate::error::StreamError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy: backoff = min(initial * multiplier^attempt, max).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retry attempts after the initial try.
    pub max_retries: usize,

    /// First backoff duration.
    pub initial_backoff: Duration,

    /// Backoff cap.
    pub max_backoff: Duration,

    /// Exponential growth factor.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    /// 3 retries, doubling from 1s, capped at 30s.
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_retries: usize,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
        }
    }

    /// Policy that never retries; useful in tests and latency-sensitive paths.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff for the given 0-indexed attempt.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let millis =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }
}

/// Retry an operation with exponential backoff.
///
/// Non-transient errors are returned immediately; transient ones are retried
/// until the policy's budget is exhausted, then the last error is returned.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, StreamError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, StreamError>>,
{
    run(policy, &mut operation, false).await
}

/// Retry with exponential backoff plus random jitter (0.75-1.25x).
///
/// Jitter spreads out clients that would otherwise retry in lockstep after a
/// service brownout.
pub async fn retry_with_jittered_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, StreamError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, StreamError>>,
{
    run(policy, &mut operation, true).await
}

async fn run<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &mut F,
    jitter: bool,
) -> Result<T, StreamError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, StreamError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }

                if attempt >= policy.max_retries {
                    warn!(
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        error = %err,
                        "retry budget exhausted, giving up"
                    );
                    return Err(err);
                }

                let mut backoff = policy.backoff(attempt);
                if jitter {
                    let factor = 0.75 + rand::random::<f64>() * 0.5;
                    backoff = Duration::from_millis((backoff.as_millis() as f64 * factor) as u64);
                }

                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "transient error, backing off"
                );

                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
        assert_eq!(policy.max_backoff, Duration::from_secs(30));
        assert_eq!(policy.backoff_multiplier, 2.0);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(
            10,
            Duration::from_secs(1),
            Duration::from_secs(10),
            2.0,
        );
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(10)); // capped
        assert_eq!(policy.backoff(50), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn immediate_success_does_not_retry() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = retry_with_backoff(&policy, || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StreamError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_error_retried_to_success() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(5), 2.0);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = retry_with_backoff(&policy, || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StreamError::ServiceUnavailable("upgrading".into()))
                } else {
                    Ok("recovered")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_fails_fast() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = retry_with_backoff(&policy, || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StreamError::NotFound("st-1".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(StreamError::NotFound(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5), 2.0);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = retry_with_backoff(&policy, || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(StreamError::RateLimited(format!("attempt {n}")))
            }
        })
        .await;

        match result {
            Err(StreamError::RateLimited(msg)) => assert_eq!(msg, "attempt 2"),
            other => panic!("expected RateLimited, got {other:?}"),
        }
        // Initial try plus 2 retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_then_permanent_stops_early() {
        let policy = RetryPolicy::new(10, Duration::from_millis(1), Duration::from_millis(5), 2.0);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = retry_with_jittered_backoff(&policy, || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(StreamError::RateLimited("throttled".into()))
                } else {
                    Err(StreamError::InvalidArgument("bad request".into()))
                }
            }
        })
        .await;

        assert!(matches!(result, Err(StreamError::InvalidArgument(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn jittered_retry_recovers() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 2.0);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = retry_with_jittered_backoff(&policy, || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 1 {
                    Err(StreamError::ServiceUnavailable("blip".into()))
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
