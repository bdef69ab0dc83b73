//! Request spacing and retry-with-backoff.
//!
//! One [`RateLimiter`] instance is shared by every fetch in a run, so the
//! minimum-interval contract holds globally even if fetches ever run
//! concurrently. Time is injected through the [`Clock`] trait, which lets
//! the backoff tests run without real delays.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{LimiterConfig, RetryConfig};

/// Time source for spacing and backoff.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by tokio timers.
#[derive(Debug, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Enforces a minimum interval between consecutive request starts,
/// measured from the start of the previous request.
pub struct RateLimiter {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(config.min_interval_ms),
            last_start: Mutex::new(None),
        }
    }

    /// Wait until this caller may start a request. The internal lock is
    /// held across the sleep so concurrent callers are serialized against
    /// the same global interval.
    pub async fn acquire(&self, clock: &dyn Clock) {
        let mut last = self.last_start.lock().await;
        if let Some(prev) = *last {
            let elapsed = clock.now().saturating_duration_since(prev);
            if elapsed < self.min_interval {
                clock.sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(clock.now());
    }
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total tries, first attempt included
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// Run `op` under the shared rate limiter, retrying transient failures
/// with exponentially doubling delays up to the policy's attempt budget.
///
/// Non-retryable failures propagate immediately. When the budget is
/// exhausted the last transient error surfaces as the terminal failure;
/// the caller records the work item as still-missing rather than failing
/// the run.
pub async fn fetch_with_retry<F, Fut, T>(
    limiter: &RateLimiter,
    clock: &dyn Clock,
    policy: &RetryPolicy,
    context: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        limiter.acquire(clock).await;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.base_delay * 2u32.pow(attempt);
                log::warn!(
                    "transient failure for {context} (attempt {}): {e}; retrying in {:?}",
                    attempt + 1,
                    delay
                );
                clock.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn limiter(interval_ms: u64) -> RateLimiter {
        RateLimiter::new(&LimiterConfig {
            min_interval_ms: interval_ms,
        })
    }

    fn policy(max_attempts: u32, base_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(base_ms),
        }
    }

    #[tokio::test]
    async fn backoff_delays_double_each_retry() {
        let clock = ManualClock::new();
        let lim = limiter(0);
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = fetch_with_retry(&lim, &clock, &policy(4, 100), "k", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::transient("k", "429")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        // Three transient failures back off in 1:2:4 ratio before the
        // terminal one.
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
    }

    #[tokio::test]
    async fn transient_failure_then_success() {
        let clock = ManualClock::new();
        let lim = limiter(0);
        let attempts = AtomicUsize::new(0);

        let result = fetch_with_retry(&lim, &clock, &policy(4, 100), "k", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AppError::transient("k", "503"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(100)]);
    }

    #[tokio::test]
    async fn non_retryable_failure_propagates_immediately() {
        let clock = ManualClock::new();
        let lim = limiter(0);
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = fetch_with_retry(&lim, &clock, &policy(4, 100), "k", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::fetch("k", "404")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn limiter_spaces_consecutive_calls() {
        let clock = ManualClock::new();
        let lim = limiter(1000);

        lim.acquire(&clock).await;
        assert!(clock.sleeps().is_empty());

        lim.acquire(&clock).await;
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(1000)]);
    }

    #[tokio::test]
    async fn limiter_skips_wait_after_interval_elapsed() {
        let clock = ManualClock::new();
        let lim = limiter(1000);

        lim.acquire(&clock).await;
        clock.sleep(Duration::from_millis(1500)).await;
        lim.acquire(&clock).await;

        // Only the explicit 1500ms sleep, no limiter wait.
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(1500)]);
    }
}
