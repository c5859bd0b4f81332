//! Fixed-interval retry policy.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts made while waiting for Redis at startup.
pub const STARTUP_ATTEMPTS: u32 = 300;

/// Pause between startup attempts.
pub const STARTUP_DELAY: Duration = Duration::from_secs(1);

/// Retry policy with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::startup()
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and delay.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy used to wait for Redis during startup: 300 attempts, 1s apart.
    #[must_use]
    pub const fn startup() -> Self {
        Self::fixed(STARTUP_ATTEMPTS, STARTUP_DELAY)
    }

    /// A single attempt, no retry.
    #[must_use]
    pub const fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Worst-case time spent sleeping before giving up.
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }

    /// Runs `f` until it succeeds or the attempt budget is spent.
    ///
    /// On exhaustion returns the last error together with the number of
    /// attempts made. A zero budget is treated as one attempt.
    pub async fn execute<F, Fut, T, E>(&self, mut f: F) -> Result<T, (E, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "Succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(e) if attempt >= max_attempts => return Err((e, attempt)),
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_startup_policy() {
        let policy = RetryPolicy::startup();
        assert_eq!(policy.max_attempts, 300);
        assert_eq!(policy.delay, Duration::from_secs(1));
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_total_delay() {
        assert_eq!(RetryPolicy::startup().total_delay(), Duration::from_secs(299));
        assert_eq!(RetryPolicy::once().total_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retry_success() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let result: Result<i32, (&str, u32)> = policy.execute(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_eventual_success() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(1));
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, (&str, u32)> = policy
            .execute(|| {
                let attempts = attempts_clone.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("not yet")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_policy_is_bounded() {
        let policy = RetryPolicy::startup();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let started = Instant::now();

        let result: Result<(), (&str, u32)> = policy
            .execute(|| {
                let a = attempts_clone.clone();
                async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err("connection refused")
                }
            })
            .await;

        let (error, made) = result.unwrap_err();
        assert_eq!(error, "connection refused");
        assert_eq!(made, 300);
        assert_eq!(attempts.load(Ordering::SeqCst), 300);
        assert_eq!(started.elapsed(), Duration::from_secs(299));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_does_not_grow() {
        let policy = RetryPolicy::fixed(4, Duration::from_secs(1));
        let stamps = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let stamps_clone = stamps.clone();
        let started = Instant::now();

        let _: Result<(), (&str, u32)> = policy
            .execute(|| {
                let s = stamps_clone.clone();
                async move {
                    s.lock().push(started.elapsed());
                    Err("fail")
                }
            })
            .await;

        let stamps = stamps.lock();
        let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps, vec![Duration::from_secs(1); 3]);
    }

    #[tokio::test]
    async fn test_zero_budget_runs_once() {
        let policy = RetryPolicy::fixed(0, Duration::ZERO);
        let attempts = AtomicU32::new(0);
        let result: Result<(), (&str, u32)> = policy
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("fail") }
            })
            .await;
        assert_eq!(result.unwrap_err().1, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
