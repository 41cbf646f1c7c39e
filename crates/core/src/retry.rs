//! Retry with exponential backoff.
//!
//! The policy is deliberately simple: a fixed attempt cap, a base
//! delay, and a multiplicative backoff factor. Whether a given error
//! is worth another attempt is the caller's decision, passed in as a
//! predicate, so transport errors and domain errors can share the same
//! machinery.

use std::future::Future;
use std::time::Duration;

/// Backoff parameters for a retried operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Must be at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
        }
    }

    /// Delay to sleep after the given 1-based attempt fails.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        self.base_delay.mul_f64(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5), 2.0)
    }
}

/// Run `op` up to `policy.max_attempts` times.
///
/// Sleeps between attempts with exponential backoff. Stops early when
/// `is_retryable` returns false, returning that error unchanged. The
/// error of the final attempt is returned when all attempts fail.
pub async fn with_retry<T, E, F, Fut, P>(
    policy: RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(5), 2.0)
    }

    #[test]
    fn delays_grow_exponentially() {
        let p = policy();
        assert_eq!(p.delay_after(1), Duration::from_secs(5));
        assert_eq!(p.delay_after(2), Duration::from_secs(10));
        assert_eq!(p.delay_after(3), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let result = with_retry(policy(), |_: &&str| true, move |attempt| {
            calls2.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err("flaky")
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_base_then_doubled() {
        let start = Instant::now();
        let _: Result<(), &str> =
            with_retry(policy(), |_| true, |_| async { Err("always") }).await;
        // 5s after attempt 1 and 10s after attempt 2; no sleep after
        // the final attempt.
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_returned_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let result: Result<(), &str> = with_retry(
            policy(),
            |err: &&str| *err != "fatal",
            move |_| {
                calls2.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal") }
            },
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_return_last_error() {
        let result: Result<(), String> = with_retry(policy(), |_| true, |attempt| async move {
            Err(format!("attempt {attempt} failed"))
        })
        .await;
        assert_eq!(result, Err("attempt 3 failed".to_string()));
    }
}
