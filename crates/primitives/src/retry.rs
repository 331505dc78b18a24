//! Bounded retry with exponential backoff
//!
//! Retry policy lives here, independent of any specific read, so the backoff
//! behavior is testable on its own and callers decide what counts as
//! retryable.

use crate::constants::read;
use std::{future::Future, time::Duration};
use tracing::debug;

/// How many times to attempt an operation and how long to back off in between
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled after every further failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: read::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(read::BASE_DELAY_MILLIS),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is exhausted
    ///
    /// `is_retryable` classifies failures; only classified failures consume
    /// backoff attempts, everything else surfaces immediately.
    pub async fn retry<T, E, F, Fut, R>(&self, is_retryable: R, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1u32;

        loop {
            match op().await {
                Ok(val) => return Ok(val),
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    debug!(
                        "Attempt {attempt}/{} hit a retryable failure, backing off {delay:?}: {err}",
                        self.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, thiserror::Error)]
    #[error("throttled")]
    struct Throttled;

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempt_budget_with_increasing_delays() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);
        let start = Instant::now();
        let mut offsets = Vec::new();

        let res: Result<(), Throttled> = policy
            .retry(
                |_| true,
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    offsets.push(start.elapsed());
                    async { Err(Throttled) }
                },
            )
            .await;

        assert!(res.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // backoff between attempts strictly increases: 1s then 2s
        assert_eq!(offsets[1] - offsets[0], Duration::from_millis(1000));
        assert_eq!(offsets[2] - offsets[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let res: Result<u32, Throttled> = policy
            .retry(
                |_| true,
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(Throttled)
                        } else {
                            Ok(42)
                        }
                    }
                },
            )
            .await;

        assert_eq!(res.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_surfaces_immediately() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let res: Result<(), Throttled> = policy
            .retry(
                |_| false,
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(Throttled) }
                },
            )
            .await;

        assert!(res.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
