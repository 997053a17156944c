//! Bounded exponential backoff
//!
//! [`RetryPolicy::execute`] runs a fallible async operation until it
//! succeeds, until `max_attempts` attempts have been made, or until the next
//! wait would push total elapsed time past `max_elapsed_time`, whichever
//! comes first. On exhaustion the last underlying error is returned as is.
//!
//! Each call builds a fresh [`Backoff`] so independent operations never
//! share attempt counts or deadlines.
//!
//! Cancellation is checked before every attempt and raced against both the
//! attempt itself and every wait; it always surfaces as [`Error::Cancelled`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Retry executor configured once and reused for many operations
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` under this policy
    ///
    /// `notify` is called after every failed attempt that will be retried,
    /// with the error, the 1-based attempt number and the wait before the
    /// next attempt. It is not called for the final failure.
    pub async fn execute<T, F, Fut, N>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
        mut notify: N,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        N: FnMut(&Error, u32, Duration),
    {
        let mut backoff = Backoff::start(&self.config);

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let attempt = backoff.begin_attempt();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = operation() => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => e,
            };

            let Some(delay) = backoff.next_delay() else {
                return Err(err);
            };

            notify(&err, attempt, delay);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Execution state for one retried operation
#[derive(Debug)]
struct Backoff {
    attempts: u32,
    next_interval: Duration,
    started: Instant,
    max_attempts: u32,
    max_interval: Duration,
    max_elapsed_time: Duration,
    multiplier: f64,
}

impl Backoff {
    fn start(config: &RetryConfig) -> Self {
        Self {
            attempts: 0,
            next_interval: config.initial_interval.min(config.max_interval),
            started: Instant::now(),
            max_attempts: config.max_attempts.max(1),
            max_interval: config.max_interval,
            max_elapsed_time: config.max_elapsed_time,
            multiplier: config.multiplier,
        }
    }

    fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Wait before the next attempt, `None` once the budget is spent
    fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }

        let delay = self.next_interval;
        if self.started.elapsed() + delay > self.max_elapsed_time {
            return None;
        }

        let grown = Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_interval);
        self.next_interval = grown.min(self.max_interval);

        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(20),
            max_elapsed_time: Duration::from_secs(5),
            max_attempts,
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn success_is_not_retried() {
        let policy = RetryPolicy::new(fast_config(5));
        let calls = AtomicU32::new(0);
        let mut notified = 0;

        let value = policy
            .execute(
                &CancellationToken::new(),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, Error>(42) }
                },
                |_, _, _| notified += 1,
            )
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(notified, 0);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let policy = RetryPolicy::new(fast_config(5));
        let calls = Arc::new(AtomicU32::new(0));
        let mut delays = Vec::new();

        let result = policy
            .execute(
                &CancellationToken::new(),
                || {
                    let calls = calls.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(Error::http("transient"))
                        } else {
                            Ok("done")
                        }
                    }
                },
                |_, attempt, delay| delays.push((attempt, delay)),
            )
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            delays,
            vec![
                (1, Duration::from_millis(5)),
                (2, Duration::from_millis(10))
            ]
        );
    }

    #[tokio::test]
    async fn exhaustion_returns_last_underlying_error() {
        let policy = RetryPolicy::new(fast_config(3));
        let calls = Arc::new(AtomicU32::new(0));
        let mut notified = 0;

        let err = policy
            .execute(
                &CancellationToken::new(),
                || {
                    let calls = calls.clone();
                    async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                        Err::<(), _>(Error::http(format!("failure #{}", n)))
                    }
                },
                |_, _, _| notified += 1,
            )
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(notified, 2);
        assert_eq!(err.to_string(), "HTTP error: failure #3");
    }

    #[tokio::test]
    async fn interval_growth_is_capped() {
        let mut backoff = Backoff::start(&fast_config(10));
        let mut seen = Vec::new();
        for _ in 0..5 {
            backoff.begin_attempt();
            seen.push(backoff.next_delay().unwrap());
        }
        assert_eq!(
            seen,
            vec![5, 10, 20, 20, 20]
                .into_iter()
                .map(Duration::from_millis)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn elapsed_budget_bounds_attempts() {
        let config = RetryConfig {
            initial_interval: Duration::from_millis(40),
            max_interval: Duration::from_millis(40),
            max_elapsed_time: Duration::from_millis(100),
            max_attempts: 100,
            multiplier: 1.0,
        };
        let policy = RetryPolicy::new(config);
        let calls = Arc::new(AtomicU32::new(0));

        let started = std::time::Instant::now();
        let result = policy
            .execute(
                &CancellationToken::new(),
                || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(Error::http("down"))
                    }
                },
                |_, _, _| {},
            )
            .await;

        assert!(result.is_err());
        let made = calls.load(Ordering::SeqCst);
        assert!((2..=3).contains(&made), "expected 2-3 attempts, got {made}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancellation_during_wait_aborts_promptly() {
        let config = RetryConfig {
            initial_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Duration::from_secs(300),
            max_attempts: 10,
            multiplier: 1.0,
        };
        let policy = RetryPolicy::new(config);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = policy
            .execute(
                &cancel,
                || async { Err::<(), _>(Error::http("down")) },
                |_, _, _| {},
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn cancellation_interrupts_in_flight_attempt() {
        let policy = RetryPolicy::new(fast_config(3));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = policy
            .execute(
                &cancel,
                || async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                },
                |_, _, _| {},
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn already_cancelled_makes_no_attempt() {
        let policy = RetryPolicy::new(fast_config(3));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let err = policy
            .execute(
                &cancel,
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                |_, _, _| {},
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn each_execution_gets_a_fresh_budget() {
        let policy = RetryPolicy::new(fast_config(2));

        for _ in 0..2 {
            let calls = Arc::new(AtomicU32::new(0));
            let _ = policy
                .execute(
                    &CancellationToken::new(),
                    || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Err::<(), _>(Error::http("down"))
                        }
                    },
                    |_, _, _| {},
                )
                .await;
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test]
    async fn no_retry_policy_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::no_retry()
            .execute(
                &CancellationToken::new(),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(Error::http("down")) }
                },
                |_, _, _| {},
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
