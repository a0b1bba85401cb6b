//! Exponential backoff for transient storage failures.

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay after `current`, capped at `max_delay`. Multipliers below 1 or
    /// not finite fall back to a constant delay.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let multiplier = if self.backoff_multiplier.is_finite() {
            self.backoff_multiplier.max(1.0)
        } else {
            1.0
        };
        Duration::try_from_secs_f64(current.as_secs_f64() * multiplier)
            .map_or(self.max_delay(), |next| next.min(self.max_delay()))
    }
}

/// Run `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or `max_attempts` is reached. The last error is returned as is.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt >= max_attempts || !should_retry(&err) {
                    if attempt > 1 {
                        warn!(
                            operation = operation_name,
                            attempt,
                            max_attempts,
                            error = %err,
                            "Giving up after retries"
                        );
                    }
                    return Err(err);
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "Transient failure, retrying"
                );

                tokio::time::sleep(delay).await;
                delay = config.next_delay(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            backoff_multiplier: 2.0,
            max_delay_ms: 4,
        }
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, CoreError> = retry_with_backoff(
            &fast(),
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(CoreError::Transient("connection reset".into()))
                } else {
                    Ok(n)
                }
            },
            CoreError::is_transient,
            "test",
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), CoreError> = retry_with_backoff(
            &fast(),
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::Transient("pool timed out".into()))
            },
            CoreError::is_transient,
            "test",
        )
        .await;

        assert!(matches!(result, Err(CoreError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_next_delay_grows_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.next_delay(Duration::from_millis(100)), Duration::from_millis(200));
        assert_eq!(config.next_delay(Duration::from_millis(1_500)), Duration::from_millis(2_000));
    }

    #[test]
    fn test_next_delay_survives_bad_multipliers() {
        for multiplier in [-2.0, 0.0, f64::NAN, f64::INFINITY] {
            let config = RetryConfig {
                backoff_multiplier: multiplier,
                ..RetryConfig::default()
            };
            let next = config.next_delay(Duration::from_millis(100));
            assert!(next >= Duration::from_millis(100) && next <= config.max_delay(), "{multiplier}");
        }
    }

    #[tokio::test]
    async fn test_negative_multiplier_still_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let config = RetryConfig {
            backoff_multiplier: -1.5,
            ..fast()
        };
        let result: Result<(), CoreError> = retry_with_backoff(
            &config,
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::Transient("pool timed out".into()))
            },
            CoreError::is_transient,
            "test",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), CoreError> = retry_with_backoff(
            &fast(),
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::Conflict { slot: "L1/F1/A1".into() })
            },
            CoreError::is_transient,
            "test",
        )
        .await;

        assert!(matches!(result, Err(CoreError::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
