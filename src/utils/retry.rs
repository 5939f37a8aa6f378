//! Retry utilities for flaky sources
//!
//! Bounded retries with exponential backoff. Attempt 0 runs immediately;
//! attempt `n` waits `base * multiplier^(n-1)`, capped at `max_delay_ms`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FetchConfig;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Retry policy from the `[fetch]` section
    pub fn from_fetch_config(config: &FetchConfig) -> Self {
        Self::with_delays(
            config.max_retries,
            config.retry_base_delay_ms,
            config.retry_max_delay_ms,
        )
    }

    /// Calculate delay for a given attempt using exponential backoff
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let exponential =
                self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
            (exponential as u64).min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }
}

/// Execute an operation with retry logic, using a custom retry predicate
///
/// Errors for which `should_retry` returns false are returned at once.
/// Otherwise the last error is returned after `max_retries` extra attempts.
///
/// # Example
///
/// ```no_run
/// use sitewatch::utils::retry::{with_retry_if, RetryConfig};
///
/// async fn fetch_data() -> Result<String, std::io::Error> {
///     Ok("data".to_string())
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), std::io::Error> {
///     let config = RetryConfig::default();
///     let data = with_retry_if(
///         &config,
///         || async { fetch_data().await },
///         |e| e.kind() == std::io::ErrorKind::TimedOut,
///     )
///     .await?;
///     println!("{data}");
///     Ok(())
/// }
/// ```
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    with_retry_until(config, &CancellationToken::new(), operation, should_retry).await
}

/// [`with_retry_if`] that gives up instead of waiting out a backoff once
/// `cancel` fires
///
/// An attempt already running is never interrupted. The error it produced is
/// returned as soon as cancellation is seen.
pub async fn with_retry_until<T, E, F, Fut, P>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    debug!(error = %e, "Non-retryable error encountered");
                    return Err(e);
                }
                if attempt >= config.max_retries {
                    return Err(e);
                }

                warn!(
                    attempt = attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Operation failed, will retry"
                );
                attempt += 1;

                let delay = config.calculate_delay(attempt);
                debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying operation after delay"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(attempt = attempt, "Retry abandoned on shutdown");
                        return Err(e);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Execute an operation, retrying every error
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(config, operation, |_| true).await
}
