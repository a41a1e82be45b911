//! Retry logic with exponential backoff
//!
//! Every individual request issued by a task goes through [`with_retry`].
//! Retries stay inside the task that issued the request, so a flaky page or
//! image never delays or fails its siblings beyond its own slot.
//!
//! # Example
//!
//! ```no_run
//! use helios_client::retry::{IsRetryable, with_retry};
//! use helios_client::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, || async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, 429, 5xx) should return `true`.
/// Permanent failures (4xx, undecodable payloads, invalid queries) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Http { status, .. } => *status == 429 || (500..600).contains(status),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            // Wrappers defer to what they wrap
            Error::Sizing { source, .. } | Error::PageFailed { source, .. } => {
                source.is_retryable()
            }
            Error::Config { .. }
            | Error::InvalidQuery(_)
            | Error::Serialization(_)
            | Error::MalformedPage { .. }
            | Error::Image(_)
            | Error::TaskPanicked(_)
            | Error::Other(_) => false,
        }
    }
}

/// Run `operation`, retrying transient failures with exponential backoff
///
/// Returns the first success, or the error that ended the attempts: a
/// non-retryable one, or the last one once `max_attempts` retries are spent.
/// With `max_attempts == 0` the operation runs exactly once.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut retries = 0;
    loop {
        let e = match operation().await {
            Ok(result) => {
                if retries > 0 {
                    tracing::debug!(retries, "Request recovered");
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        if !e.is_retryable() || retries >= config.max_attempts {
            if retries > 0 {
                tracing::warn!(error = %e, retries, "Request failed, giving up");
            }
            return Err(e);
        }

        let delay = backoff_delay(config, retries);
        retries += 1;
        tracing::debug!(
            error = %e,
            retry = retries,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis(),
            "Transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Delay before retry number `retries + 1`: `initial * multiplier^retries`,
/// capped at `max_delay`, then jittered if enabled
fn backoff_delay(config: &RetryConfig, retries: u32) -> Duration {
    let exponent = i32::try_from(retries).unwrap_or(i32::MAX);
    let secs = config.initial_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    // Out-of-range products (overflow, NaN) saturate at the cap
    let base = Duration::try_from_secs_f64(secs)
        .unwrap_or(config.max_delay)
        .min(config.max_delay);

    if config.jitter { add_jitter(base) } else { base }
}

/// Add random jitter to a delay, uniformly between `delay` and `2 * delay`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    delay.mul_f64(1.0 + jitter_factor)
}
