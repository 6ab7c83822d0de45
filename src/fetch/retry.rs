//! Exponential backoff for transient transfer failures.
//!
//! Retries are scoped to one candidate. Once the budget is spent the last
//! error is wrapped in [`TransferError::RetriesExhausted`] and the caller
//! moves on to the next candidate.

use super::error::TransferError;
use crate::config::FetchConfig;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    pub base: Duration,
    pub factor: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base: Duration::ZERO,
            factor: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry_count` (0 = first retry).
    pub fn delay(&self, retry_count: u32) -> Duration {
        retry_delay(retry_count, self.base, self.factor, self.max_delay)
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: Duration::from_millis(config.backoff_base_ms),
            factor: config.backoff_factor,
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

/// `base * factor^retry_count`, capped at `max`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use imagevault::fetch::retry_delay;
///
/// let base = Duration::from_millis(100);
/// let cap = Duration::from_secs(1);
/// assert_eq!(retry_delay(0, base, 2.0, cap), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, base, 2.0, cap), Duration::from_millis(400));
/// assert_eq!(retry_delay(10, base, 2.0, cap), cap);
/// ```
pub fn retry_delay(retry_count: u32, base: Duration, factor: f64, max: Duration) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
    let scaled = base.as_secs_f64() * factor.powi(exponent);
    Duration::try_from_secs_f64(scaled)
        .unwrap_or(max)
        .min(max)
}

/// Run `op` until it succeeds, fails permanently, or the budget runs out.
///
/// `op` receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    locator: &str,
    mut op: F,
) -> Result<T, TransferError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransferError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt <= policy.max_retries => {
                let delay = policy.delay(attempt - 1);
                tracing::warn!(
                    locator,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient transfer failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if err.is_transient() && attempt > 1 => {
                return Err(TransferError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        }
    }
}
