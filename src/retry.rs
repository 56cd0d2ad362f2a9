use std::future::Future;
use std::time::Duration;

use rand::Rng as _;

/// What the error classifier wants done with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Retry and backoff settings for photo transfers.
///
/// `max_retries` bounds the in-attempt retries of a single variant transfer;
/// zero means each photo is tried once per pass. `base_delay_secs` doubles as
/// the fixed pause the album loop takes after a transient failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_secs: 5,
            max_delay_secs: 60,
        }
    }
}

impl RetryConfig {
    /// Delay before retry `retry` (0-indexed) of the same transfer.
    ///
    /// Formula: `min(base_delay * 2^retry, max_delay) + random_jitter(0..base_delay)`
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp_delay = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
        let capped = exp_delay.min(self.max_delay_secs);
        let jitter = if self.base_delay_secs > 0 {
            rand::thread_rng().gen_range(0..self.base_delay_secs)
        } else {
            0
        };
        Duration::from_secs(capped + jitter)
    }

    /// Fixed pause taken after a photo fails with a transient error, before
    /// the pass moves on to the next photo.
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }
}

/// Run `operation` until it succeeds, the classifier aborts, or
/// `max_retries` retries have been spent.
///
/// Returns the first `Ok` result, or the last error.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };
        attempt += 1;
        if classifier(&err) == RetryAction::Abort || attempt >= total_attempts {
            return Err(err);
        }
        let delay = config.delay_for_retry(attempt - 1);
        tracing::warn!(
            "Retryable error (attempt {}/{}), retrying in {}s: {}",
            attempt,
            total_attempts,
            delay.as_secs(),
            err
        );
        tokio::time::sleep(delay).await;
    }
}
