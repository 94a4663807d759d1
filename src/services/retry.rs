//! Retry with exponential backoff for object store operations.
//!
//! The number of retries comes from the scan's [`RetryPolicy`]; the backoff
//! curve and per-attempt timeout are engine settings. Backoff doubles with
//! each retry and is capped: 100ms → 200ms → 400ms → ... → `max_backoff_ms`.
//!
//! # Retry Decision
//! - Retry on: transient store errors and attempt timeouts
//! - Do NOT retry: not found, permission denied, configuration errors
//! - Stop at once when the cancellation token fires

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::models::{RetryConfig, RetryPolicy};
use crate::domain::ports::StoreError;

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// A permanent error, returned on the attempt it occurred.
    Permanent(StoreError),
    /// Transient errors on every allowed attempt; holds the last one.
    Exhausted { last: StoreError, attempts: u32 },
    Cancelled,
}

/// Backoff and timeout shared by every scan an executor runs.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    attempt_timeout: Duration,
}

impl Backoff {
    pub fn new(initial_backoff_ms: u64, max_backoff_ms: u64, attempt_timeout: Duration) -> Self {
        Self {
            initial_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
            attempt_timeout,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.initial_backoff_ms,
            config.max_backoff_ms,
            Duration::from_millis(config.attempt_timeout_ms),
        )
    }

    /// Run `operation` until it succeeds, fails permanently, exhausts the
    /// policy or is cancelled. Each attempt is bounded by the attempt timeout.
    pub async fn retry<F, Fut, T>(
        &self,
        policy: RetryPolicy,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Cancelled),
                outcome = timeout(self.attempt_timeout, operation()) => outcome,
            };

            let err = match outcome {
                Ok(Ok(result)) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Ok(Err(err)) => err,
                Err(_) => StoreError::Transient(format!(
                    "attempt timed out after {:?}",
                    self.attempt_timeout
                )),
            };

            if !err.is_transient() {
                debug!("Permanent error, not retrying: {}", err);
                return Err(RetryError::Permanent(err));
            }

            if attempt >= policy.max_retries() {
                warn!("Operation failed after {} attempts: {}", attempt + 1, err);
                return Err(RetryError::Exhausted {
                    last: err,
                    attempts: attempt + 1,
                });
            }

            let backoff = self.calculate_backoff(attempt);
            warn!(
                "Attempt {} failed with transient error: {}. Retrying in {:?}...",
                attempt + 1,
                err,
                backoff
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Cancelled),
                () = sleep(backoff) => {}
            }
            attempt += 1;
        }
    }

    /// Formula: min(initial_backoff * 2^attempt, max_backoff)
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
