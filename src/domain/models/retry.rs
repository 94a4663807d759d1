//! Retry budget attached to a scan.

use serde::{Deserialize, Serialize};

/// Engine-wide retry budget used when a scan does not specify one, including
/// for formats that do not expose a retries option.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Bounded number of re-attempts for transient I/O failures.
///
/// Owned by a scan plan and immutable once built. Backoff timing is an
/// engine concern configured on the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Fail on the first transient error.
    pub const fn no_retries() -> Self {
        Self::new(0)
    }

    /// Use `retries` when given, the engine default otherwise.
    pub fn from_option(retries: Option<u32>) -> Self {
        Self::new(retries.unwrap_or(DEFAULT_MAX_RETRIES))
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total number of attempts including the first one.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}
