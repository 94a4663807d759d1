//! Domain errors for cloudscan.
//!
//! Every failure a caller can observe is a [`ScanError`]. Plan construction
//! only fails for malformed input ([`PlanError`]); everything that happens
//! once a scan is executed is first classified as an [`ExecutionFailure`]
//! and then surfaced as a `ComputeError` carrying the root message.

use std::fmt;

use thiserror::Error;

/// Boxed error type used at the boundaries with caller-supplied code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Kind of a [`ScanError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Any failure while resolving credentials, opening or reading a scan.
    ComputeError,
    /// The scan could not be planned because an argument is malformed.
    InvalidArgument,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComputeError => "ComputeError",
            Self::InvalidArgument => "InvalidArgument",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single user-facing error of the crate.
///
/// Constructed fresh for each failure. The message is the original failure
/// text, never rewritten or scrubbed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ScanError {
    kind: ErrorKind,
    message: String,
}

impl ScanError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `ComputeError`.
    pub fn compute(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ComputeError, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_compute_error(&self) -> bool {
        self.kind == ErrorKind::ComputeError
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Reasons a path string cannot be planned.
///
/// A nonexistent bucket or object is never a `PlanError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("path cannot be empty")]
    EmptyPath,

    #[error("path '{0}' has an empty scheme")]
    EmptyScheme(String),

    #[error("path '{path}' has an invalid scheme '{scheme}'")]
    InvalidScheme { path: String, scheme: String },

    #[error("path '{0}' does not name a bucket or container")]
    MissingBucket(String),

    #[error("unknown format '{0}', expected one of: parquet, csv, ndjson, ipc")]
    UnknownFormat(String),
}

impl From<PlanError> for ScanError {
    fn from(err: PlanError) -> Self {
        Self::new(ErrorKind::InvalidArgument, err.to_string())
    }
}

/// Classification of failures raised while a scan executes.
///
/// All variants surface as `ComputeError`; the classification drives
/// retry decisions and logging only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionFailure {
    /// Credential provider failed: user function, auto-provider constructor
    /// or the provider itself.
    #[error("{0}")]
    CredentialResolution(String),

    /// Resource missing, access denied or scheme unrecognized.
    #[error("{0}")]
    Access(String),

    /// Retryable I/O failure that outlived the retry budget.
    #[error("{message} (gave up after {attempts} attempts)")]
    Transient { message: String, attempts: u32 },

    /// The payload of an object could not be turned into row batches.
    #[error("{0}")]
    Decode(String),

    #[error("scan cancelled")]
    Cancelled,
}

impl From<ExecutionFailure> for ScanError {
    fn from(failure: ExecutionFailure) -> Self {
        Self::compute(failure.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failure_keeps_message_verbatim() {
        let err: ScanError =
            ExecutionFailure::CredentialResolution("err_magic_7".to_string()).into();

        assert_eq!(err.kind(), ErrorKind::ComputeError);
        assert_eq!(err.message(), "err_magic_7");
        assert_eq!(err.to_string(), "ComputeError: err_magic_7");
    }

    #[test]
    fn test_transient_failure_reports_attempts() {
        let err: ScanError = ExecutionFailure::Transient {
            message: "connection reset".to_string(),
            attempts: 3,
        }
        .into();

        assert!(err.is_compute_error());
        assert!(err.message().contains("connection reset"));
        assert!(err.message().contains("3 attempts"));
    }

    #[test]
    fn test_plan_error_is_invalid_argument() {
        let err: ScanError = PlanError::EmptyPath.into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!err.is_compute_error());
    }
}
