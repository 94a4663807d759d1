use thiserror::Error;

/// Object store operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("object not found at '{location}': {message}")]
    NotFound { location: String, message: String },

    #[error("access denied to '{location}': {message}")]
    PermissionDenied { location: String, message: String },

    #[error("unrecognized scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("invalid store configuration: {0}")]
    Configuration(String),

    #[error("transient I/O failure: {0}")]
    Transient(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Batch decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("failed to decode '{location}' as {format}: {message}")]
    Malformed {
        location: String,
        format: String,
        message: String,
    },
}
