//! Domain models.

pub mod config;
pub mod credentials;
pub mod execution;
pub mod path;
pub mod retry;
pub mod scan;

pub use config::{Config, CredentialsConfig, LoggingConfig, RetryConfig};
pub use credentials::{
    is_secret_key, CredentialProvider, CredentialProviderArg, CredentialProviderFunction,
    CredentialSet, ProviderFamily, StorageOptions,
};
pub use execution::{ExecutionState, ObjectMeta, RowBatch, RowPayload};
pub use path::{PathDescriptor, Scheme};
pub use retry::{RetryPolicy, DEFAULT_MAX_RETRIES};
pub use scan::{FileFormat, NdjsonScanArgs, ScanArgs, ScanPlanNode};
