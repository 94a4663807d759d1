//! Cloudscan - lazy scans over cloud object storage
//!
//! Building a scan is cheap and local: the path is parsed, exactly one
//! credential mechanism is selected and a retry budget is attached, but
//! nothing touches the network. Credentials are resolved and objects are
//! opened only when the scan is collected, and every failure from that point
//! on surfaces as a single `ComputeError` carrying the original message.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, port traits and errors
//! - **Service Layer** (`services`): credential resolution, scan planning, execution
//! - **Infrastructure Layer** (`infrastructure`): object stores, credential sources, config, logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use cloudscan::{scan_parquet, Executor, ScanArgs};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let lazy = scan_parquet("s3://bucket/data.parquet", ScanArgs::new().with_retries(0))?;
//!     let batches = lazy.collect(&Executor::default()).await?;
//!     println!("{} batches", batches.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ErrorKind, ScanError, ScanResult};
pub use domain::models::{
    Config, CredentialProvider, CredentialProviderArg, CredentialSet, FileFormat,
    NdjsonScanArgs, PathDescriptor, RetryPolicy, RowBatch, RowPayload, ScanArgs, ScanPlanNode,
    Scheme, StorageOptions, DEFAULT_MAX_RETRIES,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    scan, scan_csv, scan_ipc, scan_ndjson, scan_parquet, CredentialResolver, Executor, LazyScan,
};
