pub mod auto_provider_registry;
pub mod credential_boundary;
pub mod credential_resolver;
pub mod executor;
pub mod retry;
pub mod scan_builder;

pub use auto_provider_registry::AutoProviderRegistry;
pub use credential_boundary::{resolve_now, CredentialError};
pub use credential_resolver::CredentialResolver;
pub use executor::{BatchStream, Executor};
pub use retry::{Backoff, RetryError};
pub use scan_builder::{build, scan, scan_csv, scan_ipc, scan_ndjson, scan_parquet, LazyScan};
