//! Scan plan nodes and the arguments used to build them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::PlanError;

use super::credentials::{CredentialProvider, CredentialProviderArg, StorageOptions};
use super::path::PathDescriptor;
use super::retry::RetryPolicy;

/// File format read by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Parquet,
    Csv,
    Ndjson,
    Ipc,
}

impl FileFormat {
    pub const ALL: [Self; 4] = [Self::Parquet, Self::Csv, Self::Ndjson, Self::Ipc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
            Self::Ndjson => "ndjson",
            Self::Ipc => "ipc",
        }
    }

    /// Whether the scan function for this format takes a retries option.
    /// Formats without one always use the engine default.
    pub fn exposes_retries(&self) -> bool {
        !matches!(self, Self::Ndjson)
    }
}

impl FromStr for FileFormat {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parquet" => Ok(Self::Parquet),
            "csv" => Ok(Self::Csv),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            "ipc" | "arrow" | "feather" => Ok(Self::Ipc),
            _ => Err(PlanError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud arguments shared by `scan_parquet`, `scan_csv` and `scan_ipc`.
#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    pub credential_provider: CredentialProviderArg,
    pub storage_options: Option<StorageOptions>,
    pub retries: Option<u32>,
}

impl ScanArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential_provider(mut self, credential_provider: CredentialProviderArg) -> Self {
        self.credential_provider = credential_provider;
        self
    }

    /// Equivalent to passing `credential_provider=None`.
    pub fn without_credential_provider(self) -> Self {
        self.with_credential_provider(CredentialProviderArg::Disabled)
    }

    pub fn with_storage_options(mut self, storage_options: StorageOptions) -> Self {
        self.storage_options = Some(storage_options);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

/// Cloud arguments for `scan_ndjson`, which has no retries option.
#[derive(Debug, Clone, Default)]
pub struct NdjsonScanArgs {
    pub credential_provider: CredentialProviderArg,
    pub storage_options: Option<StorageOptions>,
}

impl NdjsonScanArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential_provider(mut self, credential_provider: CredentialProviderArg) -> Self {
        self.credential_provider = credential_provider;
        self
    }

    pub fn without_credential_provider(self) -> Self {
        self.with_credential_provider(CredentialProviderArg::Disabled)
    }

    pub fn with_storage_options(mut self, storage_options: StorageOptions) -> Self {
        self.storage_options = Some(storage_options);
        self
    }
}

impl From<NdjsonScanArgs> for ScanArgs {
    fn from(args: NdjsonScanArgs) -> Self {
        Self {
            credential_provider: args.credential_provider,
            storage_options: args.storage_options,
            retries: None,
        }
    }
}

/// An inert plan fragment reading one path.
///
/// Built without touching the network and never mutated afterwards; an
/// executor borrows it for the duration of one execution.
#[derive(Debug, Clone)]
pub struct ScanPlanNode {
    id: Uuid,
    format: FileFormat,
    path: PathDescriptor,
    credential_provider: CredentialProvider,
    retry_policy: RetryPolicy,
    storage_options: StorageOptions,
}

impl ScanPlanNode {
    pub fn new(
        format: FileFormat,
        path: PathDescriptor,
        credential_provider: CredentialProvider,
        retry_policy: RetryPolicy,
        storage_options: StorageOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            format,
            path,
            credential_provider,
            retry_policy,
            storage_options,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn path(&self) -> &PathDescriptor {
        &self.path
    }

    pub fn credential_provider(&self) -> &CredentialProvider {
        &self.credential_provider
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Options passed to the object store alongside resolved credentials.
    pub fn storage_options(&self) -> &StorageOptions {
        &self.storage_options
    }
}

impl fmt::Display for ScanPlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SCAN {} [{}] credentials={} retries={}",
            self.path,
            self.format,
            self.credential_provider.name(),
            self.retry_policy.max_retries()
        )
    }
}
