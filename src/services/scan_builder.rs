//! Scan construction.
//!
//! `scan_*` functions parse the path, select the credential mechanism and
//! attach a retry budget. They never perform I/O and never call
//! caller-supplied code, so a nonexistent bucket or an unknown scheme only
//! surfaces when the returned [`LazyScan`] is collected.

use futures::TryStreamExt;
use tracing::debug;

use super::credential_resolver::CredentialResolver;
use super::executor::{BatchStream, Executor};
use crate::domain::errors::ScanResult;
use crate::domain::models::{
    FileFormat, NdjsonScanArgs, PathDescriptor, RetryPolicy, RowBatch, ScanArgs, ScanPlanNode,
};

/// Build the plan node for one scan.
///
/// Fails only for a malformed path string.
pub fn build(format: FileFormat, path: &str, args: ScanArgs) -> ScanResult<ScanPlanNode> {
    let path = PathDescriptor::parse(path)?;
    let credential_provider = CredentialResolver::resolve(
        path.scheme(),
        &args.credential_provider,
        args.storage_options.as_ref(),
    );
    let retry_policy = RetryPolicy::from_option(args.retries);
    let storage_options = args.storage_options.unwrap_or_default();

    let plan = ScanPlanNode::new(
        format,
        path,
        credential_provider,
        retry_policy,
        storage_options,
    );
    debug!(scan_id = %plan.id(), plan = %plan, "scan planned");
    Ok(plan)
}

pub fn scan_parquet(path: &str, args: ScanArgs) -> ScanResult<LazyScan> {
    build(FileFormat::Parquet, path, args).map(LazyScan::new)
}

pub fn scan_csv(path: &str, args: ScanArgs) -> ScanResult<LazyScan> {
    build(FileFormat::Csv, path, args).map(LazyScan::new)
}

pub fn scan_ipc(path: &str, args: ScanArgs) -> ScanResult<LazyScan> {
    build(FileFormat::Ipc, path, args).map(LazyScan::new)
}

/// NDJSON scans take no retries option and always use the engine default.
pub fn scan_ndjson(path: &str, args: NdjsonScanArgs) -> ScanResult<LazyScan> {
    build(FileFormat::Ndjson, path, args.into()).map(LazyScan::new)
}

/// Scan any format. `retries` is ignored for formats that do not expose it.
pub fn scan(format: FileFormat, path: &str, mut args: ScanArgs) -> ScanResult<LazyScan> {
    if !format.exposes_retries() {
        args.retries = None;
    }
    build(format, path, args).map(LazyScan::new)
}

/// A lazy handle over a planned scan.
#[derive(Debug, Clone)]
pub struct LazyScan {
    plan: ScanPlanNode,
}

impl LazyScan {
    pub fn new(plan: ScanPlanNode) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &ScanPlanNode {
        &self.plan
    }

    /// Render the plan without executing it.
    pub fn describe(&self) -> String {
        self.plan.to_string()
    }

    /// Execute the scan and return its batches lazily.
    pub async fn stream(&self, executor: &Executor) -> ScanResult<BatchStream> {
        executor.execute(&self.plan).await
    }

    /// Execute the scan and materialize every batch.
    ///
    /// Either all batches are returned or the first failure is.
    pub async fn collect(&self, executor: &Executor) -> ScanResult<Vec<RowBatch>> {
        self.stream(executor).await?.try_collect().await
    }
}
