//! Implementation of the `cloudscan scan` command.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{presets, Attribute, Cell, Table};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{
    Config, CredentialProviderArg, FileFormat, RowBatch, ScanArgs, StorageOptions,
};
use crate::services::{scan, Executor};

#[derive(Args, Debug)]
pub struct ScanCommandArgs {
    /// Path to scan (s3://, gs://, az://, file:// or a local path)
    pub path: String,

    /// File format
    #[arg(short, long, default_value = "parquet")]
    pub format: FileFormat,

    /// Retries for transient I/O failures (ignored for ndjson)
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Disable credential providers and rely on ambient or anonymous access
    #[arg(long)]
    pub no_credentials: bool,

    /// Storage option passed to the object store, as KEY=VALUE
    #[arg(short = 'o', long = "storage-option", value_parser = parse_key_value)]
    pub storage_options: Vec<(String, String)>,

    /// Print the plan without executing it
    #[arg(long)]
    pub explain: bool,
}

impl ScanCommandArgs {
    fn scan_args(&self) -> ScanArgs {
        let mut args = ScanArgs::new();
        if self.no_credentials {
            args = args.with_credential_provider(CredentialProviderArg::Disabled);
        }
        if !self.storage_options.is_empty() {
            let options: StorageOptions = self.storage_options.iter().cloned().collect();
            args = args.with_storage_options(options);
        }
        if let Some(retries) = self.retries {
            args = args.with_retries(retries);
        }
        args
    }
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{value}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{value}'"));
    }
    Ok((key.to_string(), val.to_string()))
}

#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub success: bool,
    pub path: String,
    pub format: FileFormat,
    pub plan: String,
    pub executed: bool,
    pub objects: usize,
    pub batches: usize,
    pub rows: Option<usize>,
    pub bytes: usize,
}

impl ScanOutput {
    fn summarize(path: &str, format: FileFormat, plan: String, batches: &[RowBatch]) -> Self {
        let objects: BTreeSet<&str> = batches.iter().map(|b| b.source.as_str()).collect();
        let rows = batches
            .iter()
            .map(RowBatch::num_rows)
            .try_fold(0usize, |total, rows| Some(total + rows?));
        let bytes = batches.iter().filter_map(RowBatch::byte_len).sum();

        Self {
            success: true,
            path: path.to_string(),
            format,
            plan,
            executed: true,
            objects: objects.len(),
            batches: batches.len(),
            rows,
            bytes,
        }
    }
}

impl CommandOutput for ScanOutput {
    fn to_human(&self) -> String {
        if !self.executed {
            return self.plan.clone();
        }

        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec!["Objects", &self.objects.to_string()]);
        table.add_row(vec!["Batches", &self.batches.to_string()]);
        if let Some(rows) = self.rows {
            table.add_row(vec!["Rows", &rows.to_string()]);
        }
        if self.bytes > 0 {
            table.add_row(vec!["Bytes", &self.bytes.to_string()]);
        }

        format!("{}\n{table}", self.plan)
    }
}

pub async fn execute(args: ScanCommandArgs, config: &Config, json_mode: bool) -> Result<()> {
    let lazy = scan(args.format, &args.path, args.scan_args())
        .with_context(|| format!("Failed to plan scan of {}", args.path))?;
    let plan = lazy.describe();

    if args.explain {
        let output_data = ScanOutput {
            success: true,
            path: args.path,
            format: args.format,
            plan,
            executed: false,
            objects: 0,
            batches: 0,
            rows: None,
            bytes: 0,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    let executor = Executor::from_config(config);
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling scan");
            on_interrupt.cancel();
        }
    });

    let result = async {
        executor
            .execute_with_cancellation(lazy.plan(), cancel)
            .await?
            .try_collect::<Vec<_>>()
            .await
    }
    .await;
    interrupt.abort();

    let batches = result?;
    info!(batches = batches.len(), "scan collected");

    let output_data = ScanOutput::summarize(&args.path, args.format, plan, &batches);
    output(&output_data, json_mode);
    Ok(())
}
