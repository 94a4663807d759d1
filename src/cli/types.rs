//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::scan::ScanCommandArgs;

#[derive(Parser, Debug)]
#[command(name = "cloudscan")]
#[command(about = "Cloudscan - lazy scans over cloud object storage", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .cloudscan/config.yaml and CLOUDSCAN_* variables)
    #[arg(short, long, global = true, env = "CLOUDSCAN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a scan over a path and collect it
    Scan(ScanCommandArgs),
}
