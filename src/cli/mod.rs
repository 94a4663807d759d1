//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::errors::ScanError;

/// Report a failed command and exit with status 1.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    let kind = err
        .downcast_ref::<ScanError>()
        .map_or("Error", |scan_err| scan_err.kind().as_str());

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": { "kind": kind, "message": format!("{err:#}") },
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
