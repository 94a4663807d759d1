//! Credential providers backed by the process environment.
//!
//! These are the scheme-specific providers `AutoDetect` scans construct at
//! execution time.

pub mod env;

pub use env::{environment_registry, EnvCredentialSource};
