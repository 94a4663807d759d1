//! Domain layer for cloudscan
//!
//! Plan-time types and port traits. Nothing in this layer performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{BoxError, ErrorKind, ExecutionFailure, PlanError, ScanError, ScanResult};
