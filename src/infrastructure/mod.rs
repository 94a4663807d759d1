//! Infrastructure layer module
//!
//! Adapters and external integrations:
//! - Object storage via the `object_store` crate, plus an in-memory store
//! - Environment-backed credential providers
//! - Batch decoders
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod credentials;
pub mod decoders;
pub mod logging;
pub mod object_store;
