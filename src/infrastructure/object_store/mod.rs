//! Object store adapters.
//!
//! - `cloud`: S3, GCS, Azure and local files through the `object_store` crate
//! - `memory`: in-process store with failure injection for tests and demos

pub mod cloud;
pub mod memory;

pub use cloud::{CloudStoreFactory, ObjectStoreAdapter};
pub use memory::{InMemoryStore, InMemoryStoreFactory};
