//! Object store port - the network client behind a scan.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::errors::StoreError;
use crate::domain::models::{ObjectMeta, PathDescriptor, StorageOptions};

/// Read access to one bucket, container or filesystem root.
///
/// Locations are keys relative to that root.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Metadata of a single object.
    async fn head(&self, location: &str) -> Result<ObjectMeta, StoreError>;

    /// All objects whose location starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError>;

    /// Full contents of an object.
    async fn get(&self, location: &str) -> Result<Bytes, StoreError>;
}

/// Builds clients from a path and the merged storage options and credentials.
///
/// Called during execution only, after credentials are resolved.
pub trait ObjectStoreFactory: Send + Sync {
    fn connect(
        &self,
        path: &PathDescriptor,
        options: &StorageOptions,
    ) -> Result<Arc<dyn ObjectStoreClient>, StoreError>;
}
