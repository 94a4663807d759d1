use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3Builder, AmazonS3ConfigKey};
use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use object_store::gcp::{GoogleCloudStorageBuilder, GoogleConfigKey};
use object_store::local::LocalFileSystem;
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, RetryConfig};
use tracing::debug;

use crate::domain::models::{ObjectMeta, PathDescriptor, Scheme, StorageOptions};
use crate::domain::ports::{ObjectStoreClient, ObjectStoreFactory, StoreError};

/// Builds `object_store` clients for cloud and local paths.
///
/// The stores' own retries are disabled so that each scan's retry policy is
/// the only one in effect.
#[derive(Debug, Clone, Default)]
pub struct CloudStoreFactory;

impl CloudStoreFactory {
    pub fn new() -> Self {
        Self
    }
}

fn no_store_retries() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        ..RetryConfig::default()
    }
}

fn config_error(err: &object_store::Error) -> StoreError {
    StoreError::Configuration(err.to_string())
}

/// Apply `options` through the builder's typed config keys.
///
/// Keys the builder does not know are rejected, so typos surface at open.
fn configure<B, K>(
    mut builder: B,
    options: &StorageOptions,
    with_config: impl Fn(B, K, String) -> B,
) -> Result<B, StoreError>
where
    K: std::str::FromStr<Err = object_store::Error>,
{
    for (key, value) in options.iter() {
        let key: K = key.parse().map_err(|err| config_error(&err))?;
        builder = with_config(builder, key, value.to_string());
    }
    Ok(builder)
}

impl ObjectStoreFactory for CloudStoreFactory {
    fn connect(
        &self,
        path: &PathDescriptor,
        options: &StorageOptions,
    ) -> Result<Arc<dyn ObjectStoreClient>, StoreError> {
        let bucket = path.bucket().unwrap_or_default();

        let store: Arc<dyn ObjectStore> = match path.scheme() {
            Scheme::S3 => {
                let builder = AmazonS3Builder::new()
                    .with_url(format!("s3://{bucket}"))
                    .with_retry(no_store_retries());
                let builder = configure::<_, AmazonS3ConfigKey>(builder, options, |b, k, v| {
                    b.with_config(k, v)
                })?;
                Arc::new(builder.build().map_err(|err| config_error(&err))?)
            }
            Scheme::Gcs => {
                let builder = GoogleCloudStorageBuilder::new()
                    .with_url(format!("gs://{bucket}"))
                    .with_retry(no_store_retries());
                let builder = configure::<_, GoogleConfigKey>(builder, options, |b, k, v| {
                    b.with_config(k, v)
                })?;
                Arc::new(builder.build().map_err(|err| config_error(&err))?)
            }
            Scheme::Azure => {
                // abfs[s]://container@account.dfs.core.windows.net only
                // parses under the scheme it was written with
                let builder = MicrosoftAzureBuilder::new()
                    .with_url(format!("{}://{bucket}", path.scheme_literal()))
                    .with_retry(no_store_retries());
                let builder = configure::<_, AzureConfigKey>(builder, options, |b, k, v| {
                    b.with_config(k, v)
                })?;
                Arc::new(builder.build().map_err(|err| config_error(&err))?)
            }
            Scheme::Local => return local_store(path),
            Scheme::Unrecognized(scheme) => {
                return Err(StoreError::UnsupportedScheme(scheme.clone()));
            }
        };

        debug!(root = %path.scheme(), bucket, options = ?options, "object store connected");
        Ok(Arc::new(ObjectStoreAdapter::new(store, LocationStyle::Key)))
    }
}

fn local_store(path: &PathDescriptor) -> Result<Arc<dyn ObjectStoreClient>, StoreError> {
    let key = path.key();
    if key.starts_with('/') {
        let store = Arc::new(LocalFileSystem::new());
        return Ok(Arc::new(ObjectStoreAdapter::new(store, LocationStyle::Absolute)));
    }

    // normalized relative keys carry `..` only as leading segments
    let parents = key.split('/').take_while(|segment| *segment == "..").count();
    let mut root = std::env::current_dir()
        .map_err(|err| StoreError::Configuration(format!("no working directory: {err}")))?;
    for _ in 0..parents {
        if !root.pop() {
            break;
        }
    }
    let store = LocalFileSystem::new_with_prefix(&root).map_err(|err| config_error(&err))?;
    Ok(Arc::new(ObjectStoreAdapter::new(
        Arc::new(store),
        LocationStyle::Relative { parents },
    )))
}

/// How locations given to the adapter map onto store paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocationStyle {
    /// Relative to the store root, as is.
    Key,
    /// Absolute filesystem paths on a store rooted at `/`.
    Absolute,
    /// Paths relative to the working directory, on a store rooted `parents`
    /// directories above it.
    Relative { parents: usize },
}

/// [`ObjectStoreClient`] over any `object_store` implementation.
pub struct ObjectStoreAdapter {
    store: Arc<dyn ObjectStore>,
    style: LocationStyle,
}

impl ObjectStoreAdapter {
    /// Adapter over a store whose paths are used as given.
    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self::new(store, LocationStyle::Key)
    }

    fn new(store: Arc<dyn ObjectStore>, style: LocationStyle) -> Self {
        Self { store, style }
    }

    fn store_path(&self, location: &str) -> Result<StorePath, StoreError> {
        let relative = match self.style {
            LocationStyle::Key => location,
            LocationStyle::Absolute => location.trim_start_matches('/'),
            LocationStyle::Relative { parents } => (0..parents).fold(location, |rest, _| {
                rest.strip_prefix("..")
                    .map_or(rest, |rest| rest.trim_start_matches('/'))
            }),
        };
        StorePath::parse(relative)
            .map_err(|err| StoreError::Other(format!("invalid object path '{location}': {err}")))
    }

    fn location(&self, path: &StorePath) -> String {
        match self.style {
            LocationStyle::Key => path.to_string(),
            LocationStyle::Absolute => format!("/{path}"),
            LocationStyle::Relative { parents } => {
                let mut location = "../".repeat(parents);
                location.push_str(path.as_ref());
                location
            }
        }
    }

    fn object_meta(&self, meta: &object_store::ObjectMeta) -> ObjectMeta {
        ObjectMeta {
            location: self.location(&meta.location),
            size: u64::try_from(meta.size).unwrap_or(u64::MAX),
        }
    }
}

impl std::fmt::Debug for ObjectStoreAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreAdapter")
            .field("store", &self.store.to_string())
            .field("style", &self.style)
            .finish()
    }
}

#[async_trait]
impl ObjectStoreClient for ObjectStoreAdapter {
    async fn head(&self, location: &str) -> Result<ObjectMeta, StoreError> {
        let path = self.store_path(location)?;
        let meta = self
            .store
            .head(&path)
            .await
            .map_err(|err| map_store_error(location, err))?;
        Ok(self.object_meta(&meta))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let prefix_path = if prefix.is_empty() {
            None
        } else {
            Some(self.store_path(prefix)?)
        };
        let listed: Vec<object_store::ObjectMeta> = self
            .store
            .list(prefix_path.as_ref())
            .try_collect()
            .await
            .map_err(|err| map_store_error(prefix, err))?;

        let mut objects: Vec<ObjectMeta> = listed.iter().map(|meta| self.object_meta(meta)).collect();
        objects.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(objects)
    }

    async fn get(&self, location: &str) -> Result<Bytes, StoreError> {
        let path = self.store_path(location)?;
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|err| map_store_error(location, err))?;
        result
            .bytes()
            .await
            .map_err(|err| map_store_error(location, err))
    }
}

/// Classify an `object_store` error for retry decisions.
///
/// `Generic` covers network and server-side failures and is treated as
/// transient; anything else is permanent.
fn map_store_error(location: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { source, .. } => StoreError::NotFound {
            location: location.to_string(),
            message: source.to_string(),
        },
        object_store::Error::PermissionDenied { source, .. }
        | object_store::Error::Unauthenticated { source, .. } => StoreError::PermissionDenied {
            location: location.to_string(),
            message: source.to_string(),
        },
        object_store::Error::UnknownConfigurationKey { .. } => config_error(&err),
        object_store::Error::Generic { .. } | object_store::Error::JoinError { .. } => {
            StoreError::Transient(err.to_string())
        }
        other => StoreError::Other(other.to_string()),
    }
}
