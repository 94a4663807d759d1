use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::models::{ObjectMeta, PathDescriptor, StorageOptions};
use crate::domain::ports::{ObjectStoreClient, ObjectStoreFactory, StoreError};

#[derive(Default)]
struct Shared {
    /// Objects keyed by `bucket/key`; local paths use the bare path.
    objects: RwLock<BTreeMap<String, Bytes>>,
    transient_failures: AtomicU32,
    requests: AtomicUsize,
}

impl Shared {
    fn take_transient_failure(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Factory for in-process stores sharing one object map.
///
/// Records every connection and the options it was given, and can inject
/// transient failures.
#[derive(Default)]
pub struct InMemoryStoreFactory {
    shared: Arc<Shared>,
    connections: AtomicUsize,
    last_options: Mutex<Option<StorageOptions>>,
}

impl InMemoryStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` at `bucket/key` (or at a local path).
    pub fn put(&self, location: &str, bytes: Bytes) {
        self.shared
            .objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(location.to_string(), bytes);
    }

    /// Fail the next `count` requests with a transient error.
    pub fn fail_next_transient(&self, count: u32) {
        self.shared.transient_failures.store(count, Ordering::SeqCst);
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Requests made by all clients, failed ones included.
    pub fn requests(&self) -> usize {
        self.shared.requests.load(Ordering::SeqCst)
    }

    /// Options passed to the most recent `connect`.
    pub fn last_options(&self) -> Option<StorageOptions> {
        self.last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for InMemoryStoreFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStoreFactory")
            .field("connections", &self.connections())
            .field("requests", &self.requests())
            .finish_non_exhaustive()
    }
}

impl ObjectStoreFactory for InMemoryStoreFactory {
    fn connect(
        &self,
        path: &PathDescriptor,
        options: &StorageOptions,
    ) -> Result<Arc<dyn ObjectStoreClient>, StoreError> {
        if !path.scheme().is_recognized() {
            return Err(StoreError::UnsupportedScheme(path.scheme().to_string()));
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        *self
            .last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(options.clone());

        Ok(Arc::new(InMemoryStore {
            shared: Arc::clone(&self.shared),
            bucket: path.bucket().map(str::to_string),
        }))
    }
}

/// Client over one bucket of an [`InMemoryStoreFactory`].
pub struct InMemoryStore {
    shared: Arc<Shared>,
    bucket: Option<String>,
}

impl InMemoryStore {
    fn full_key(&self, location: &str) -> String {
        match &self.bucket {
            Some(bucket) => format!("{bucket}/{location}"),
            None => location.to_string(),
        }
    }

    fn begin_request(&self) -> Result<(), StoreError> {
        self.shared.requests.fetch_add(1, Ordering::SeqCst);
        if self.shared.take_transient_failure() {
            return Err(StoreError::Transient("injected failure".to_string()));
        }
        Ok(())
    }

    fn bucket_exists(&self, objects: &BTreeMap<String, Bytes>) -> bool {
        let Some(bucket) = &self.bucket else {
            return true;
        };
        let prefix = format!("{bucket}/");
        objects.keys().any(|key| key.starts_with(&prefix))
    }

    fn lookup(&self, location: &str) -> Result<Bytes, StoreError> {
        let objects = self
            .shared
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.bucket_exists(&objects) {
            return Err(StoreError::NotFound {
                location: location.to_string(),
                message: format!(
                    "bucket '{}' does not exist",
                    self.bucket.as_deref().unwrap_or_default()
                ),
            });
        }
        objects
            .get(&self.full_key(location))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                location: location.to_string(),
                message: "no such object".to_string(),
            })
    }
}

#[async_trait]
impl ObjectStoreClient for InMemoryStore {
    async fn head(&self, location: &str) -> Result<ObjectMeta, StoreError> {
        self.begin_request()?;
        let bytes = self.lookup(location)?;
        Ok(ObjectMeta {
            location: location.to_string(),
            size: bytes.len() as u64,
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        self.begin_request()?;
        let objects = self
            .shared
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.bucket_exists(&objects) {
            return Err(StoreError::NotFound {
                location: prefix.to_string(),
                message: "bucket does not exist".to_string(),
            });
        }

        let root = self.bucket.as_ref().map(|b| format!("{b}/")).unwrap_or_default();
        Ok(objects
            .iter()
            .filter_map(|(key, bytes)| {
                let location = key.strip_prefix(&root)?;
                let matches = prefix.is_empty()
                    || location == prefix
                    || location
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'));
                matches.then(|| ObjectMeta {
                    location: location.to_string(),
                    size: bytes.len() as u64,
                })
            })
            .collect())
    }

    async fn get(&self, location: &str) -> Result<Bytes, StoreError> {
        self.begin_request()?;
        self.lookup(location)
    }
}
