//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cloudscan::domain::errors::BoxError;
use cloudscan::domain::models::{CredentialSet, ProviderFamily};
use cloudscan::domain::ports::CredentialSource;
use cloudscan::infrastructure::decoders::NdjsonDecoder;
use cloudscan::infrastructure::object_store::{CloudStoreFactory, InMemoryStoreFactory};
use cloudscan::services::{AutoProviderRegistry, Backoff, Executor};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Millisecond backoff so retry tests stay fast.
pub fn fast_backoff() -> Backoff {
    Backoff::new(1, 5, Duration::from_secs(5))
}

/// Credential source returning a fixed option set.
pub struct StaticSource;

#[async_trait]
impl CredentialSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn credentials(&self) -> Result<CredentialSet, BoxError> {
        Ok(CredentialSet::from_options(
            [("aws_region", "us-east-1")].into_iter().collect(),
        ))
    }
}

/// Registry whose constructors count how often they run, for every family.
pub fn counting_registry(cache: bool) -> (Arc<AutoProviderRegistry>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = [ProviderFamily::Aws, ProviderFamily::Gcp, ProviderFamily::Azure]
        .into_iter()
        .fold(AutoProviderRegistry::new(cache), |registry, family| {
            let counter = Arc::clone(&calls);
            registry.with_constructor(family, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(StaticSource) as Arc<dyn CredentialSource>)
            })
        });
    (Arc::new(registry), calls)
}

/// Registry whose constructors always fail with `message`.
pub fn failing_registry(message: &'static str) -> Arc<AutoProviderRegistry> {
    let registry = [ProviderFamily::Aws, ProviderFamily::Gcp, ProviderFamily::Azure]
        .into_iter()
        .fold(AutoProviderRegistry::new(true), |registry, family| {
            registry.with_constructor(family, move || Err(message.into()))
        });
    Arc::new(registry)
}

/// Executor over an in-memory store.
pub fn memory_executor(
    store: Arc<InMemoryStoreFactory>,
    providers: Arc<AutoProviderRegistry>,
) -> Executor {
    Executor::new(store, providers, Arc::new(NdjsonDecoder), fast_backoff())
}

/// Executor over real `object_store` clients.
pub fn cloud_executor(providers: Arc<AutoProviderRegistry>) -> Executor {
    Executor::new(
        Arc::new(CloudStoreFactory::new()),
        providers,
        Arc::new(NdjsonDecoder),
        fast_backoff(),
    )
}
