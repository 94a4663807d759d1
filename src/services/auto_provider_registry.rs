//! Lazily constructed, optionally cached auto-detected credential providers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::credential_boundary::{call_on_blocking_pool, CredentialError};
use crate::domain::errors::BoxError;
use crate::domain::models::{ProviderFamily, Scheme};
use crate::domain::ports::{CredentialSource, CredentialSourceConstructor};

/// Constructors for scheme-specific providers, keyed by provider family.
///
/// Constructors run only when a scan with `AutoDetect` credentials executes.
/// With caching on, the first successfully constructed provider of a family
/// is shared by later scans and never replaced; failed constructions are not
/// cached.
pub struct AutoProviderRegistry {
    constructors: HashMap<ProviderFamily, CredentialSourceConstructor>,
    cache: Option<RwLock<HashMap<ProviderFamily, Arc<dyn CredentialSource>>>>,
}

impl AutoProviderRegistry {
    /// An empty registry; every scheme falls back to ambient access.
    pub fn new(cache_enabled: bool) -> Self {
        Self {
            constructors: HashMap::new(),
            cache: cache_enabled.then(|| RwLock::new(HashMap::new())),
        }
    }

    pub fn with_constructor<F>(mut self, family: ProviderFamily, constructor: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn CredentialSource>, BoxError> + Send + Sync + 'static,
    {
        self.constructors.insert(family, Arc::new(constructor));
        self
    }

    pub fn has_constructor(&self, family: ProviderFamily) -> bool {
        self.constructors.contains_key(&family)
    }

    /// Number of providers currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| {
            cache.read().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    /// The provider for `scheme`, constructing it if needed.
    ///
    /// `Ok(None)` when no constructor covers the scheme.
    pub async fn provider_for(
        &self,
        scheme: &Scheme,
    ) -> Result<Option<Arc<dyn CredentialSource>>, CredentialError> {
        let Some(family) = ProviderFamily::for_scheme(scheme) else {
            return Ok(None);
        };
        let Some(constructor) = self.constructors.get(&family) else {
            return Ok(None);
        };

        if let Some(cached) = self.cached(family) {
            debug!(family = %family, provider = cached.name(), "reusing cached credential provider");
            return Ok(Some(cached));
        }

        debug!(family = %family, "constructing credential provider");
        let constructor = Arc::clone(constructor);
        let source = call_on_blocking_pool(move || constructor())
            .await
            .map_err(CredentialError::Construction)?;

        Ok(Some(self.store(family, source)))
    }

    fn cached(&self, family: ProviderFamily) -> Option<Arc<dyn CredentialSource>> {
        let cache = self.cache.as_ref()?;
        cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&family)
            .cloned()
    }

    fn store(
        &self,
        family: ProviderFamily,
        source: Arc<dyn CredentialSource>,
    ) -> Arc<dyn CredentialSource> {
        let Some(cache) = self.cache.as_ref() else {
            return source;
        };
        let mut entries = cache.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(family).or_insert(source))
    }
}

impl std::fmt::Debug for AutoProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoProviderRegistry")
            .field("families", &self.constructors.keys().collect::<Vec<_>>())
            .field("cache_enabled", &self.cache.is_some())
            .field("cached", &self.cached_len())
            .finish()
    }
}
