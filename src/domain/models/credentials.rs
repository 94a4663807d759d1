//! Credential model.
//!
//! [`CredentialProviderArg`] is what a caller hands to a scan function;
//! [`CredentialProvider`] is the single mechanism selected from it when the
//! scan is planned. Neither type performs any I/O.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path::Scheme;
use crate::domain::errors::BoxError;

/// Substrings marking an option key whose value is secret.
const SECRET_KEY_PATTERNS: &[&str] = &[
    "secret",
    "password",
    "token",
    "account_key",
    "private_key",
    "service_account_key",
];

/// Whether an option key holds a secret value.
pub fn is_secret_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SECRET_KEY_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Key/value storage configuration, e.g. `aws_region` or `aws_access_key_id`.
///
/// `Debug` masks the values of secret keys.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageOptions(BTreeMap<String, String>);

impl StorageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merged_with(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StorageOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Debug for StorageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| {
                let shown = if is_secret_key(k) { "***" } else { v.as_str() };
                (k, shown)
            }))
            .finish()
    }
}

/// Temporary credentials produced by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    options: StorageOptions,
    expiry: Option<DateTime<Utc>>,
}

impl CredentialSet {
    /// No credentials; the store falls back to ambient or anonymous access.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_options(options: StorageOptions) -> Self {
        Self {
            options,
            expiry: None,
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }

    /// Check that the set is usable: no blank keys and not already expired.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.options.keys().any(|k| k.trim().is_empty()) {
            return Err("credential set contains an empty key".to_string());
        }
        if let Some(expiry) = self.expiry.filter(|_| self.is_expired_at(now)) {
            return Err(format!("credential set expired at {}", expiry.to_rfc3339()));
        }
        Ok(())
    }
}

type CredentialFnInner = dyn Fn() -> Result<CredentialSet, BoxError> + Send + Sync;

/// Caller-supplied zero-argument function producing credentials.
///
/// Shared behind an `Arc` so plans holding it stay cheap to clone. The
/// function is only ever called during execution.
#[derive(Clone)]
pub struct CredentialProviderFunction(Arc<CredentialFnInner>);

impl CredentialProviderFunction {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> Result<CredentialSet, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    pub(crate) fn shared(&self) -> Arc<CredentialFnInner> {
        Arc::clone(&self.0)
    }
}

impl fmt::Debug for CredentialProviderFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialProviderFunction(<fn>)")
    }
}

/// Cloud provider family whose auto-detected credentials serve a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    Aws,
    Gcp,
    Azure,
}

impl ProviderFamily {
    /// `None` for local paths and unrecognized schemes.
    pub fn for_scheme(scheme: &Scheme) -> Option<Self> {
        match scheme {
            Scheme::S3 => Some(Self::Aws),
            Scheme::Gcs => Some(Self::Gcp),
            Scheme::Azure => Some(Self::Azure),
            Scheme::Local | Scheme::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Azure => "azure",
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `credential_provider` argument of the scan functions.
#[derive(Debug, Clone, Default)]
pub enum CredentialProviderArg {
    /// Let the engine pick a provider for the path's scheme.
    #[default]
    Auto,
    /// Disable credential providers entirely.
    Disabled,
    /// Use a caller-supplied function.
    Function(CredentialProviderFunction),
}

impl CredentialProviderArg {
    pub fn function<F>(func: F) -> Self
    where
        F: Fn() -> Result<CredentialSet, BoxError> + Send + Sync + 'static,
    {
        Self::Function(CredentialProviderFunction::new(func))
    }
}

/// The credential mechanism attached to a scan plan.
#[derive(Debug, Clone)]
pub enum CredentialProvider {
    /// Resolution disabled; rely on ambient or anonymous access.
    NoProvider,
    /// Construct a scheme-specific provider when the scan executes.
    AutoDetect { scheme: Scheme },
    /// Static options supplied by the caller.
    ExplicitConfig { options: StorageOptions },
    /// Caller-supplied function invoked when the scan executes.
    UserCallable(CredentialProviderFunction),
}

impl CredentialProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoProvider => "none",
            Self::AutoDetect { .. } => "auto",
            Self::ExplicitConfig { .. } => "explicit",
            Self::UserCallable(_) => "callable",
        }
    }
}
