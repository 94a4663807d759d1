//! Invocation boundary for credential providers.
//!
//! Everything here runs during execution only. Caller-supplied code (user
//! functions and auto-provider constructors) is run on the blocking pool so
//! that an error, a panic or a non-conforming return value is caught here and
//! turned into a [`CredentialError`] carrying the original message.

use std::any::Any;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use super::auto_provider_registry::AutoProviderRegistry;
use crate::domain::errors::{BoxError, ExecutionFailure};
use crate::domain::models::{CredentialProvider, CredentialProviderFunction, CredentialSet};

/// Failure while producing credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A caller-supplied credential function failed.
    #[error("{0}")]
    Callable(String),

    /// An auto-detected provider could not be constructed. The constructor's
    /// own error is kept as is.
    #[error("{0}")]
    Construction(BoxError),

    /// A constructed provider failed to produce credentials.
    #[error("{0}")]
    Provider(String),
}

impl From<CredentialError> for ExecutionFailure {
    fn from(err: CredentialError) -> Self {
        Self::CredentialResolution(err.to_string())
    }
}

/// Produce credentials for `provider` now.
///
/// `AutoDetect` constructs its scheme-specific provider through `registry`
/// at this point and not before.
pub async fn resolve_now(
    provider: &CredentialProvider,
    registry: &AutoProviderRegistry,
) -> Result<CredentialSet, CredentialError> {
    match provider {
        CredentialProvider::NoProvider => Ok(CredentialSet::empty()),
        CredentialProvider::ExplicitConfig { options } => {
            Ok(CredentialSet::from_options(options.clone()))
        }
        CredentialProvider::AutoDetect { scheme } => {
            let Some(source) = registry.provider_for(scheme).await? else {
                debug!(scheme = %scheme, "no auto provider for scheme, using ambient access");
                return Ok(CredentialSet::empty());
            };
            source
                .credentials()
                .await
                .map_err(|err| CredentialError::Provider(err.to_string()))
        }
        CredentialProvider::UserCallable(func) => invoke_user_function(func).await,
    }
}

async fn invoke_user_function(
    func: &CredentialProviderFunction,
) -> Result<CredentialSet, CredentialError> {
    let func = func.shared();
    let credentials = call_on_blocking_pool(move || func())
        .await
        .map_err(|err| {
            warn!(error = %err, "credential provider function failed");
            CredentialError::Callable(err.to_string())
        })?;

    credentials
        .validate(Utc::now())
        .map_err(CredentialError::Callable)?;
    Ok(credentials)
}

/// Run caller-supplied code on the blocking pool, catching its panics.
///
/// A panic becomes an error whose message is the panic payload.
pub(crate) async fn call_on_blocking_pool<T, F>(func: F) -> Result<T, BoxError>
where
    F: FnOnce() -> Result<T, BoxError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(func).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => Err(panic_message(join_err.into_panic()).into()),
        Err(join_err) => Err(join_err.to_string().into()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "credential provider panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CredentialProviderArg, Scheme, StorageOptions};
    use chrono::Duration;

    fn user_callable(arg: CredentialProviderArg) -> CredentialProvider {
        match arg {
            CredentialProviderArg::Function(func) => CredentialProvider::UserCallable(func),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_no_provider_yields_empty_set() {
        let registry = AutoProviderRegistry::new(false);
        let set = resolve_now(&CredentialProvider::NoProvider, &registry)
            .await
            .unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_config_passes_options_through() {
        let registry = AutoProviderRegistry::new(false);
        let options: StorageOptions = [("aws_region", "eu-west-1")].into_iter().collect();
        let set = resolve_now(
            &CredentialProvider::ExplicitConfig { options },
            &registry,
        )
        .await
        .unwrap();
        assert_eq!(set.options().get("aws_region"), Some("eu-west-1"));
    }

    #[tokio::test]
    async fn test_user_function_error_message_is_preserved() {
        let registry = AutoProviderRegistry::new(false);
        let provider = user_callable(CredentialProviderArg::function(|| {
            Err("err_magic_7".into())
        }));

        let err = resolve_now(&provider, &registry).await.unwrap_err();
        assert!(matches!(err, CredentialError::Callable(_)));
        assert_eq!(err.to_string(), "err_magic_7");
    }

    #[tokio::test]
    async fn test_user_function_panic_is_caught() {
        let registry = AutoProviderRegistry::new(false);
        let provider = user_callable(CredentialProviderArg::function(|| {
            panic!("panic_magic_11")
        }));

        let err = resolve_now(&provider, &registry).await.unwrap_err();
        assert!(err.to_string().contains("panic_magic_11"));
    }

    #[tokio::test]
    async fn test_user_function_expired_return_is_rejected() {
        let registry = AutoProviderRegistry::new(false);
        let provider = user_callable(CredentialProviderArg::function(|| {
            Ok(CredentialSet::empty().with_expiry(Utc::now() - Duration::hours(1)))
        }));

        let err = resolve_now(&provider, &registry).await.unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[tokio::test]
    async fn test_auto_detect_without_constructor_is_ambient() {
        let registry = AutoProviderRegistry::new(false);
        let set = resolve_now(
            &CredentialProvider::AutoDetect { scheme: Scheme::S3 },
            &registry,
        )
        .await
        .unwrap();
        assert!(set.is_empty());
    }
}
