//! Selects the credential mechanism for a scan.
//!
//! Precedence, highest first:
//! 1. `Disabled` → [`CredentialProvider::NoProvider`], whatever else is given
//! 2. non-empty storage options → [`CredentialProvider::ExplicitConfig`]
//!    (overrides both `Auto` and a function)
//! 3. `Function` → [`CredentialProvider::UserCallable`]
//! 4. `Auto` → [`CredentialProvider::AutoDetect`]; the scheme-specific
//!    provider is only recorded here and constructed when the scan executes

use tracing::{debug, warn};

use crate::domain::models::{
    CredentialProvider, CredentialProviderArg, Scheme, StorageOptions,
};

/// Pure selection of a [`CredentialProvider`]. Never fails, never does I/O.
pub struct CredentialResolver;

impl CredentialResolver {
    pub fn resolve(
        scheme: &Scheme,
        credential_provider: &CredentialProviderArg,
        storage_options: Option<&StorageOptions>,
    ) -> CredentialProvider {
        let explicit = storage_options.filter(|options| !options.is_empty());

        let provider = match (credential_provider, explicit) {
            (CredentialProviderArg::Disabled, _) => CredentialProvider::NoProvider,
            (CredentialProviderArg::Function(_), Some(options)) => {
                warn!(
                    scheme = %scheme,
                    "storage_options take precedence over the credential provider function; \
                     the function will not be called"
                );
                CredentialProvider::ExplicitConfig {
                    options: options.clone(),
                }
            }
            (CredentialProviderArg::Auto, Some(options)) => CredentialProvider::ExplicitConfig {
                options: options.clone(),
            },
            (CredentialProviderArg::Function(func), None) => {
                CredentialProvider::UserCallable(func.clone())
            }
            (CredentialProviderArg::Auto, None) => CredentialProvider::AutoDetect {
                scheme: scheme.clone(),
            },
        };

        debug!(scheme = %scheme, provider = provider.name(), "credential provider selected");
        provider
    }
}
