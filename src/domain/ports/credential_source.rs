//! Credential source port - scheme-specific providers behind auto-detection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::BoxError;
use crate::domain::models::CredentialSet;

/// A constructed, scheme-specific credential provider.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch credentials for the next storage access.
    async fn credentials(&self) -> Result<CredentialSet, BoxError>;
}

/// Constructor for a [`CredentialSource`].
///
/// Construction may probe the environment or the network, so it only runs
/// when a scan executes.
pub type CredentialSourceConstructor =
    Arc<dyn Fn() -> Result<Arc<dyn CredentialSource>, BoxError> + Send + Sync>;
