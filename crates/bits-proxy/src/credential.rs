//! Credential capability for the upstream access token
//!
//! The fetcher never knows where its token comes from. It asks a
//! [`CredentialProvider`] for a named secret on every fetch.

use async_trait::async_trait;
use std::fmt;
use tracing::debug;

use crate::error::ProxyError;

/// Narrow capability for looking up a secret by name
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolve the secret registered under `name`
    async fn get_credential(&self, name: &str) -> Result<String, ProxyError>;
}

/// A credential supplied directly through configuration.
///
/// The value is returned regardless of the requested name.
#[derive(Clone)]
pub struct StaticCredential {
    value: String,
}

impl StaticCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredential")
            .field("value", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn get_credential(&self, _name: &str) -> Result<String, ProxyError> {
        if self.value.trim().is_empty() {
            return Err(ProxyError::Credential(
                "configured token is empty".to_string(),
            ));
        }
        Ok(self.value.clone())
    }
}

/// Secret store backed by the process environment.
///
/// Secrets are mounted into the environment by the hosting platform; the
/// name is used verbatim as the variable name.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialProvider for EnvSecretProvider {
    async fn get_credential(&self, name: &str) -> Result<String, ProxyError> {
        debug!("Resolving secret {} from environment", name);

        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            Ok(_) => Err(ProxyError::Credential(format!("secret {} is empty", name))),
            Err(_) => Err(ProxyError::Credential(format!("secret {} is not set", name))),
        }
    }
}
