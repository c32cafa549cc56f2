// Credentials - bot-owner supplied API secrets (GitHub token, Sentry DSN).
//
// Stored values take precedence over the environment fallback read at startup.

use async_trait::async_trait;
use thiserror::Error;

pub const GITHUB_SERVICE: &str = "github";
pub const GITHUB_TOKEN_KEY: &str = "token";
pub const SENTRY_SERVICE: &str = "sentry";
pub const SENTRY_DSN_KEY: &str = "dsn";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, service: &str, key: &str) -> Result<Option<String>, CredentialError>;
    async fn set(&self, service: &str, key: &str, value: &str) -> Result<(), CredentialError>;
}

pub struct CredentialService<S: CredentialStore> {
    store: S,
}

impl<S: CredentialStore> CredentialService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stored value, else `fallback`. Empty strings count as unset.
    pub async fn resolve(
        &self,
        service: &str,
        key: &str,
        fallback: Option<&str>,
    ) -> Result<Option<String>, CredentialError> {
        let stored = self
            .store
            .get(service, key)
            .await?
            .filter(|value| !value.is_empty());

        Ok(stored.or_else(|| {
            fallback
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        }))
    }

    pub async fn store(
        &self,
        service: &str,
        key: &str,
        value: &str,
    ) -> Result<(), CredentialError> {
        self.store.set(service, key, value.trim()).await?;
        tracing::info!(service, key, "Stored API credential");
        Ok(())
    }
}
