//! Credential resolution from the secret store.
//!
//! A provider configuration names a secret holding a JSON payload of the form
//! `{"accessKey": "...", "secretKey": "..."}`. [`CredentialResolver`] fetches
//! and validates that payload; the resulting [`Credentials`] keep both keys
//! wrapped in [`Secret`] so they never end up in logs.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::model::{CredentialsSource, ProviderConfigSpec};
use crate::store::{Secret, SecretStore, StoreError};

/// Error type for credential resolution.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Only secret-backed credentials are supported.
    #[error("unsupported credentials source: {source_kind}")]
    UnsupportedSource { source_kind: CredentialsSource },

    /// The configuration declares a secret source but no reference.
    #[error("secretRef is required")]
    MissingSecretRef,

    /// The referenced secret does not exist.
    #[error("cannot get credentials from secret: {key} not found")]
    SecretNotFound { key: String },

    /// The secret payload is not a valid credential document.
    #[error("cannot unmarshal credentials JSON, expect keys: accessKey, secretKey: {message}")]
    Malformed { message: String },

    /// One of the keys is empty.
    #[error("accessKey and secretKey are required in credentials secret")]
    EmptyKey,

    /// The secret store failed.
    #[error("cannot get credentials from secret: {0}")]
    Store(#[from] StoreError),
}

/// An access-key/secret-key pair. Both fields are non-empty.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_key: Secret,
    pub secret_key: Secret,
}

impl Credentials {
    /// Build a pair, rejecting empty keys.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let creds = Self {
            access_key: Secret::new(access_key),
            secret_key: Secret::new(secret_key),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Decode the JSON secret payload.
    pub fn from_payload(payload: &Secret) -> Result<Self, CredentialError> {
        // Display of a serde_json error may quote the payload; keep only its position.
        let creds: Credentials =
            serde_json::from_str(payload.expose()).map_err(|e| CredentialError::Malformed {
                message: format!(
                    "{:?} error at line {} column {}",
                    e.classify(),
                    e.line(),
                    e.column()
                ),
            })?;
        creds.validate()?;
        Ok(creds)
    }

    fn validate(&self) -> Result<(), CredentialError> {
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key)
            .finish()
    }
}

/// Resolves the credential pair a provider configuration points at.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Resolve credentials for the given configuration.
    pub async fn resolve(&self, spec: &ProviderConfigSpec) -> Result<Credentials, CredentialError> {
        let source = spec.credentials.source;
        if source != CredentialsSource::Secret {
            return Err(CredentialError::UnsupportedSource {
                source_kind: source,
            });
        }

        let selector = spec
            .credentials
            .secret_ref
            .as_ref()
            .ok_or(CredentialError::MissingSecretRef)?;

        let key = selector.to_key();
        let payload = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| CredentialError::SecretNotFound { key: key.clone() })?;

        tracing::debug!("Resolved credential secret {}", key);
        Credentials::from_payload(&payload)
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver").finish_non_exhaustive()
    }
}
