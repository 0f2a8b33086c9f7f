//! OS keyring-backed secret storage implementation.

use async_trait::async_trait;
use keyring::Entry;

use super::{Secret, SecretStore, StoreError};

/// OS keyring-backed secret store.
///
/// This store uses the platform's native keyring service:
/// - macOS: Keychain
/// - Linux: Secret Service API (via libsecret)
/// - Windows: Credential Manager
///
/// # Storage Key Format
///
/// Keys are stored using the format: `{service_name}/{namespace}/{name}/{key}`
/// where the service_name is set during construction.
///
/// # Example
///
/// ```rust,ignore
/// use driftforge_core::store::{KeyringStore, SecretStore, Secret};
///
/// let store = KeyringStore::try_new("driftforge").unwrap();
/// let payload = Secret::new(r#"{"accessKey":"AK","secretKey":"SK"}"#);
/// store.set("crossplane-system/otc-creds/credentials", &payload).await.unwrap();
/// ```
pub struct KeyringStore {
    service_name: String,
}

impl KeyringStore {
    /// Try to create a new keyring store.
    ///
    /// Returns an error if the keyring backend is not available on this platform.
    pub fn try_new(service_name: &str) -> Result<Self, StoreError> {
        // Validate that keyring is available by attempting to create a test entry
        let test_key = format!("{}/__test__", service_name);
        match Entry::new(&test_key, "availability_check") {
            Ok(_) => Ok(Self {
                service_name: service_name.to_string(),
            }),
            Err(e) => Err(StoreError::KeyringUnavailable {
                message: format!("keyring backend not available: {}", e),
            }),
        }
    }

    /// Create a keyring entry for the given key.
    fn create_entry(&self, key: &str) -> Result<Entry, StoreError> {
        let service = format!("{}/{}", self.service_name, key);
        Entry::new(&service, "driftforge").map_err(|e| StoreError::Backend {
            key: key.to_string(),
            message: format!("cannot open keyring entry: {}", e),
        })
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

fn backend_error(key: &str, action: &str, err: keyring::Error) -> StoreError {
    StoreError::Backend {
        key: key.to_string(),
        message: format!("keyring {} failed: {}", action, err),
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        match self.create_entry(key)?.get_password() {
            Ok(payload) => Ok(Some(Secret::new(payload))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::NoStorageAccess(_)) => Err(StoreError::AccessDenied {
                key: key.to_string(),
            }),
            Err(e) => Err(backend_error(key, "read", e)),
        }
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        self.create_entry(key)?
            .set_password(secret.expose())
            .map_err(|e| backend_error(key, "write", e))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.create_entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(backend_error(key, "delete", e)),
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // Platform keyrings have no enumeration API.
        Err(StoreError::Backend {
            key: prefix.to_string(),
            message: "the keyring cannot enumerate entries".to_string(),
        })
    }
}
