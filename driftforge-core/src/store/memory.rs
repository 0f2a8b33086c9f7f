//! In-process secret store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Secret, SecretStore, StoreError};
use crate::model::SecretKeySelector;

/// Credential secrets held in process memory.
///
/// Used by tests and by deployments that seed credentials at startup.
/// Nothing is persisted.
#[derive(Default)]
pub struct MemoryStore {
    secrets: RwLock<BTreeMap<String, Secret>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential payload under the key a provider configuration
    /// would reference it by.
    pub fn seed(&self, selector: &SecretKeySelector, payload: impl Into<String>) {
        self.secrets
            .write()
            .insert(selector.to_key(), Secret::new(payload));
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("secrets", &self.len())
            .finish()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.secrets.read().get(key).cloned())
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        self.secrets.write().insert(key.to_string(), secret.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.secrets.write().remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .secrets
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_uses_selector_key() {
        let store = MemoryStore::new();
        let selector = SecretKeySelector::new("crossplane-system", "otc-creds", "credentials");
        store.seed(&selector, r#"{"accessKey":"AK","secretKey":"SK"}"#);

        let payload = store
            .get("crossplane-system/otc-creds/credentials")
            .await
            .unwrap()
            .unwrap();
        assert!(payload.expose().contains("AK"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_secret_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope/nope/nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set("a/b/c", &Secret::new("v")).await.unwrap();
        store.delete("a/b/c").await.unwrap();
        store.delete("a/b/c").await.unwrap();
        assert!(!store.exists("a/b/c").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_keys_by_namespace() {
        let store = MemoryStore::new();
        store.set("team-a/otc/credentials", &Secret::new("1")).await.unwrap();
        store.set("team-a/otc-backup/credentials", &Secret::new("2")).await.unwrap();
        store.set("team-b/otc/credentials", &Secret::new("3")).await.unwrap();

        assert_eq!(
            store.list_keys("team-a/").await.unwrap(),
            vec!["team-a/otc-backup/credentials", "team-a/otc/credentials"]
        );
        assert_eq!(store.list_keys("").await.unwrap().len(), 3);
    }
}
