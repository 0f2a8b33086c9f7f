//! From a configuration reference to an authenticated, region-scoped session.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, ConfigSource, resolve_config};
use crate::credentials::{CredentialError, CredentialResolver};
use crate::model::ProviderConfigRef;
use crate::session::{Authenticator, SessionCache, SessionError};

/// Error type for [`Connector::connect`].
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// An authenticated session for one configuration.
#[derive(Debug, Clone)]
pub struct Connection<H> {
    /// Cache identity of the configuration, e.g. `ClusterProviderConfig/shared`.
    pub identity: String,
    pub region: String,
    pub handle: H,
}

/// Runs configuration lookup, credential resolution and the session cache.
pub struct Connector<A: Authenticator> {
    config: Arc<dyn ConfigSource>,
    credentials: CredentialResolver,
    sessions: Arc<SessionCache<A>>,
}

impl<A: Authenticator> Connector<A> {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        credentials: CredentialResolver,
        sessions: Arc<SessionCache<A>>,
    ) -> Self {
        Self {
            config,
            credentials,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionCache<A>> {
        &self.sessions
    }

    /// Connect on behalf of a resource living in `namespace`.
    pub async fn connect(
        &self,
        reference: &ProviderConfigRef,
        namespace: Option<&str>,
    ) -> Result<Connection<A::Handle>, ConnectError> {
        let resolved = resolve_config(self.config.as_ref(), reference, namespace).await?;
        let credentials = self.credentials.resolve(&resolved.spec).await?;
        let handle = self
            .sessions
            .get_session(&resolved.identity, &resolved.spec, &credentials)
            .await?;

        Ok(Connection {
            identity: resolved.identity,
            region: resolved.spec.region,
            handle,
        })
    }
}

impl<A: Authenticator> std::fmt::Debug for Connector<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigRegistry;
    use crate::model::{ProviderConfigSpec, ProviderCredentials, SecretKeySelector};
    use crate::store::{MemoryStore, Secret, SecretStore};
    use crate::testing::CountingAuthenticator;

    async fn connector() -> Connector<CountingAuthenticator> {
        let selector = SecretKeySelector::new("crossplane-system", "otc-creds", "credentials");
        let store = MemoryStore::new();
        store
            .set(
                &selector.to_key(),
                &Secret::new(r#"{"accessKey":"AK","secretKey":"SK"}"#),
            )
            .await
            .unwrap();

        let registry = ConfigRegistry::new();
        registry.insert_cluster_provider_config(
            "shared",
            ProviderConfigSpec {
                domain_name: "OTC-EU-DE-0001".to_string(),
                project_id: "project".to_string(),
                region: "eu-nl".to_string(),
                identity_endpoint: None,
                credentials: ProviderCredentials::from_secret(selector),
            },
        );

        Connector::new(
            Arc::new(registry),
            CredentialResolver::new(Arc::new(store)),
            Arc::new(SessionCache::new(CountingAuthenticator::new())),
        )
    }

    #[tokio::test]
    async fn test_connect_shares_session_per_configuration() {
        let connector = connector().await;
        let reference = ProviderConfigRef::cluster("shared");

        let a = connector.connect(&reference, Some("team-a")).await.unwrap();
        let b = connector.connect(&reference, Some("team-b")).await.unwrap();

        assert_eq!(a.identity, "ClusterProviderConfig/shared");
        assert_eq!(a.region, "eu-nl");
        assert_eq!(a.handle, b.handle);
        assert_eq!(connector.sessions().authenticator().calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_missing_configuration() {
        let connector = connector().await;
        let result = connector
            .connect(&ProviderConfigRef::scoped("default"), Some("team-a"))
            .await;
        assert!(matches!(
            result,
            Err(ConnectError::Config(ConfigError::ProviderConfigNotFound { .. }))
        ));
    }
}
