//! Authenticated session cache.
//!
//! Authenticating against the identity provider is expensive and rate
//! limited, while many resource instances share one provider configuration.
//! [`SessionCache`] keeps one authenticated handle per configuration identity
//! and rebuilds it when:
//!
//! - the fingerprint of the authentication inputs changed (credential
//!   rotation, different domain/project/region), or
//! - the session is within the safety margin of its expiry.
//!
//! # Locking
//!
//! Cache hits take the shared read lock only. A miss takes the exclusive
//! lock, re-checks the entry and authenticates while holding it, so
//! concurrent misses for one identity cost a single authentication.
//! Failed authentications are returned to the caller and never cached.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

use crate::credentials::Credentials;
use crate::model::ProviderConfigSpec;
use crate::store::Secret;

/// Default identity endpoint used when a configuration does not override it.
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://iam.eu-de.otc.t-systems.com/v3";

/// Sessions are kept for 23 hours; provider tokens last 24.
const DEFAULT_SESSION_VALIDITY_HOURS: i64 = 23;

/// A cached session is rebuilt once it is this close to expiring.
const DEFAULT_SAFETY_MARGIN_MINUTES: i64 = 5;

/// Error returned by an [`Authenticator`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity provider rejected the credentials.
    #[error("identity provider rejected credentials: {message}")]
    Rejected { message: String },

    /// The identity provider could not be reached.
    #[error("identity provider unreachable: {message}")]
    Unreachable { message: String },
}

/// Error type for session acquisition.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configured identity endpoint is not a valid URL.
    #[error("invalid identity endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },

    /// Authentication failed.
    #[error("cannot authenticate with the identity provider: {0}")]
    Auth(#[from] AuthError),
}

/// Inputs to one authentication round-trip.
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub identity_endpoint: Url,
    pub domain_name: String,
    pub project_id: String,
    pub region: String,
    pub access_key: Secret,
    pub secret_key: Secret,
}

impl AuthOptions {
    /// Build authentication options, applying the default identity endpoint
    /// when the configuration leaves it unset or empty.
    pub fn from_config(
        spec: &ProviderConfigSpec,
        credentials: &Credentials,
    ) -> Result<Self, SessionError> {
        let endpoint = spec
            .identity_endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_IDENTITY_ENDPOINT);

        let identity_endpoint =
            Url::parse(endpoint).map_err(|source| SessionError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            identity_endpoint,
            domain_name: spec.domain_name.clone(),
            project_id: spec.project_id.clone(),
            region: spec.region.clone(),
            access_key: credentials.access_key.clone(),
            secret_key: credentials.secret_key.clone(),
        })
    }
}

/// The identity provider boundary.
///
/// `Handle` is whatever the provider SDK needs to make authenticated calls;
/// it is cloned out of the cache for every caller, so it should be cheap to
/// clone (an `Arc` or a small token struct).
#[async_trait]
pub trait Authenticator: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    /// Perform one authentication round-trip.
    async fn authenticate(&self, opts: &AuthOptions) -> Result<Self::Handle, AuthError>;
}

/// How long sessions live and how early they are rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub validity: Duration,
    pub safety_margin: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            validity: Duration::hours(DEFAULT_SESSION_VALIDITY_HOURS),
            safety_margin: Duration::minutes(DEFAULT_SAFETY_MARGIN_MINUTES),
        }
    }
}

/// Hash over the fields that determine the authenticated identity.
///
/// Returned as lowercase hex SHA-256 over domain, project, region, access key
/// and secret key, each prefixed with its byte length.
pub fn fingerprint(spec: &ProviderConfigSpec, credentials: &Credentials) -> String {
    let mut hasher = Sha256::new();
    for part in [
        spec.domain_name.as_str(),
        spec.project_id.as_str(),
        spec.region.as_str(),
        credentials.access_key.expose(),
        credentials.secret_key.expose(),
    ] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

struct Session<H> {
    handle: H,
    expires_at: DateTime<Utc>,
    fingerprint: String,
}

impl<H> Session<H> {
    fn is_usable(&self, fingerprint: &str, safety_margin: Duration) -> bool {
        // A margin that overflows the calendar leaves no session usable.
        self.fingerprint == fingerprint
            && Utc::now()
                .checked_add_signed(safety_margin)
                .is_some_and(|deadline| deadline < self.expires_at)
    }
}

/// Cache of authenticated sessions keyed by configuration identity.
///
/// Constructed once per process (or per controller set) and shared by
/// reference; it has no background tasks and drops all sessions with itself.
pub struct SessionCache<A: Authenticator> {
    authenticator: A,
    policy: SessionPolicy,
    sessions: RwLock<HashMap<String, Session<A::Handle>>>,
}

impl<A: Authenticator> SessionCache<A> {
    /// Create a cache with the default 23h validity and 5 minute margin.
    pub fn new(authenticator: A) -> Self {
        Self::with_policy(authenticator, SessionPolicy::default())
    }

    /// Create a cache with a custom session policy.
    pub fn with_policy(authenticator: A, policy: SessionPolicy) -> Self {
        Self {
            authenticator,
            policy,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Return a usable handle for `identity`, authenticating if needed.
    pub async fn get_session(
        &self,
        identity: &str,
        spec: &ProviderConfigSpec,
        credentials: &Credentials,
    ) -> Result<A::Handle, SessionError> {
        let fingerprint = fingerprint(spec, credentials);

        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(identity) {
                if session.is_usable(&fingerprint, self.policy.safety_margin) {
                    tracing::debug!("Using cached session for {}", identity);
                    return Ok(session.handle.clone());
                }
            }
        }

        let mut sessions = self.sessions.write().await;

        // Another caller may have refreshed the entry while we waited.
        if let Some(session) = sessions.get(identity) {
            if session.is_usable(&fingerprint, self.policy.safety_margin) {
                tracing::debug!("Session for {} refreshed concurrently", identity);
                return Ok(session.handle.clone());
            }
            tracing::info!(
                "Cached session for {} is stale or its inputs changed, re-authenticating",
                identity
            );
        }

        let opts = AuthOptions::from_config(spec, credentials)?;
        tracing::info!(
            "Authenticating {} against {} (project {}, region {})",
            identity,
            opts.identity_endpoint,
            opts.project_id,
            opts.region
        );

        let handle = self.authenticator.authenticate(&opts).await.map_err(|e| {
            tracing::error!("Authentication failed for {}: {}", identity, e);
            e
        })?;

        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        if sessions.len() < before {
            tracing::debug!("Evicted {} expired sessions", before - sessions.len());
        }

        let expires_at = now
            .checked_add_signed(self.policy.validity)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        sessions.insert(
            identity.to_string(),
            Session {
                handle: handle.clone(),
                expires_at,
                fingerprint,
            },
        );

        tracing::debug!("Cached session for {} until {}", identity, expires_at);
        Ok(handle)
    }

    /// Drop the cached session for `identity`, if any.
    ///
    /// Returns `true` if an entry was removed.
    pub async fn invalidate(&self, identity: &str) -> bool {
        let removed = self.sessions.write().await.remove(identity).is_some();
        if removed {
            tracing::info!("Invalidated cached session for {}", identity);
        }
        removed
    }

    /// Number of cached sessions. Expired entries linger until the next miss.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl<A: Authenticator> std::fmt::Debug for SessionCache<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProviderCredentials, SecretKeySelector};
    use crate::testing::CountingAuthenticator;

    fn spec() -> ProviderConfigSpec {
        ProviderConfigSpec {
            domain_name: "OTC-EU-DE-0001".to_string(),
            project_id: "project-a".to_string(),
            region: "eu-de".to_string(),
            identity_endpoint: None,
            credentials: ProviderCredentials::from_secret(SecretKeySelector::new(
                "ns", "creds", "credentials",
            )),
        }
    }

    fn creds(ak: &str, sk: &str) -> Credentials {
        Credentials::new(ak, sk).unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let base = fingerprint(&spec(), &creds("AK", "SK"));
        assert_eq!(base, fingerprint(&spec(), &creds("AK", "SK")));
        assert_eq!(base.len(), 64);

        assert_ne!(base, fingerprint(&spec(), &creds("AK", "SK2")));
        assert_ne!(base, fingerprint(&spec(), &creds("AK2", "SK")));

        let mut other_region = spec();
        other_region.region = "eu-nl".to_string();
        assert_ne!(base, fingerprint(&other_region, &creds("AK", "SK")));

        let mut other_domain = spec();
        other_domain.domain_name = "OTC-EU-DE-0002".to_string();
        assert_ne!(base, fingerprint(&other_domain, &creds("AK", "SK")));
    }

    #[test]
    fn test_fingerprint_separates_field_boundaries() {
        assert_ne!(
            fingerprint(&spec(), &creds("AK|X", "Y")),
            fingerprint(&spec(), &creds("AK", "X|Y"))
        );
    }

    #[test]
    fn test_fingerprint_ignores_identity_endpoint() {
        let mut with_endpoint = spec();
        with_endpoint.identity_endpoint = Some("https://iam.example.com/v3".to_string());
        assert_eq!(
            fingerprint(&spec(), &creds("AK", "SK")),
            fingerprint(&with_endpoint, &creds("AK", "SK"))
        );
    }

    #[test]
    fn test_auth_options_default_endpoint() {
        let opts = AuthOptions::from_config(&spec(), &creds("AK", "SK")).unwrap();
        assert_eq!(opts.identity_endpoint.as_str(), DEFAULT_IDENTITY_ENDPOINT);

        let mut empty = spec();
        empty.identity_endpoint = Some(String::new());
        let opts = AuthOptions::from_config(&empty, &creds("AK", "SK")).unwrap();
        assert_eq!(opts.identity_endpoint.as_str(), DEFAULT_IDENTITY_ENDPOINT);
    }

    #[test]
    fn test_auth_options_rejects_bad_endpoint() {
        let mut bad = spec();
        bad.identity_endpoint = Some("not a url".to_string());
        let result = AuthOptions::from_config(&bad, &creds("AK", "SK"));
        assert!(matches!(result, Err(SessionError::InvalidEndpoint { .. })));
    }

    #[tokio::test]
    async fn test_cache_hit_reuses_handle() {
        let cache = SessionCache::new(CountingAuthenticator::new());

        let first = cache
            .get_session("ProviderConfig/ns/default", &spec(), &creds("AK", "SK"))
            .await
            .unwrap();
        let second = cache
            .get_session("ProviderConfig/ns/default", &spec(), &creds("AK", "SK"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.authenticator().calls(), 1);
    }

    #[tokio::test]
    async fn test_rotation_forces_reauthentication() {
        let cache = SessionCache::new(CountingAuthenticator::new());
        let id = "ClusterProviderConfig/shared";

        let first = cache.get_session(id, &spec(), &creds("AK", "SK")).await.unwrap();
        let rotated = cache.get_session(id, &spec(), &creds("AK", "SK-new")).await.unwrap();

        assert_ne!(first, rotated);
        assert_eq!(cache.authenticator().calls(), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_session_inside_safety_margin_is_rebuilt() {
        let policy = SessionPolicy {
            validity: Duration::minutes(1),
            safety_margin: Duration::minutes(5),
        };
        let cache = SessionCache::with_policy(CountingAuthenticator::new(), policy);

        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();
        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();

        assert_eq!(cache.authenticator().calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_authentication_is_not_cached() {
        let cache = SessionCache::new(CountingAuthenticator::new());
        cache.authenticator().reject_next("invalid AK/SK");

        let result = cache.get_session("id", &spec(), &creds("AK", "SK")).await;
        assert!(matches!(
            result,
            Err(SessionError::Auth(AuthError::Rejected { .. }))
        ));
        assert!(cache.is_empty().await);

        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();
        assert_eq!(cache.authenticator().calls(), 2);
    }

    #[tokio::test]
    async fn test_unbounded_validity_does_not_overflow() {
        let policy = SessionPolicy {
            validity: Duration::MAX,
            safety_margin: Duration::minutes(5),
        };
        let cache = SessionCache::with_policy(CountingAuthenticator::new(), policy);

        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();
        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();

        assert_eq!(cache.authenticator().calls(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_safety_margin_always_reauthenticates() {
        let policy = SessionPolicy {
            validity: Duration::hours(23),
            safety_margin: Duration::MAX,
        };
        let cache = SessionCache::with_policy(CountingAuthenticator::new(), policy);

        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();
        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();

        assert_eq!(cache.authenticator().calls(), 2);
    }

    #[tokio::test]
    async fn test_miss_evicts_expired_sessions() {
        let policy = SessionPolicy {
            validity: Duration::zero(),
            safety_margin: Duration::zero(),
        };
        let cache = SessionCache::with_policy(CountingAuthenticator::new(), policy);

        cache.get_session("ProviderConfig/team-a/default", &spec(), &creds("AK", "SK")).await.unwrap();
        cache.get_session("ProviderConfig/team-b/default", &spec(), &creds("AK", "SK")).await.unwrap();

        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_drops_entry() {
        let cache = SessionCache::new(CountingAuthenticator::new());
        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();

        assert!(cache.invalidate("id").await);
        assert!(!cache.invalidate("id").await);

        cache.get_session("id", &spec(), &creds("AK", "SK")).await.unwrap();
        assert_eq!(cache.authenticator().calls(), 2);
    }
}
