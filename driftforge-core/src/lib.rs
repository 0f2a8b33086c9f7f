//! # Driftforge Core
//!
//! Reconciliation engine for declared cloud network resources.
//!
//! This crate provides:
//! - A session cache that shares authenticated provider sessions across
//!   resource instances and rebuilds them on expiry or credential rotation
//! - Credential resolution from a secret store (in-memory or, optionally, the OS keyring)
//! - A generic Observe/Create/Update/Delete lifecycle with drift detection,
//!   late-initialization and immutability checks, instantiated per resource kind
//! - Resource kinds for VPCs, subnets, security groups and rules, NAT gateways,
//!   SNAT rules and elastic IPs
//!
//! Outbound calls to the identity provider and the resource APIs go through the
//! [`Authenticator`] and [`ProviderApi`] traits. In-memory doubles live in the
//! `testing` module, built for unit tests and with the `testing` feature.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use driftforge_core::{
//!     ConfigRegistry, Connector, CredentialResolver, MemoryResourceStore, MemoryStore,
//!     Reconciler, SessionCache, kinds::Vpc,
//! };
//!
//! async fn run(authenticator: impl driftforge_core::Authenticator, vpcs: MyVpcClientFactory) {
//!     let registry = ConfigRegistry::load()?;
//!     let sessions = Arc::new(SessionCache::with_policy(
//!         authenticator,
//!         registry.settings().session_policy(),
//!     ));
//!     let connector = Arc::new(Connector::new(
//!         Arc::new(registry),
//!         CredentialResolver::new(Arc::new(MemoryStore::new())),
//!         sessions,
//!     ));
//!     let reconciler = Reconciler::<Vpc, _, _>::new(connector, vpcs, Arc::new(MemoryResourceStore::new()));
//!     let outcome = reconciler.reconcile(&mut my_vpc).await?;
//! }
//! ```

pub mod config;
pub mod connector;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod kinds;
pub mod lifecycle;
pub mod model;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types at crate root
pub use model::{
    Condition,
    CredentialsSource,
    ObjectMeta,
    ProviderConfigRef,
    ProviderConfigSpec,
    ProviderCredentials,
    ResourceStatus,
    SecretKeySelector,
    SyncStatus,
};

pub use store::{
    Secret,
    SecretStore,
    StoreError,
    MemoryStore,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use credentials::{
    Credentials,
    CredentialResolver,
    CredentialError,
};

pub use config::{
    ConfigError,
    ConfigRegistry,
    ConfigSource,
    ControllerSettings,
};

pub use session::{
    Authenticator,
    AuthError,
    AuthOptions,
    SessionCache,
    SessionError,
    SessionPolicy,
};

pub use connector::{
    Connection,
    Connector,
    ConnectError,
};

pub use lifecycle::{
    ClientFactory,
    External,
    ExternalObservation,
    LifecycleError,
    Managed,
    ProviderApi,
    ProviderError,
    ResourceKind,
};

pub use engine::{
    MemoryResourceStore,
    ReconcileAction,
    ReconcileError,
    ReconcileOutcome,
    Reconciler,
    ResourceStore,
};

pub use error::DriftforgeError;
