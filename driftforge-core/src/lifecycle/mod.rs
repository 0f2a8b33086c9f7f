//! The generic external-resource lifecycle.
//!
//! Every resource kind implements [`ResourceKind`]: a static kind tag plus the
//! pure functions that map between its desired parameters, the provider's
//! representation and the observation written to status. [`External`] then
//! implements Observe/Create/Update/Delete once, for all kinds, on top of a
//! [`ProviderApi`] client.
//!
//! This module defines:
//! - [`ResourceKind`] - Per-kind field mapping, drift and immutability rules
//! - [`ProviderApi`] / [`ClientFactory`] - The provider resource API boundary
//! - [`Managed`] - A declared resource instance with its spec and status
//! - [`External`] - The lifecycle implementation

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Condition, ExternalNameConflict, ObjectMeta, ProviderConfigRef, ResourceStatus};

pub mod drift;
mod external;
pub mod status;

pub use drift::{Drift, LateInit, ensure_unchanged};
pub use external::{External, ExternalObservation};
pub use status::StatusTable;

/// Lifecycle operation, used to tag errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Observe,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Observe => "observe",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Error returned by a [`ProviderApi`] call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The resource does not exist. Absorbed by observe and delete.
    #[error("resource not found")]
    NotFound,

    /// Any other provider failure.
    #[error("provider API error: {message}")]
    Api { message: String },
}

impl ProviderError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }
}

/// Error type for lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// An update would change a field the provider cannot change in place.
    #[error("cannot update immutable field {field} of {kind}")]
    ImmutableField {
        kind: &'static str,
        field: &'static str,
    },

    /// The kind cannot be updated at all; recreation is the only way to converge.
    #[error("{kind} is immutable")]
    Immutable { kind: &'static str },

    /// Update was requested for an instance that was never created.
    #[error("{kind} has no external name")]
    NoExternalName { kind: &'static str },

    #[error(transparent)]
    ExternalName(#[from] ExternalNameConflict),

    /// A provider call failed.
    #[error("cannot {operation} {kind}: {source}")]
    Provider {
        operation: Operation,
        kind: &'static str,
        source: ProviderError,
    },
}

/// Identifies an existing resource for update and delete calls.
///
/// Some provider APIs address a child resource through its parent
/// (a subnet through its VPC), so the id alone is not always enough.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub id: String,
    pub parent: Option<String>,
}

/// A resource kind: its field sets and the rules that compare them.
///
/// Implementors are zero-sized tags; all methods are associated functions so
/// the lifecycle is dispatched statically.
pub trait ResourceKind: Clone + fmt::Debug + PartialEq + Send + Sync + Sized + 'static {
    /// Kind name used in errors and logs.
    const KIND: &'static str;

    /// Raw provider status to condition mapping.
    const STATUS: StatusTable;

    /// Desired specification.
    type Parameters: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync;

    /// Observed state copied into status.
    type Observation: Clone
        + fmt::Debug
        + Default
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync;

    /// The provider's representation of the resource.
    type Remote: Clone + fmt::Debug + Send + Sync;

    type CreateOpts: Clone + fmt::Debug + Send + Sync;

    /// Kinds that cannot be updated use [`std::convert::Infallible`].
    type UpdateOpts: Clone + fmt::Debug + Send + Sync;

    fn remote_id(remote: &Self::Remote) -> &str;

    fn raw_status(remote: &Self::Remote) -> &str;

    fn observation(remote: &Self::Remote) -> Self::Observation;

    /// Fill unset optional parameters from the provider.
    fn late_initialize(desired: &mut Self::Parameters, remote: &Self::Remote) -> LateInit;

    /// Compare every supported field.
    fn drift(desired: &Self::Parameters, remote: &Self::Remote) -> Drift;

    /// Compare immutable fields against the last observation.
    fn check_immutable(
        desired: &Self::Parameters,
        observed: &Self::Observation,
    ) -> Result<(), LifecycleError>;

    fn create_opts(desired: &Self::Parameters) -> Self::CreateOpts;

    fn update_opts(desired: &Self::Parameters) -> Result<Self::UpdateOpts, LifecycleError>;

    /// Parent id the provider addresses this resource through, if any.
    fn parent(_desired: &Self::Parameters) -> Option<String> {
        None
    }
}

/// The provider resource API for one kind.
#[async_trait]
pub trait ProviderApi<K: ResourceKind>: Send + Sync {
    async fn get(&self, id: &str) -> Result<K::Remote, ProviderError>;

    async fn create(&self, opts: &K::CreateOpts) -> Result<K::Remote, ProviderError>;

    async fn update(&self, locator: &Locator, opts: &K::UpdateOpts) -> Result<(), ProviderError>;

    async fn delete(&self, locator: &Locator) -> Result<(), ProviderError>;
}

/// Builds a region-scoped [`ProviderApi`] client from an authenticated handle.
pub trait ClientFactory<K: ResourceKind, H>: Send + Sync {
    type Client: ProviderApi<K>;

    fn client(&self, handle: &H, region: &str) -> Result<Self::Client, ProviderError>;
}

/// A declared resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Managed<K: ResourceKind> {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub provider_config_ref: ProviderConfigRef,

    pub spec: K::Parameters,

    #[serde(default)]
    pub status: ResourceStatus<K::Observation>,
}

impl<K: ResourceKind> Managed<K> {
    pub fn new(metadata: ObjectMeta, provider_config_ref: ProviderConfigRef, spec: K::Parameters) -> Self {
        Self {
            metadata,
            provider_config_ref,
            spec,
            status: ResourceStatus::default(),
        }
    }

    pub fn external_name(&self) -> Option<&str> {
        self.metadata.external_name()
    }

    pub fn condition(&self) -> Option<Condition> {
        self.status.condition
    }

    pub(crate) fn locator(&self, id: &str) -> Locator {
        Locator {
            id: id.to_string(),
            parent: K::parent(&self.spec),
        }
    }
}
