//! Domain model types shared by every resource kind.
//!
//! This module defines:
//! - [`ObjectMeta`] - Identity of a declared resource instance and its external name
//! - [`ProviderConfigRef`] - Reference to the configuration a resource uses
//! - [`ProviderConfigSpec`] - Domain/project/region and credential source
//! - [`SecretKeySelector`] - Reference to a credential secret
//! - [`Condition`] / [`SyncStatus`] / [`ResourceStatus`] - Status written back after a cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind name of a namespaced provider configuration.
pub const PROVIDER_CONFIG_KIND: &str = "ProviderConfig";

/// Kind name of a cluster-wide provider configuration.
pub const CLUSTER_PROVIDER_CONFIG_KIND: &str = "ClusterProviderConfig";

/// Attempted to record a second, different external name on an instance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("external name already recorded as '{recorded}', refusing to replace it with '{attempted}'")]
pub struct ExternalNameConflict {
    pub recorded: String,
    pub attempted: String,
}

/// Identity of a declared resource instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Name of the declared object.
    pub name: String,

    /// Namespace of the declared object; `None` for cluster-scoped objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Provider-assigned identifier, recorded after a successful create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_name: Option<String>,

    /// Set by the declaring actor when the object is being removed.
    #[serde(default)]
    pub deletion_requested: bool,
}

impl ObjectMeta {
    /// Metadata for a namespaced object.
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Metadata for a cluster-scoped object.
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The recorded external name, treating an empty string as unset.
    pub fn external_name(&self) -> Option<&str> {
        self.external_name.as_deref().filter(|n| !n.is_empty())
    }

    /// Record the provider-assigned identifier.
    ///
    /// Recording the same identifier again is a no-op; recording a different
    /// one fails, since the external name is the sole key used to re-fetch
    /// the resource.
    pub fn record_external_name(&mut self, id: impl Into<String>) -> Result<(), ExternalNameConflict> {
        let id = id.into();
        match self.external_name() {
            Some(recorded) if recorded != id => Err(ExternalNameConflict {
                recorded: recorded.to_string(),
                attempted: id,
            }),
            _ => {
                self.external_name = Some(id);
                Ok(())
            }
        }
    }

    /// `namespace/name`, or just `name` for cluster-scoped objects.
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

/// Reference to the provider configuration a resource instance uses.
///
/// `kind` is kept as a string so an unrecognized kind survives
/// deserialization and is rejected at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderConfigRef {
    pub kind: String,
    pub name: String,
}

impl ProviderConfigRef {
    /// Reference a namespaced `ProviderConfig` (resolved in the resource's namespace).
    pub fn scoped(name: impl Into<String>) -> Self {
        Self {
            kind: PROVIDER_CONFIG_KIND.to_string(),
            name: name.into(),
        }
    }

    /// Reference a cluster-wide `ClusterProviderConfig`.
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            kind: CLUSTER_PROVIDER_CONFIG_KIND.to_string(),
            name: name.into(),
        }
    }
}

impl Default for ProviderConfigRef {
    fn default() -> Self {
        Self::scoped("default")
    }
}

impl fmt::Display for ProviderConfigRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Where credentials for a provider configuration come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialsSource {
    Secret,
    Environment,
    Filesystem,
    InjectedIdentity,
    None,
}

impl CredentialsSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secret => "Secret",
            Self::Environment => "Environment",
            Self::Filesystem => "Filesystem",
            Self::InjectedIdentity => "InjectedIdentity",
            Self::None => "None",
        }
    }
}

impl fmt::Display for CredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to one key inside a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

impl SecretKeySelector {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }

    /// Convert to a secret store key: `{namespace}/{name}/{key}`.
    pub fn to_key(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.name, self.key)
    }
}

/// Credential settings of a provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub source: CredentialsSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
}

impl ProviderCredentials {
    /// Secret-backed credentials.
    pub fn from_secret(selector: SecretKeySelector) -> Self {
        Self {
            source: CredentialsSource::Secret,
            secret_ref: Some(selector),
        }
    }
}

/// Configuration that tells the engine which account, project and region to
/// authenticate against. Treated as read-only by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    pub domain_name: String,

    #[serde(rename = "projectID", alias = "projectId")]
    pub project_id: String,

    pub region: String,

    /// Overrides the default identity endpoint when set and non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_endpoint: Option<String>,

    pub credentials: ProviderCredentials,
}

/// Coarse lifecycle label derived from the provider's raw status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Available,
    Creating,
    Deleting,
    Unavailable,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Available => "Available",
            Self::Creating => "Creating",
            Self::Deleting => "Deleting",
            Self::Unavailable => "Unavailable",
        };
        f.write_str(s)
    }
}

/// Outcome of the most recent convergence cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "PascalCase")]
pub enum SyncState {
    ReconcileSuccess,
    ReconcileError { message: String },
}

/// [`SyncState`] plus the time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    #[serde(flatten)]
    pub state: SyncState,
    pub last_transition_time: DateTime<Utc>,
}

impl SyncStatus {
    pub fn success() -> Self {
        Self {
            state: SyncState::ReconcileSuccess,
            last_transition_time: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: SyncState::ReconcileError {
                message: message.into(),
            },
            last_transition_time: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.state, SyncState::ReconcileSuccess)
    }
}

/// Status record written back through the status boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus<O> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced: Option<SyncStatus>,

    /// Kind-specific observation copied from the provider.
    pub at_provider: O,
}
