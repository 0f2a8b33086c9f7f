//! Provider configuration lookup and controller settings.
//!
//! Resource instances name their configuration through a
//! [`ProviderConfigRef`]. [`resolve_config`] turns that reference into the
//! configuration spec plus the stable identity the session cache is keyed by.
//!
//! [`ConfigRegistry`] is the in-memory [`ConfigSource`], loadable from a TOML
//! file (default: `{config_dir}/providers.toml`):
//!
//! ```toml
//! [controller]
//! poll_interval_secs = 60
//!
//! [[provider_config]]
//! namespace = "team-a"
//! name = "default"
//! domainName = "OTC-EU-DE-000000000010000"
//! projectID = "0123456789abcdef"
//! region = "eu-de"
//! credentials = { source = "Secret", secretRef = { namespace = "crossplane-system", name = "otc-creds", key = "credentials" } }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    CLUSTER_PROVIDER_CONFIG_KIND, PROVIDER_CONFIG_KIND, ProviderConfigRef, ProviderConfigSpec,
};
use crate::session::SessionPolicy;

/// Error type for configuration lookup and loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The reference names a kind other than `ProviderConfig`/`ClusterProviderConfig`.
    #[error("unsupported provider config kind: {kind}")]
    UnsupportedKind { kind: String },

    /// A scoped reference was used by a cluster-scoped resource.
    #[error("ProviderConfig '{name}' can only be referenced from a namespaced resource")]
    NamespaceRequired { name: String },

    #[error("cannot get ProviderConfig {namespace}/{name}: not found")]
    ProviderConfigNotFound { namespace: String, name: String },

    #[error("cannot get ClusterProviderConfig {name}: not found")]
    ClusterProviderConfigNotFound { name: String },

    /// The same configuration is declared twice in one file.
    #[error("duplicate configuration {identity} in {path:?}")]
    Duplicate { identity: String, path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("configuration directory not available")]
    ConfigDirUnavailable,

    /// A `[controller]` setting is outside its accepted range.
    #[error("{field} = {value} in {path:?} exceeds the maximum of {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
        path: PathBuf,
    },
}

/// The configuration boundary: read-only access to declared configurations.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Look up a namespaced `ProviderConfig`.
    async fn provider_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ProviderConfigSpec>, ConfigError>;

    /// Look up a cluster-wide `ClusterProviderConfig`.
    async fn cluster_provider_config(
        &self,
        name: &str,
    ) -> Result<Option<ProviderConfigSpec>, ConfigError>;
}

/// A configuration resolved for one resource instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Stable cache identity, e.g. `ProviderConfig/team-a/default`.
    pub identity: String,
    pub spec: ProviderConfigSpec,
}

/// Resolve a configuration reference for a resource living in `namespace`.
pub async fn resolve_config(
    source: &dyn ConfigSource,
    reference: &ProviderConfigRef,
    namespace: Option<&str>,
) -> Result<ResolvedConfig, ConfigError> {
    match reference.kind.as_str() {
        PROVIDER_CONFIG_KIND => {
            let namespace = namespace.ok_or_else(|| ConfigError::NamespaceRequired {
                name: reference.name.clone(),
            })?;
            let spec = source
                .provider_config(namespace, &reference.name)
                .await?
                .ok_or_else(|| ConfigError::ProviderConfigNotFound {
                    namespace: namespace.to_string(),
                    name: reference.name.clone(),
                })?;
            Ok(ResolvedConfig {
                identity: format!("{}/{}/{}", PROVIDER_CONFIG_KIND, namespace, reference.name),
                spec,
            })
        }
        CLUSTER_PROVIDER_CONFIG_KIND => {
            let spec = source
                .cluster_provider_config(&reference.name)
                .await?
                .ok_or_else(|| ConfigError::ClusterProviderConfigNotFound {
                    name: reference.name.clone(),
                })?;
            Ok(ResolvedConfig {
                identity: format!("{}/{}", CLUSTER_PROVIDER_CONFIG_KIND, reference.name),
                spec,
            })
        }
        other => Err(ConfigError::UnsupportedKind {
            kind: other.to_string(),
        }),
    }
}

/// Upper bound for session validity and safety margin. Provider tokens
/// never outlive a day, so anything beyond a week is a typo.
pub const MAX_SESSION_SECS: u64 = 7 * 24 * 60 * 60;

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_session_validity_secs() -> u64 {
    23 * 60 * 60
}

fn default_session_safety_margin_secs() -> u64 {
    5 * 60
}

/// Controller tunables from the `[controller]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// How often the external scheduler should re-run each instance.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_session_validity_secs")]
    pub session_validity_secs: u64,

    #[serde(default = "default_session_safety_margin_secs")]
    pub session_safety_margin_secs: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            session_validity_secs: default_session_validity_secs(),
            session_safety_margin_secs: default_session_safety_margin_secs(),
        }
    }
}

impl ControllerSettings {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }

    /// Reject session durations above [`MAX_SESSION_SECS`].
    pub fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        for (field, value) in [
            ("session_validity_secs", self.session_validity_secs),
            ("session_safety_margin_secs", self.session_safety_margin_secs),
        ] {
            if value > MAX_SESSION_SECS {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    max: MAX_SESSION_SECS,
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Durations above [`MAX_SESSION_SECS`] are capped.
    pub fn session_policy(&self) -> SessionPolicy {
        let secs = |s: u64| {
            chrono::Duration::try_seconds(s.min(MAX_SESSION_SECS) as i64)
                .unwrap_or(chrono::Duration::MAX)
        };
        SessionPolicy {
            validity: secs(self.session_validity_secs),
            safety_margin: secs(self.session_safety_margin_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderConfigEntry {
    namespace: String,
    name: String,
    #[serde(flatten)]
    spec: ProviderConfigSpec,
}

#[derive(Debug, Deserialize)]
struct ClusterProviderConfigEntry {
    name: String,
    #[serde(flatten)]
    spec: ProviderConfigSpec,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    controller: ControllerSettings,

    #[serde(default)]
    provider_config: Vec<ProviderConfigEntry>,

    #[serde(default)]
    cluster_provider_config: Vec<ClusterProviderConfigEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConfigKey {
    Scoped { namespace: String, name: String },
    Cluster { name: String },
}

/// In-memory [`ConfigSource`].
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    settings: ControllerSettings,
    configs: RwLock<HashMap<ConfigKey, ProviderConfigSpec>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration file location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("com", "raibid-labs", "driftforge")
            .ok_or(ConfigError::ConfigDirUnavailable)?;
        Ok(dirs.config_dir().join("providers.toml"))
    }

    /// Load from the default location; a missing file yields an empty registry.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            tracing::info!("No provider configuration at {:?}, starting empty", path);
            return Ok(Self::new());
        }
        Self::load_from_path(&path)
    }

    /// Load from a specific TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        file.controller.validate(path)?;

        let mut configs = HashMap::new();
        let entries = file
            .provider_config
            .into_iter()
            .map(|e| {
                (
                    ConfigKey::Scoped {
                        namespace: e.namespace,
                        name: e.name,
                    },
                    e.spec,
                )
            })
            .chain(
                file.cluster_provider_config
                    .into_iter()
                    .map(|e| (ConfigKey::Cluster { name: e.name }, e.spec)),
            );

        for (key, spec) in entries {
            if configs.contains_key(&key) {
                return Err(ConfigError::Duplicate {
                    identity: key.identity(),
                    path: path.to_path_buf(),
                });
            }
            configs.insert(key, spec);
        }

        tracing::info!("Loaded {} provider configurations from {:?}", configs.len(), path);

        Ok(Self {
            settings: file.controller,
            configs: RwLock::new(configs),
        })
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Declare or replace a namespaced `ProviderConfig`.
    pub fn insert_provider_config(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: ProviderConfigSpec,
    ) {
        self.configs.write().insert(
            ConfigKey::Scoped {
                namespace: namespace.into(),
                name: name.into(),
            },
            spec,
        );
    }

    /// Declare or replace a `ClusterProviderConfig`.
    pub fn insert_cluster_provider_config(&self, name: impl Into<String>, spec: ProviderConfigSpec) {
        self.configs
            .write()
            .insert(ConfigKey::Cluster { name: name.into() }, spec);
    }

    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.read().is_empty()
    }
}

impl ConfigKey {
    fn identity(&self) -> String {
        match self {
            Self::Scoped { namespace, name } => {
                format!("{}/{}/{}", PROVIDER_CONFIG_KIND, namespace, name)
            }
            Self::Cluster { name } => format!("{}/{}", CLUSTER_PROVIDER_CONFIG_KIND, name),
        }
    }
}

#[async_trait]
impl ConfigSource for ConfigRegistry {
    async fn provider_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ProviderConfigSpec>, ConfigError> {
        let key = ConfigKey::Scoped {
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        Ok(self.configs.read().get(&key).cloned())
    }

    async fn cluster_provider_config(
        &self,
        name: &str,
    ) -> Result<Option<ProviderConfigSpec>, ConfigError> {
        let key = ConfigKey::Cluster {
            name: name.to_string(),
        };
        Ok(self.configs.read().get(&key).cloned())
    }
}
