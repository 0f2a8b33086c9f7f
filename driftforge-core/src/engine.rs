//! The reconciliation engine.
//!
//! [`Reconciler::reconcile`] drives one convergence cycle for one resource
//! instance:
//!
//! 1. Connect: configuration, credentials, session, kind client.
//! 2. Deletion requested: delete and stop.
//! 3. Observe (late-initializing the spec).
//! 4. Missing and never created: create.
//! 5. Missing although an external name is recorded: fail, never re-create.
//! 6. Drifted: update.
//!
//! The instance is written back through the [`ResourceStore`] after every
//! cycle, successful or not. The engine neither retries nor sleeps; the
//! external scheduler calls it again.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::connector::{ConnectError, Connector};
use crate::lifecycle::{
    ClientFactory, External, LifecycleError, Managed, Operation, ProviderError, ResourceKind,
};
use crate::model::{Condition, SyncStatus};
use crate::session::Authenticator;
use crate::store::StoreError;

/// What a successful cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileAction {
    Deleted,
    Created,
    Updated,
    UpToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub action: ReconcileAction,
    /// Late-initialization changed the desired spec.
    pub spec_changed: bool,
}

/// Error type for a reconcile cycle.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cannot connect: {0}")]
    Connect(#[from] ConnectError),

    #[error("cannot create provider client: {source}")]
    Client { source: ProviderError },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The resource behind a recorded external name is gone. The external
    /// name is permanent, so the engine will not create a replacement.
    #[error("{kind} {external_name} no longer exists at the provider")]
    ExternalResourceMissing {
        kind: &'static str,
        external_name: String,
    },

    #[error("cannot persist {key}: {source}")]
    Persist { key: String, source: StoreError },
}

impl ReconcileError {
    /// The lifecycle operation that failed, if the error belongs to one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Connect(_) | Self::Client { .. } => Some(Operation::Connect),
            Self::Lifecycle(LifecycleError::Provider { operation, .. }) => Some(*operation),
            Self::Lifecycle(LifecycleError::ExternalName(_)) => Some(Operation::Create),
            Self::Lifecycle(_) => Some(Operation::Update),
            Self::ExternalResourceMissing { .. } => Some(Operation::Observe),
            Self::Persist { .. } => None,
        }
    }
}

/// The status boundary: where instances are written back after a cycle.
#[async_trait]
pub trait ResourceStore<K: ResourceKind>: Send + Sync {
    async fn persist(&self, mg: &Managed<K>) -> Result<(), StoreError>;
}

/// Keeps the latest persisted copy of each instance, keyed by `namespace/name`.
pub struct MemoryResourceStore<K: ResourceKind> {
    objects: RwLock<HashMap<String, Managed<K>>>,
}

impl<K: ResourceKind> MemoryResourceStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Managed<K>> {
        self.objects.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl<K: ResourceKind> Default for MemoryResourceStore<K> {
    fn default() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<K: ResourceKind> ResourceStore<K> for MemoryResourceStore<K> {
    async fn persist(&self, mg: &Managed<K>) -> Result<(), StoreError> {
        self.objects.write().insert(mg.metadata.key(), mg.clone());
        Ok(())
    }
}

/// Reconciles instances of one kind.
pub struct Reconciler<K, A, F>
where
    K: ResourceKind,
    A: Authenticator,
    F: ClientFactory<K, A::Handle>,
{
    connector: Arc<Connector<A>>,
    factory: F,
    store: Arc<dyn ResourceStore<K>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, A, F> Reconciler<K, A, F>
where
    K: ResourceKind,
    A: Authenticator,
    F: ClientFactory<K, A::Handle>,
{
    pub fn new(connector: Arc<Connector<A>>, factory: F, store: Arc<dyn ResourceStore<K>>) -> Self {
        Self {
            connector,
            factory,
            store,
            _kind: PhantomData,
        }
    }

    /// Run one convergence cycle and persist the instance.
    #[tracing::instrument(skip_all, fields(kind = K::KIND, name = %mg.metadata.key()))]
    pub async fn reconcile(&self, mg: &mut Managed<K>) -> Result<ReconcileOutcome, ReconcileError> {
        let result = self.cycle(mg).await;

        mg.status.synced = Some(match &result {
            Ok(_) => SyncStatus::success(),
            Err(e) => SyncStatus::error(e.to_string()),
        });

        let persisted = self
            .store
            .persist(mg)
            .await
            .map_err(|source| ReconcileError::Persist {
                key: mg.metadata.key(),
                source,
            });

        match (result, persisted) {
            (Ok(outcome), Ok(())) => {
                tracing::debug!("Reconciled: {:?}", outcome);
                Ok(outcome)
            }
            (Ok(_), Err(e)) => {
                tracing::error!("{}", e);
                Err(e)
            }
            (Err(e), Ok(())) => {
                tracing::warn!("Reconcile failed: {}", e);
                Err(e)
            }
            (Err(e), Err(persist)) => {
                tracing::error!("Reconcile failed: {}; status not persisted: {}", e, persist);
                Err(e)
            }
        }
    }

    async fn cycle(&self, mg: &mut Managed<K>) -> Result<ReconcileOutcome, ReconcileError> {
        let connection = self
            .connector
            .connect(&mg.provider_config_ref, mg.metadata.namespace.as_deref())
            .await?;
        let client = self
            .factory
            .client(&connection.handle, &connection.region)
            .map_err(|source| ReconcileError::Client { source })?;
        let external = External::<K, _>::new(client);

        if mg.metadata.deletion_requested {
            external.delete(mg).await?;
            return Ok(outcome(ReconcileAction::Deleted, false));
        }

        let observation = external.observe(mg).await?;
        let spec_changed = observation.late_initialized;

        if !observation.exists {
            if let Some(external_name) = mg.external_name() {
                let external_name = external_name.to_string();
                mg.status.condition = Some(Condition::Unavailable);
                return Err(ReconcileError::ExternalResourceMissing {
                    kind: K::KIND,
                    external_name,
                });
            }
            external.create(mg).await?;
            return Ok(outcome(ReconcileAction::Created, spec_changed));
        }

        if !observation.up_to_date {
            external.update(mg).await?;
            return Ok(outcome(ReconcileAction::Updated, spec_changed));
        }

        Ok(outcome(ReconcileAction::UpToDate, spec_changed))
    }
}

fn outcome(action: ReconcileAction, spec_changed: bool) -> ReconcileOutcome {
    ReconcileOutcome {
        action,
        spec_changed,
    }
}
