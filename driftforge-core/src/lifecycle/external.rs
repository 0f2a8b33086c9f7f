use std::marker::PhantomData;

use super::{LifecycleError, Managed, Operation, ProviderApi, ProviderError, ResourceKind};
use crate::model::Condition;

/// Result of [`External::observe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    pub exists: bool,
    pub up_to_date: bool,
    /// The desired spec was changed by late-initialization and should be persisted.
    pub late_initialized: bool,
}

impl ExternalObservation {
    fn missing() -> Self {
        Self::default()
    }
}

/// Observe/Create/Update/Delete for any [`ResourceKind`].
pub struct External<K: ResourceKind, C> {
    client: C,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind, C: ProviderApi<K>> External<K, C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch the resource and compare it with the desired spec.
    ///
    /// Copies the observation and condition into status and late-initializes
    /// the spec. A missing external name or a not-found response reports
    /// `exists: false` without error.
    pub async fn observe(&self, mg: &mut Managed<K>) -> Result<ExternalObservation, LifecycleError> {
        let Some(id) = mg.external_name().map(str::to_string) else {
            tracing::debug!("{} {} has no external name yet", K::KIND, mg.metadata.key());
            return Ok(ExternalObservation::missing());
        };

        let remote = match self.client.get(&id).await {
            Ok(remote) => remote,
            Err(ProviderError::NotFound) => {
                tracing::warn!("{} {} not found at provider", K::KIND, id);
                return Ok(ExternalObservation::missing());
            }
            Err(source) => return Err(provider_error::<K>(Operation::Observe, source)),
        };

        mg.status.at_provider = K::observation(&remote);
        mg.status.condition = Some(K::STATUS.condition(K::raw_status(&remote)));

        let late = K::late_initialize(&mut mg.spec, &remote);
        if late.changed() {
            tracing::debug!("{} {} late-initialized {:?}", K::KIND, id, late.fields());
        }

        let drift = K::drift(&mg.spec, &remote);
        if !drift.is_empty() {
            tracing::debug!("{} {} drifted on {:?}", K::KIND, id, drift.fields());
        }

        Ok(ExternalObservation {
            exists: true,
            up_to_date: drift.is_empty(),
            late_initialized: late.changed(),
        })
    }

    /// Create the resource and record its id as the external name.
    pub async fn create(&self, mg: &mut Managed<K>) -> Result<String, LifecycleError> {
        mg.status.condition = Some(Condition::Creating);

        let opts = K::create_opts(&mg.spec);
        let remote = self
            .client
            .create(&opts)
            .await
            .map_err(|source| provider_error::<K>(Operation::Create, source))?;

        let id = K::remote_id(&remote).to_string();
        mg.metadata.record_external_name(id.clone())?;
        mg.status.at_provider = K::observation(&remote);

        tracing::info!("Created {} {} for {}", K::KIND, id, mg.metadata.key());
        Ok(id)
    }

    /// Push mutable fields to the provider after checking immutable ones
    /// against the last observation.
    pub async fn update(&self, mg: &Managed<K>) -> Result<(), LifecycleError> {
        let id = mg
            .external_name()
            .ok_or(LifecycleError::NoExternalName { kind: K::KIND })?;

        K::check_immutable(&mg.spec, &mg.status.at_provider)?;
        let opts = K::update_opts(&mg.spec)?;

        self.client
            .update(&mg.locator(id), &opts)
            .await
            .map_err(|source| provider_error::<K>(Operation::Update, source))?;

        tracing::info!("Updated {} {}", K::KIND, id);
        Ok(())
    }

    /// Delete the resource. Never-created and already-removed resources succeed.
    pub async fn delete(&self, mg: &mut Managed<K>) -> Result<(), LifecycleError> {
        mg.status.condition = Some(Condition::Deleting);

        let Some(id) = mg.external_name() else {
            tracing::debug!("{} {} was never created, nothing to delete", K::KIND, mg.metadata.key());
            return Ok(());
        };

        match self.client.delete(&mg.locator(id)).await {
            Ok(()) => {
                tracing::info!("Deleted {} {}", K::KIND, id);
                Ok(())
            }
            Err(ProviderError::NotFound) => {
                tracing::debug!("{} {} already gone", K::KIND, id);
                Ok(())
            }
            Err(source) => Err(provider_error::<K>(Operation::Delete, source)),
        }
    }
}

fn provider_error<K: ResourceKind>(operation: Operation, source: ProviderError) -> LifecycleError {
    LifecycleError::Provider {
        operation,
        kind: K::KIND,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::vpc::{Vpc, VpcParameters, VpcRecord};
    use crate::model::{ObjectMeta, ProviderConfigRef};
    use crate::testing::{MemoryProvider, ProviderCall};

    fn desired(name: &str, cidr: &str) -> Managed<Vpc> {
        Managed::new(
            ObjectMeta::namespaced("team-a", "web"),
            ProviderConfigRef::default(),
            VpcParameters {
                name: name.to_string(),
                cidr: cidr.to_string(),
                description: None,
            },
        )
    }

    fn record(id: &str, name: &str, cidr: &str, status: &str) -> VpcRecord {
        VpcRecord {
            id: id.to_string(),
            name: name.to_string(),
            cidr: cidr.to_string(),
            description: String::new(),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn test_observe_without_external_name_skips_provider() {
        let provider = MemoryProvider::<Vpc>::new();
        let external = External::<Vpc, _>::new(provider.clone());
        let mut mg = desired("test-vpc", "192.168.0.0/16");

        let obs = external.observe(&mut mg).await.unwrap();
        assert!(!obs.exists);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_observe_up_to_date_and_available() {
        let provider = MemoryProvider::<Vpc>::new();
        provider.insert("vpc-1", record("vpc-1", "test-vpc", "192.168.0.0/16", "OK"));
        let external = External::<Vpc, _>::new(provider);

        let mut mg = desired("test-vpc", "192.168.0.0/16");
        mg.metadata.record_external_name("vpc-1").unwrap();

        let obs = external.observe(&mut mg).await.unwrap();
        assert!(obs.exists);
        assert!(obs.up_to_date);
        assert!(!obs.late_initialized);
        assert_eq!(mg.condition(), Some(Condition::Available));
        assert_eq!(mg.status.at_provider.id, "vpc-1");
        assert_eq!(mg.status.at_provider.cidr, "192.168.0.0/16");
    }

    #[tokio::test]
    async fn test_observe_reports_name_drift() {
        let provider = MemoryProvider::<Vpc>::new();
        provider.insert("vpc-1", record("vpc-1", "old-name", "192.168.0.0/16", "OK"));
        let external = External::<Vpc, _>::new(provider);

        let mut mg = desired("new-name", "192.168.0.0/16");
        mg.metadata.record_external_name("vpc-1").unwrap();

        let obs = external.observe(&mut mg).await.unwrap();
        assert!(obs.exists);
        assert!(!obs.up_to_date);
    }

    #[tokio::test]
    async fn test_observe_not_found_is_not_an_error() {
        let provider = MemoryProvider::<Vpc>::new();
        let external = External::<Vpc, _>::new(provider.clone());

        let mut mg = desired("test-vpc", "192.168.0.0/16");
        mg.metadata.record_external_name("vpc-gone").unwrap();

        let obs = external.observe(&mut mg).await.unwrap();
        assert!(!obs.exists);
        assert_eq!(provider.calls(), vec![ProviderCall::Get("vpc-gone".to_string())]);
    }

    #[tokio::test]
    async fn test_observe_wraps_provider_errors() {
        let provider = MemoryProvider::<Vpc>::new();
        provider.fail_next("internal server error");
        let external = External::<Vpc, _>::new(provider);

        let mut mg = desired("test-vpc", "192.168.0.0/16");
        mg.metadata.record_external_name("vpc-1").unwrap();

        let err = external.observe(&mut mg).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Provider {
                operation: Operation::Observe,
                kind: "VPC",
                ..
            }
        ));
        assert!(err.to_string().starts_with("cannot observe VPC"));
    }

    #[tokio::test]
    async fn test_create_records_external_name() {
        let provider = MemoryProvider::<Vpc>::new();
        let external = External::<Vpc, _>::new(provider.clone());
        let mut mg = desired("test-vpc", "192.168.0.0/16");

        let id = external.create(&mut mg).await.unwrap();
        assert_eq!(mg.external_name(), Some(id.as_str()));
        assert_eq!(mg.condition(), Some(Condition::Creating));
        assert!(provider.get_record(&id).is_some());
    }

    #[tokio::test]
    async fn test_update_rejects_immutable_cidr() {
        let provider = MemoryProvider::<Vpc>::new();
        provider.insert("vpc-1", record("vpc-1", "test-vpc", "192.168.0.0/16", "OK"));
        let external = External::<Vpc, _>::new(provider.clone());

        let mut mg = desired("test-vpc", "192.168.0.0/16");
        mg.metadata.record_external_name("vpc-1").unwrap();
        external.observe(&mut mg).await.unwrap();

        mg.spec.cidr = "10.0.0.0/8".to_string();
        let err = external.update(&mg).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ImmutableField { kind: "VPC", field: "cidr" }
        ));
        assert!(!provider.calls().iter().any(|c| matches!(c, ProviderCall::Update(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let provider = MemoryProvider::<Vpc>::new();
        let external = External::<Vpc, _>::new(provider.clone());

        let mut never_created = desired("test-vpc", "192.168.0.0/16");
        external.delete(&mut never_created).await.unwrap();
        assert!(provider.calls().is_empty());
        assert_eq!(never_created.condition(), Some(Condition::Deleting));

        let mut removed = desired("test-vpc", "192.168.0.0/16");
        removed.metadata.record_external_name("vpc-gone").unwrap();
        external.delete(&mut removed).await.unwrap();
        external.delete(&mut removed).await.unwrap();
    }
}
