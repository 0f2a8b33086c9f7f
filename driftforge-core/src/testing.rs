//! In-memory doubles for the identity provider and the provider resource APIs.
//!
//! Useful for testing controllers without network access, the same way
//! [`MemoryStore`](crate::store::MemoryStore) stands in for a real secret
//! backend.

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::kinds::elastic_ip::{ElasticIp, ElasticIpCreateOpts, ElasticIpRecord};
use crate::kinds::nat_gateway::{
    NatGateway, NatGatewayCreateOpts, NatGatewayRecord, NatGatewayUpdateOpts,
};
use crate::kinds::security_group::{SecurityGroup, SecurityGroupOpts, SecurityGroupRecord};
use crate::kinds::security_group_rule::{
    SecurityGroupRule, SecurityGroupRuleCreateOpts, SecurityGroupRuleRecord,
};
use crate::kinds::snat_rule::{SnatRule, SnatRuleCreateOpts, SnatRuleRecord};
use crate::kinds::subnet::{Subnet, SubnetCreateOpts, SubnetRecord, SubnetUpdateOpts};
use crate::kinds::vpc::{Vpc, VpcCreateOpts, VpcRecord, VpcUpdateOpts};
use crate::lifecycle::{ClientFactory, Locator, ProviderApi, ProviderError, ResourceKind};
use crate::session::{AuthError, AuthOptions, Authenticator};

/// Handle issued by [`CountingAuthenticator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Sequence number of the authentication that produced this handle.
    pub serial: u64,
    pub project_id: String,
    pub region: String,
}

/// Authenticator that counts round-trips and can be told to fail.
#[derive(Debug, Default)]
pub struct CountingAuthenticator {
    calls: AtomicU64,
    reject: Mutex<Option<String>>,
}

impl CountingAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of authentication round-trips so far, failed ones included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reject the next authentication with `message`.
    pub fn reject_next(&self, message: impl Into<String>) {
        *self.reject.lock() = Some(message.into());
    }
}

#[async_trait]
impl Authenticator for CountingAuthenticator {
    type Handle = IssuedToken;

    async fn authenticate(&self, opts: &AuthOptions) -> Result<IssuedToken, AuthError> {
        let serial = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        // Give concurrent callers a chance to pile up behind the cache lock.
        tokio::task::yield_now().await;

        if let Some(message) = self.reject.lock().take() {
            return Err(AuthError::Rejected { message });
        }

        Ok(IssuedToken {
            serial,
            project_id: opts.project_id.clone(),
            region: opts.region.clone(),
        })
    }
}

/// How [`MemoryProvider`] turns create and update calls into stored records.
///
/// Implemented below for every kind in [`crate::kinds`].
pub trait Simulate: ResourceKind {
    /// The record the provider holds after a create, in its ready state.
    fn simulate_create(id: &str, opts: &Self::CreateOpts) -> Self::Remote;

    /// Apply an update call to a stored record.
    fn simulate_update(remote: &mut Self::Remote, opts: &Self::UpdateOpts);
}

/// A call received by [`MemoryProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Get(String),
    Create,
    Update(Locator),
    Delete(Locator),
}

struct Inner<K: ResourceKind> {
    records: Mutex<HashMap<String, K::Remote>>,
    calls: Mutex<Vec<ProviderCall>>,
    failures: Mutex<VecDeque<String>>,
    regions: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

/// In-memory provider API for one kind.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the engine builds clients from another.
pub struct MemoryProvider<K: ResourceKind> {
    inner: Arc<Inner<K>>,
}

impl<K: ResourceKind> Clone for MemoryProvider<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: ResourceKind> Default for MemoryProvider<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                records: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                failures: Mutex::new(VecDeque::new()),
                regions: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

impl<K: ResourceKind> MemoryProvider<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record as if it already existed at the provider.
    pub fn insert(&self, id: impl Into<String>, remote: K::Remote) {
        self.inner.records.lock().insert(id.into(), remote);
    }

    pub fn get_record(&self, id: &str) -> Option<K::Remote> {
        self.inner.records.lock().get(id).cloned()
    }

    /// Mutate a stored record in place, simulating out-of-band changes.
    ///
    /// Returns `false` if no record has that id.
    pub fn modify(&self, id: &str, f: impl FnOnce(&mut K::Remote)) -> bool {
        match self.inner.records.lock().get_mut(id) {
            Some(remote) => {
                f(remote);
                true
            }
            None => false,
        }
    }

    /// Remove a record behind the engine's back.
    pub fn remove(&self, id: &str) -> Option<K::Remote> {
        self.inner.records.lock().remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.lock().is_empty()
    }

    /// Fail the next call of any kind with a generic API error.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.inner.failures.lock().push_back(message.into());
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.inner.calls.lock().clone()
    }

    /// Regions clients were built for through [`ClientFactory`].
    pub fn regions(&self) -> Vec<String> {
        self.inner.regions.lock().clone()
    }

    fn record_call(&self, call: ProviderCall) -> Result<(), ProviderError> {
        self.inner.calls.lock().push(call);
        match self.inner.failures.lock().pop_front() {
            Some(message) => Err(ProviderError::api(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<K: Simulate> ProviderApi<K> for MemoryProvider<K> {
    async fn get(&self, id: &str) -> Result<K::Remote, ProviderError> {
        self.record_call(ProviderCall::Get(id.to_string()))?;
        self.get_record(id).ok_or(ProviderError::NotFound)
    }

    async fn create(&self, opts: &K::CreateOpts) -> Result<K::Remote, ProviderError> {
        self.record_call(ProviderCall::Create)?;
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("{}-{}", K::KIND.to_lowercase(), n);
        let remote = K::simulate_create(&id, opts);
        self.insert(id, remote.clone());
        Ok(remote)
    }

    async fn update(&self, locator: &Locator, opts: &K::UpdateOpts) -> Result<(), ProviderError> {
        self.record_call(ProviderCall::Update(locator.clone()))?;
        if self.modify(&locator.id, |remote| K::simulate_update(remote, opts)) {
            Ok(())
        } else {
            Err(ProviderError::NotFound)
        }
    }

    async fn delete(&self, locator: &Locator) -> Result<(), ProviderError> {
        self.record_call(ProviderCall::Delete(locator.clone()))?;
        self.remove(&locator.id).map(|_| ()).ok_or(ProviderError::NotFound)
    }
}

impl<K: Simulate, H: Send + Sync> ClientFactory<K, H> for MemoryProvider<K> {
    type Client = MemoryProvider<K>;

    fn client(&self, _handle: &H, region: &str) -> Result<Self::Client, ProviderError> {
        self.inner.regions.lock().push(region.to_string());
        Ok(self.clone())
    }
}

// Provider-side behaviour of each kind: records come back in their ready
// state, with defaults the real API would fill in.

impl Simulate for Vpc {
    fn simulate_create(id: &str, opts: &VpcCreateOpts) -> VpcRecord {
        VpcRecord {
            id: id.to_string(),
            name: opts.name.clone(),
            cidr: opts.cidr.clone(),
            description: opts.description.clone().unwrap_or_default(),
            status: "OK".to_string(),
        }
    }

    fn simulate_update(remote: &mut VpcRecord, opts: &VpcUpdateOpts) {
        remote.name = opts.name.clone();
        if let Some(description) = &opts.description {
            remote.description = description.clone();
        }
    }
}

impl Simulate for Subnet {
    fn simulate_create(id: &str, opts: &SubnetCreateOpts) -> SubnetRecord {
        SubnetRecord {
            id: id.to_string(),
            name: opts.name.clone(),
            cidr: opts.cidr.clone(),
            gateway_ip: opts.gateway_ip.clone(),
            vpc_id: opts.vpc_id.clone(),
            dhcp_enable: opts.dhcp_enable.unwrap_or(true),
            primary_dns: opts.primary_dns.clone().unwrap_or_default(),
            secondary_dns: opts.secondary_dns.clone().unwrap_or_default(),
            availability_zone: opts.availability_zone.clone().unwrap_or_default(),
            description: opts.description.clone().unwrap_or_default(),
            status: "ACTIVE".to_string(),
        }
    }

    fn simulate_update(remote: &mut SubnetRecord, opts: &SubnetUpdateOpts) {
        remote.name = opts.name.clone();
        if let Some(dhcp) = opts.dhcp_enable {
            remote.dhcp_enable = dhcp;
        }
        if let Some(dns) = &opts.primary_dns {
            remote.primary_dns = dns.clone();
        }
        if let Some(dns) = &opts.secondary_dns {
            remote.secondary_dns = dns.clone();
        }
        if let Some(description) = &opts.description {
            remote.description = description.clone();
        }
    }
}

impl Simulate for SecurityGroup {
    fn simulate_create(id: &str, opts: &SecurityGroupOpts) -> SecurityGroupRecord {
        SecurityGroupRecord {
            id: id.to_string(),
            name: opts.name.clone(),
            description: opts.description.clone().unwrap_or_default(),
            status: String::new(),
        }
    }

    fn simulate_update(remote: &mut SecurityGroupRecord, opts: &SecurityGroupOpts) {
        remote.name = opts.name.clone();
        if let Some(description) = &opts.description {
            remote.description = description.clone();
        }
    }
}

impl Simulate for SecurityGroupRule {
    fn simulate_create(id: &str, opts: &SecurityGroupRuleCreateOpts) -> SecurityGroupRuleRecord {
        let or_empty = |v: &Option<String>| v.clone().unwrap_or_default();
        SecurityGroupRuleRecord {
            id: id.to_string(),
            security_group_id: opts.security_group_id.clone(),
            direction: opts.direction.clone(),
            description: or_empty(&opts.description),
            ethertype: opts.ethertype.clone().unwrap_or_else(|| "IPv4".to_string()),
            protocol: or_empty(&opts.protocol),
            multiport: or_empty(&opts.multiport),
            remote_ip_prefix: or_empty(&opts.remote_ip_prefix),
            remote_group_id: or_empty(&opts.remote_group_id),
            remote_address_group_id: or_empty(&opts.remote_address_group_id),
            action: opts.action.clone().unwrap_or_else(|| "allow".to_string()),
            priority: opts.priority.unwrap_or(1),
        }
    }

    fn simulate_update(_remote: &mut SecurityGroupRuleRecord, opts: &Infallible) {
        match *opts {}
    }
}

impl Simulate for NatGateway {
    fn simulate_create(id: &str, opts: &NatGatewayCreateOpts) -> NatGatewayRecord {
        NatGatewayRecord {
            id: id.to_string(),
            name: opts.name.clone(),
            description: opts.description.clone().unwrap_or_default(),
            spec: opts.spec.clone(),
            router_id: opts.router_id.clone(),
            internal_network_id: opts.internal_network_id.clone(),
            admin_state_up: true,
            status: "ACTIVE".to_string(),
        }
    }

    fn simulate_update(remote: &mut NatGatewayRecord, opts: &NatGatewayUpdateOpts) {
        remote.name = opts.name.clone();
        remote.spec = opts.spec.clone();
        if let Some(description) = &opts.description {
            remote.description = description.clone();
        }
    }
}

impl Simulate for ElasticIp {
    fn simulate_create(id: &str, opts: &ElasticIpCreateOpts) -> ElasticIpRecord {
        ElasticIpRecord {
            id: id.to_string(),
            status: "DOWN".to_string(),
            ip_type: opts.ip_type.clone(),
            public_address: opts
                .ip_address
                .clone()
                .unwrap_or_else(|| "198.51.100.10".to_string()),
            private_address: String::new(),
            port_id: String::new(),
            bandwidth_id: format!("bw-{}", id),
            bandwidth_size: opts.bandwidth_size,
            bandwidth_share_type: opts.bandwidth_share_type.clone(),
        }
    }

    fn simulate_update(_remote: &mut ElasticIpRecord, opts: &Infallible) {
        match *opts {}
    }
}

impl Simulate for SnatRule {
    fn simulate_create(id: &str, opts: &SnatRuleCreateOpts) -> SnatRuleRecord {
        SnatRuleRecord {
            id: id.to_string(),
            status: "ACTIVE".to_string(),
            nat_gateway_id: opts.nat_gateway_id.clone(),
            floating_ip_id: opts.elastic_ip_id.clone(),
            floating_ip_address: "198.51.100.10".to_string(),
            network_id: opts.subnet_id.clone().unwrap_or_default(),
            cidr: opts.cidr.clone().unwrap_or_default(),
            admin_state_up: true,
        }
    }

    fn simulate_update(_remote: &mut SnatRuleRecord, opts: &Infallible) {
        match *opts {}
    }
}
