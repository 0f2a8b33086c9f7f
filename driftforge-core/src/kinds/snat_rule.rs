//! SNAT rule on a NAT gateway.
//!
//! Translates traffic from a subnet (or a CIDR block) to an elastic IP.
//! Every field is immutable.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{
    Drift, LateInit, LifecycleError, ResourceKind, StatusTable, ensure_unchanged,
};
use crate::model::Condition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnatRule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnatRuleParameters {
    pub nat_gateway_id: String,

    pub elastic_ip_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnatRuleObservation {
    pub id: String,
    pub status: String,
    pub elastic_ip_address: String,
    pub admin_state_up: bool,
    pub nat_gateway_id: String,
    pub elastic_ip_id: String,
    pub subnet_id: String,
    pub cidr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnatRuleRecord {
    pub id: String,
    pub status: String,
    pub nat_gateway_id: String,
    pub floating_ip_id: String,
    pub floating_ip_address: String,
    pub network_id: String,
    pub cidr: String,
    pub admin_state_up: bool,
}

/// Create options mirror the parameters one to one.
pub type SnatRuleCreateOpts = SnatRuleParameters;

impl ResourceKind for SnatRule {
    const KIND: &'static str = "SNATRule";

    const STATUS: StatusTable = StatusTable {
        available: &["ACTIVE"],
        creating: &["PENDING_CREATE", "PENDING_UPDATE"],
        deleting: &["PENDING_DELETE"],
        unavailable: &[],
        otherwise: Condition::Unavailable,
    };

    type Parameters = SnatRuleParameters;
    type Observation = SnatRuleObservation;
    type Remote = SnatRuleRecord;
    type CreateOpts = SnatRuleCreateOpts;
    type UpdateOpts = Infallible;

    fn remote_id(remote: &SnatRuleRecord) -> &str {
        &remote.id
    }

    fn raw_status(remote: &SnatRuleRecord) -> &str {
        &remote.status
    }

    fn observation(remote: &SnatRuleRecord) -> SnatRuleObservation {
        SnatRuleObservation {
            id: remote.id.clone(),
            status: remote.status.clone(),
            elastic_ip_address: remote.floating_ip_address.clone(),
            admin_state_up: remote.admin_state_up,
            nat_gateway_id: remote.nat_gateway_id.clone(),
            elastic_ip_id: remote.floating_ip_id.clone(),
            subnet_id: remote.network_id.clone(),
            cidr: remote.cidr.clone(),
        }
    }

    fn late_initialize(desired: &mut SnatRuleParameters, remote: &SnatRuleRecord) -> LateInit {
        LateInit::new()
            .string("subnetId", &mut desired.subnet_id, &remote.network_id)
            .string("cidr", &mut desired.cidr, &remote.cidr)
    }

    fn drift(desired: &SnatRuleParameters, remote: &SnatRuleRecord) -> Drift {
        Drift::new()
            .field("natGatewayId", &desired.nat_gateway_id, &remote.nat_gateway_id)
            .field("elasticIpId", &desired.elastic_ip_id, &remote.floating_ip_id)
            .optional("subnetId", desired.subnet_id.as_deref(), remote.network_id.as_str())
            .optional("cidr", desired.cidr.as_deref(), remote.cidr.as_str())
    }

    fn check_immutable(
        desired: &SnatRuleParameters,
        observed: &SnatRuleObservation,
    ) -> Result<(), LifecycleError> {
        ensure_unchanged(Self::KIND, "natGatewayId", &desired.nat_gateway_id, &observed.nat_gateway_id)?;
        ensure_unchanged(Self::KIND, "elasticIpId", &desired.elastic_ip_id, &observed.elastic_ip_id)?;
        if let Some(subnet_id) = &desired.subnet_id {
            ensure_unchanged(Self::KIND, "subnetId", subnet_id, &observed.subnet_id)?;
        }
        if let Some(cidr) = &desired.cidr {
            ensure_unchanged(Self::KIND, "cidr", cidr, &observed.cidr)?;
        }
        Ok(())
    }

    fn create_opts(desired: &SnatRuleParameters) -> SnatRuleCreateOpts {
        desired.clone()
    }

    fn update_opts(_desired: &SnatRuleParameters) -> Result<Infallible, LifecycleError> {
        Err(LifecycleError::Immutable { kind: Self::KIND })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Simulate;

    fn params() -> SnatRuleParameters {
        SnatRuleParameters {
            nat_gateway_id: "nat-1".to_string(),
            elastic_ip_id: "eip-1".to_string(),
            subnet_id: Some("subnet-1".to_string()),
            cidr: None,
        }
    }

    #[test]
    fn test_empty_cidr_not_late_initialized() {
        let remote = SnatRule::simulate_create("snat-1", &params());
        let mut desired = params();
        assert!(!SnatRule::late_initialize(&mut desired, &remote).changed());
        assert!(desired.cidr.is_none());
        assert!(SnatRule::drift(&desired, &remote).is_empty());
    }

    #[test]
    fn test_moving_to_other_eip_is_refused() {
        let observed = SnatRule::observation(&SnatRule::simulate_create("snat-1", &params()));
        let mut moved = params();
        moved.elastic_ip_id = "eip-2".to_string();

        assert!(matches!(
            SnatRule::check_immutable(&moved, &observed),
            Err(LifecycleError::ImmutableField { field: "elasticIpId", .. })
        ));
        assert!(matches!(
            SnatRule::update_opts(&moved),
            Err(LifecycleError::Immutable { kind: "SNATRule" })
        ));
    }
}
