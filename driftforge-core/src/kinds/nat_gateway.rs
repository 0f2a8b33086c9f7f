//! NAT gateway.
//!
//! The gateway size is declared by name (`micro` .. `extra-large`) or by the
//! provider's numeric code; both forms compare equal after
//! [`resolve_spec_id`]. VPC and subnet are fixed at creation.

use serde::{Deserialize, Serialize};

use crate::lifecycle::{
    Drift, LateInit, LifecycleError, ResourceKind, StatusTable, ensure_unchanged,
};
use crate::model::Condition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NatGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewayParameters {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub spec: String,

    /// Immutable.
    #[serde(default)]
    pub vpc_id: String,

    /// Immutable.
    #[serde(default)]
    pub subnet_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NatGatewayObservation {
    pub id: String,
    pub status: String,
    pub admin_state_up: bool,
    pub vpc_id: String,
    pub subnet_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NatGatewayRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Numeric size code.
    pub spec: String,
    pub router_id: String,
    pub internal_network_id: String,
    pub admin_state_up: bool,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatGatewayCreateOpts {
    pub name: String,
    pub description: Option<String>,
    pub spec: String,
    pub router_id: String,
    pub internal_network_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatGatewayUpdateOpts {
    pub name: String,
    pub description: Option<String>,
    pub spec: String,
}

/// Map a size name to the provider's numeric code. Codes and unknown
/// values pass through unchanged.
pub fn resolve_spec_id(spec: &str) -> String {
    match spec.to_lowercase().as_str() {
        "micro" | "0" => "0".to_string(),
        "small" | "1" => "1".to_string(),
        "medium" | "2" => "2".to_string(),
        "large" | "3" => "3".to_string(),
        "extra-large" | "4" => "4".to_string(),
        _ => spec.to_string(),
    }
}

impl ResourceKind for NatGateway {
    const KIND: &'static str = "NATGateway";

    const STATUS: StatusTable = StatusTable {
        available: &["ACTIVE", "OK"],
        creating: &["PENDING_CREATE", "PENDING_UPDATE"],
        deleting: &["PENDING_DELETE"],
        unavailable: &[],
        otherwise: Condition::Unavailable,
    };

    type Parameters = NatGatewayParameters;
    type Observation = NatGatewayObservation;
    type Remote = NatGatewayRecord;
    type CreateOpts = NatGatewayCreateOpts;
    type UpdateOpts = NatGatewayUpdateOpts;

    fn remote_id(remote: &NatGatewayRecord) -> &str {
        &remote.id
    }

    fn raw_status(remote: &NatGatewayRecord) -> &str {
        &remote.status
    }

    fn observation(remote: &NatGatewayRecord) -> NatGatewayObservation {
        NatGatewayObservation {
            id: remote.id.clone(),
            status: remote.status.clone(),
            admin_state_up: remote.admin_state_up,
            vpc_id: remote.router_id.clone(),
            subnet_id: remote.internal_network_id.clone(),
        }
    }

    fn late_initialize(desired: &mut NatGatewayParameters, remote: &NatGatewayRecord) -> LateInit {
        LateInit::new().string("description", &mut desired.description, &remote.description)
    }

    fn drift(desired: &NatGatewayParameters, remote: &NatGatewayRecord) -> Drift {
        Drift::new()
            .field("name", &desired.name, &remote.name)
            .optional("description", desired.description.as_deref(), remote.description.as_str())
            .field("spec", resolve_spec_id(&desired.spec).as_str(), remote.spec.as_str())
            .field("vpcId", &desired.vpc_id, &remote.router_id)
            .field("subnetId", &desired.subnet_id, &remote.internal_network_id)
    }

    fn check_immutable(
        desired: &NatGatewayParameters,
        observed: &NatGatewayObservation,
    ) -> Result<(), LifecycleError> {
        ensure_unchanged(Self::KIND, "vpcId", &desired.vpc_id, &observed.vpc_id)?;
        ensure_unchanged(Self::KIND, "subnetId", &desired.subnet_id, &observed.subnet_id)
    }

    fn create_opts(desired: &NatGatewayParameters) -> NatGatewayCreateOpts {
        NatGatewayCreateOpts {
            name: desired.name.clone(),
            description: desired.description.clone(),
            spec: resolve_spec_id(&desired.spec),
            router_id: desired.vpc_id.clone(),
            internal_network_id: desired.subnet_id.clone(),
        }
    }

    fn update_opts(desired: &NatGatewayParameters) -> Result<NatGatewayUpdateOpts, LifecycleError> {
        Ok(NatGatewayUpdateOpts {
            name: desired.name.clone(),
            description: desired.description.clone(),
            spec: resolve_spec_id(&desired.spec),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Simulate;

    fn params(spec: &str) -> NatGatewayParameters {
        NatGatewayParameters {
            name: "egress".to_string(),
            description: None,
            spec: spec.to_string(),
            vpc_id: "vpc-1".to_string(),
            subnet_id: "subnet-1".to_string(),
        }
    }

    #[test]
    fn test_resolve_spec_id() {
        assert_eq!(resolve_spec_id("micro"), "0");
        assert_eq!(resolve_spec_id("Small"), "1");
        assert_eq!(resolve_spec_id("MEDIUM"), "2");
        assert_eq!(resolve_spec_id("3"), "3");
        assert_eq!(resolve_spec_id("extra-large"), "4");
        assert_eq!(resolve_spec_id("huge"), "huge");
    }

    #[test]
    fn test_spec_name_and_code_do_not_drift() {
        let remote = NatGateway::simulate_create("nat-1", &NatGateway::create_opts(&params("small")));
        assert_eq!(remote.spec, "1");
        assert!(NatGateway::drift(&params("small"), &remote).is_empty());
        assert!(NatGateway::drift(&params("1"), &remote).is_empty());
        assert_eq!(NatGateway::drift(&params("large"), &remote).fields(), &["spec"]);
    }

    #[test]
    fn test_status_table() {
        assert_eq!(NatGateway::STATUS.condition("PENDING_CREATE"), Condition::Creating);
        assert_eq!(NatGateway::STATUS.condition("PENDING_DELETE"), Condition::Deleting);
        assert_eq!(NatGateway::STATUS.condition("INACTIVE"), Condition::Unavailable);
    }

    #[test]
    fn test_subnet_is_immutable() {
        let remote = NatGateway::simulate_create("nat-1", &NatGateway::create_opts(&params("small")));
        let observed = NatGateway::observation(&remote);

        let mut moved = params("small");
        moved.subnet_id = "subnet-2".to_string();
        assert!(matches!(
            NatGateway::check_immutable(&moved, &observed),
            Err(LifecycleError::ImmutableField { field: "subnetId", .. })
        ));
    }
}
