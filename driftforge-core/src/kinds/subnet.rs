//! Subnet inside a VPC.
//!
//! The provider addresses subnets through their VPC for update and delete.
//! VPC, CIDR and gateway are fixed at creation.

use serde::{Deserialize, Serialize};

use crate::lifecycle::{
    Drift, LateInit, LifecycleError, ResourceKind, StatusTable, ensure_unchanged,
};
use crate::model::Condition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subnet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetParameters {
    pub name: String,

    /// Immutable.
    pub cidr: String,

    /// Immutable.
    pub gateway_ip: String,

    /// Immutable.
    #[serde(default)]
    pub vpc_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_enable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_dns: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_dns: Option<String>,

    /// Only used at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubnetObservation {
    pub id: String,
    pub status: String,
    pub cidr: String,
    pub gateway_ip: String,
    pub vpc_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubnetRecord {
    pub id: String,
    pub name: String,
    pub cidr: String,
    pub gateway_ip: String,
    pub vpc_id: String,
    pub dhcp_enable: bool,
    pub primary_dns: String,
    pub secondary_dns: String,
    pub availability_zone: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetCreateOpts {
    pub name: String,
    pub cidr: String,
    pub gateway_ip: String,
    pub vpc_id: String,
    pub dhcp_enable: Option<bool>,
    pub primary_dns: Option<String>,
    pub secondary_dns: Option<String>,
    pub availability_zone: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetUpdateOpts {
    pub name: String,
    pub dhcp_enable: Option<bool>,
    pub primary_dns: Option<String>,
    pub secondary_dns: Option<String>,
    pub description: Option<String>,
}

impl ResourceKind for Subnet {
    const KIND: &'static str = "Subnet";

    const STATUS: StatusTable = StatusTable {
        available: &["ACTIVE", "OK"],
        creating: &["CREATING", "UNKNOWN"],
        deleting: &[],
        unavailable: &[],
        otherwise: Condition::Unavailable,
    };

    type Parameters = SubnetParameters;
    type Observation = SubnetObservation;
    type Remote = SubnetRecord;
    type CreateOpts = SubnetCreateOpts;
    type UpdateOpts = SubnetUpdateOpts;

    fn remote_id(remote: &SubnetRecord) -> &str {
        &remote.id
    }

    fn raw_status(remote: &SubnetRecord) -> &str {
        &remote.status
    }

    fn observation(remote: &SubnetRecord) -> SubnetObservation {
        SubnetObservation {
            id: remote.id.clone(),
            status: remote.status.clone(),
            cidr: remote.cidr.clone(),
            gateway_ip: remote.gateway_ip.clone(),
            vpc_id: remote.vpc_id.clone(),
        }
    }

    fn late_initialize(desired: &mut SubnetParameters, remote: &SubnetRecord) -> LateInit {
        LateInit::new()
            .value("dhcpEnable", &mut desired.dhcp_enable, &remote.dhcp_enable)
            .string("primaryDns", &mut desired.primary_dns, &remote.primary_dns)
            .string("secondaryDns", &mut desired.secondary_dns, &remote.secondary_dns)
            .string("description", &mut desired.description, &remote.description)
    }

    fn drift(desired: &SubnetParameters, remote: &SubnetRecord) -> Drift {
        Drift::new()
            .field("name", &desired.name, &remote.name)
            .field("cidr", &desired.cidr, &remote.cidr)
            .field("gatewayIp", &desired.gateway_ip, &remote.gateway_ip)
            .field("vpcId", &desired.vpc_id, &remote.vpc_id)
            .optional("description", desired.description.as_deref(), remote.description.as_str())
            .optional("dhcpEnable", desired.dhcp_enable.as_ref(), &remote.dhcp_enable)
            .optional("primaryDns", desired.primary_dns.as_deref(), remote.primary_dns.as_str())
            .optional("secondaryDns", desired.secondary_dns.as_deref(), remote.secondary_dns.as_str())
    }

    fn check_immutable(
        desired: &SubnetParameters,
        observed: &SubnetObservation,
    ) -> Result<(), LifecycleError> {
        ensure_unchanged(Self::KIND, "vpcId", &desired.vpc_id, &observed.vpc_id)?;
        ensure_unchanged(Self::KIND, "cidr", &desired.cidr, &observed.cidr)?;
        ensure_unchanged(Self::KIND, "gatewayIp", &desired.gateway_ip, &observed.gateway_ip)
    }

    fn create_opts(desired: &SubnetParameters) -> SubnetCreateOpts {
        SubnetCreateOpts {
            name: desired.name.clone(),
            cidr: desired.cidr.clone(),
            gateway_ip: desired.gateway_ip.clone(),
            vpc_id: desired.vpc_id.clone(),
            dhcp_enable: desired.dhcp_enable,
            primary_dns: desired.primary_dns.clone(),
            secondary_dns: desired.secondary_dns.clone(),
            availability_zone: desired.availability_zone.clone(),
            description: desired.description.clone(),
        }
    }

    fn update_opts(desired: &SubnetParameters) -> Result<SubnetUpdateOpts, LifecycleError> {
        Ok(SubnetUpdateOpts {
            name: desired.name.clone(),
            dhcp_enable: desired.dhcp_enable,
            primary_dns: desired.primary_dns.clone(),
            secondary_dns: desired.secondary_dns.clone(),
            description: desired.description.clone(),
        })
    }

    fn parent(desired: &SubnetParameters) -> Option<String> {
        Some(desired.vpc_id.clone())
    }
}
