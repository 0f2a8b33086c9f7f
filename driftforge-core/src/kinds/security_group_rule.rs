//! Security group rule.
//!
//! Rules cannot be changed in place: every field is immutable and update
//! always fails, leaving recreation as the only way to converge.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{
    Drift, LateInit, LifecycleError, ResourceKind, StatusTable, ensure_unchanged,
};
use crate::model::Condition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityGroupRule;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupRuleParameters {
    #[serde(default)]
    pub security_group_id: String,

    /// `ingress` or `egress`.
    pub direction: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethertype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiport: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ip_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_address_group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityGroupRuleObservation {
    pub id: String,
    pub security_group_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityGroupRuleRecord {
    pub id: String,
    pub security_group_id: String,
    pub direction: String,
    pub description: String,
    pub ethertype: String,
    pub protocol: String,
    pub multiport: String,
    pub remote_ip_prefix: String,
    pub remote_group_id: String,
    pub remote_address_group_id: String,
    pub action: String,
    pub priority: i32,
}

/// Create options mirror the parameters one to one.
pub type SecurityGroupRuleCreateOpts = SecurityGroupRuleParameters;

impl ResourceKind for SecurityGroupRule {
    const KIND: &'static str = "SecurityGroupRule";

    // Rules carry no status; once readable they are in effect.
    const STATUS: StatusTable = StatusTable::constant(Condition::Available);

    type Parameters = SecurityGroupRuleParameters;
    type Observation = SecurityGroupRuleObservation;
    type Remote = SecurityGroupRuleRecord;
    type CreateOpts = SecurityGroupRuleCreateOpts;
    type UpdateOpts = Infallible;

    fn remote_id(remote: &SecurityGroupRuleRecord) -> &str {
        &remote.id
    }

    fn raw_status(_remote: &SecurityGroupRuleRecord) -> &str {
        ""
    }

    fn observation(remote: &SecurityGroupRuleRecord) -> SecurityGroupRuleObservation {
        SecurityGroupRuleObservation {
            id: remote.id.clone(),
            security_group_id: remote.security_group_id.clone(),
        }
    }

    fn late_initialize(
        desired: &mut SecurityGroupRuleParameters,
        remote: &SecurityGroupRuleRecord,
    ) -> LateInit {
        LateInit::new()
            .string("description", &mut desired.description, &remote.description)
            .string("ethertype", &mut desired.ethertype, &remote.ethertype)
            .string("protocol", &mut desired.protocol, &remote.protocol)
            .string("multiport", &mut desired.multiport, &remote.multiport)
            .string("remoteIpPrefix", &mut desired.remote_ip_prefix, &remote.remote_ip_prefix)
            .string("remoteGroupId", &mut desired.remote_group_id, &remote.remote_group_id)
            .string(
                "remoteAddressGroupId",
                &mut desired.remote_address_group_id,
                &remote.remote_address_group_id,
            )
            .string("action", &mut desired.action, &remote.action)
            .value("priority", &mut desired.priority, &remote.priority)
    }

    fn drift(desired: &SecurityGroupRuleParameters, remote: &SecurityGroupRuleRecord) -> Drift {
        Drift::new()
            .field("securityGroupId", &desired.security_group_id, &remote.security_group_id)
            .field("direction", &desired.direction, &remote.direction)
            .optional("description", desired.description.as_deref(), remote.description.as_str())
            .optional("ethertype", desired.ethertype.as_deref(), remote.ethertype.as_str())
            .optional("protocol", desired.protocol.as_deref(), remote.protocol.as_str())
            .optional("multiport", desired.multiport.as_deref(), remote.multiport.as_str())
            .optional(
                "remoteIpPrefix",
                desired.remote_ip_prefix.as_deref(),
                remote.remote_ip_prefix.as_str(),
            )
            .optional(
                "remoteGroupId",
                desired.remote_group_id.as_deref(),
                remote.remote_group_id.as_str(),
            )
            .optional(
                "remoteAddressGroupId",
                desired.remote_address_group_id.as_deref(),
                remote.remote_address_group_id.as_str(),
            )
            .optional("action", desired.action.as_deref(), remote.action.as_str())
            .optional("priority", desired.priority.as_ref(), &remote.priority)
    }

    fn check_immutable(
        desired: &SecurityGroupRuleParameters,
        observed: &SecurityGroupRuleObservation,
    ) -> Result<(), LifecycleError> {
        ensure_unchanged(
            Self::KIND,
            "securityGroupId",
            &desired.security_group_id,
            &observed.security_group_id,
        )
    }

    fn create_opts(desired: &SecurityGroupRuleParameters) -> SecurityGroupRuleCreateOpts {
        desired.clone()
    }

    fn update_opts(_desired: &SecurityGroupRuleParameters) -> Result<Infallible, LifecycleError> {
        Err(LifecycleError::Immutable { kind: Self::KIND })
    }
}
