//! Elastic (public) IP with its bandwidth.
//!
//! Every field is immutable. Drift is computed over the full field set so a
//! changed declaration is reported, and the update it triggers fails with an
//! explicit immutable error.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{
    Drift, LateInit, LifecycleError, ResourceKind, StatusTable, ensure_unchanged,
};
use crate::model::Condition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElasticIp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIp {
    /// `BGP` or `Mail`.
    #[serde(rename = "type")]
    pub ip_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bandwidth {
    /// Mbit/s.
    pub size: u32,

    /// `Dedicated` or `Shared`.
    pub share_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticIpParameters {
    #[serde(rename = "publicIP")]
    pub public_ip: PublicIp,

    pub bandwidth: Bandwidth,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElasticIpObservation {
    pub id: String,
    pub status: String,
    pub ip_type: String,
    pub ip_address: String,
    pub private_ip_address: String,
    pub port_id: String,
    pub bandwidth_id: String,
    pub bandwidth_size: u32,
    pub bandwidth_share_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElasticIpRecord {
    pub id: String,
    pub status: String,
    /// Provider type code, e.g. `5_bgp`.
    pub ip_type: String,
    pub public_address: String,
    pub private_address: String,
    pub port_id: String,
    pub bandwidth_id: String,
    pub bandwidth_size: u32,
    /// `PER` or `WHOLE`.
    pub bandwidth_share_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticIpCreateOpts {
    pub ip_type: String,
    pub ip_address: Option<String>,
    pub bandwidth_size: u32,
    pub bandwidth_share_type: String,
}

/// Provider type code for a declared IP type.
pub fn ip_type_code(ip_type: &str) -> &'static str {
    if ip_type == "BGP" { "5_bgp" } else { "5_mailbgp" }
}

/// Provider share type code for a declared bandwidth share type.
pub fn share_type_code(share_type: &str) -> &'static str {
    if share_type == "Shared" { "WHOLE" } else { "PER" }
}

impl ResourceKind for ElasticIp {
    const KIND: &'static str = "ElasticIP";

    // DOWN means no port is attached.
    const STATUS: StatusTable = StatusTable {
        available: &["ACTIVE", "DOWN"],
        creating: &[],
        deleting: &[],
        unavailable: &["ERROR"],
        otherwise: Condition::Creating,
    };

    type Parameters = ElasticIpParameters;
    type Observation = ElasticIpObservation;
    type Remote = ElasticIpRecord;
    type CreateOpts = ElasticIpCreateOpts;
    type UpdateOpts = Infallible;

    fn remote_id(remote: &ElasticIpRecord) -> &str {
        &remote.id
    }

    fn raw_status(remote: &ElasticIpRecord) -> &str {
        &remote.status
    }

    fn observation(remote: &ElasticIpRecord) -> ElasticIpObservation {
        ElasticIpObservation {
            id: remote.id.clone(),
            status: remote.status.clone(),
            ip_type: remote.ip_type.clone(),
            ip_address: remote.public_address.clone(),
            private_ip_address: remote.private_address.clone(),
            port_id: remote.port_id.clone(),
            bandwidth_id: remote.bandwidth_id.clone(),
            bandwidth_size: remote.bandwidth_size,
            bandwidth_share_type: remote.bandwidth_share_type.clone(),
        }
    }

    fn late_initialize(desired: &mut ElasticIpParameters, remote: &ElasticIpRecord) -> LateInit {
        LateInit::new().string("ipAddress", &mut desired.public_ip.ip_address, &remote.public_address)
    }

    fn drift(desired: &ElasticIpParameters, remote: &ElasticIpRecord) -> Drift {
        Drift::new()
            .field("type", ip_type_code(&desired.public_ip.ip_type), remote.ip_type.as_str())
            .optional(
                "ipAddress",
                desired.public_ip.ip_address.as_deref(),
                remote.public_address.as_str(),
            )
            .field("bandwidth.size", &desired.bandwidth.size, &remote.bandwidth_size)
            .field(
                "bandwidth.shareType",
                share_type_code(&desired.bandwidth.share_type),
                remote.bandwidth_share_type.as_str(),
            )
    }

    fn check_immutable(
        desired: &ElasticIpParameters,
        observed: &ElasticIpObservation,
    ) -> Result<(), LifecycleError> {
        ensure_unchanged(
            Self::KIND,
            "type",
            ip_type_code(&desired.public_ip.ip_type),
            observed.ip_type.as_str(),
        )?;
        if let Some(address) = &desired.public_ip.ip_address {
            ensure_unchanged(Self::KIND, "ipAddress", address, &observed.ip_address)?;
        }
        ensure_unchanged(
            Self::KIND,
            "bandwidth.size",
            &desired.bandwidth.size,
            &observed.bandwidth_size,
        )?;
        ensure_unchanged(
            Self::KIND,
            "bandwidth.shareType",
            share_type_code(&desired.bandwidth.share_type),
            observed.bandwidth_share_type.as_str(),
        )
    }

    fn create_opts(desired: &ElasticIpParameters) -> ElasticIpCreateOpts {
        ElasticIpCreateOpts {
            ip_type: ip_type_code(&desired.public_ip.ip_type).to_string(),
            ip_address: desired.public_ip.ip_address.clone(),
            bandwidth_size: desired.bandwidth.size,
            bandwidth_share_type: share_type_code(&desired.bandwidth.share_type).to_string(),
        }
    }

    fn update_opts(_desired: &ElasticIpParameters) -> Result<Infallible, LifecycleError> {
        Err(LifecycleError::Immutable { kind: Self::KIND })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Simulate;

    fn params(size: u32) -> ElasticIpParameters {
        ElasticIpParameters {
            public_ip: PublicIp {
                ip_type: "BGP".to_string(),
                ip_address: None,
            },
            bandwidth: Bandwidth {
                size,
                share_type: "Dedicated".to_string(),
            },
        }
    }

    #[test]
    fn test_status_table() {
        assert_eq!(ElasticIp::STATUS.condition("ACTIVE"), Condition::Available);
        assert_eq!(ElasticIp::STATUS.condition("DOWN"), Condition::Available);
        assert_eq!(ElasticIp::STATUS.condition("ERROR"), Condition::Unavailable);
        assert_eq!(ElasticIp::STATUS.condition("PENDING_CREATE"), Condition::Creating);
    }

    #[test]
    fn test_codes() {
        assert_eq!(ip_type_code("BGP"), "5_bgp");
        assert_eq!(ip_type_code("Mail"), "5_mailbgp");
        assert_eq!(share_type_code("Dedicated"), "PER");
        assert_eq!(share_type_code("Shared"), "WHOLE");
    }

    #[test]
    fn test_full_drift_detection() {
        let remote = ElasticIp::simulate_create("eip-1", &ElasticIp::create_opts(&params(10)));
        assert!(ElasticIp::drift(&params(10), &remote).is_empty());
        assert_eq!(ElasticIp::drift(&params(20), &remote).fields(), &["bandwidth.size"]);
    }

    #[test]
    fn test_address_late_initialized() {
        let remote = ElasticIp::simulate_create("eip-1", &ElasticIp::create_opts(&params(10)));
        let mut desired = params(10);
        assert!(ElasticIp::late_initialize(&mut desired, &remote).changed());
        assert_eq!(desired.public_ip.ip_address.as_deref(), Some("198.51.100.10"));
    }

    #[test]
    fn test_resize_is_an_immutable_violation() {
        let remote = ElasticIp::simulate_create("eip-1", &ElasticIp::create_opts(&params(10)));
        let observed = ElasticIp::observation(&remote);
        assert!(matches!(
            ElasticIp::check_immutable(&params(20), &observed),
            Err(LifecycleError::ImmutableField { field: "bandwidth.size", .. })
        ));
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::json!({
            "publicIP": { "type": "BGP" },
            "bandwidth": { "size": 10, "shareType": "Dedicated" }
        });
        let parsed: ElasticIpParameters = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, params(10));
    }
}
