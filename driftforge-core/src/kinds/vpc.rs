//! Virtual private cloud.
//!
//! The CIDR block is fixed at creation; name and description can be updated.

use serde::{Deserialize, Serialize};

use crate::lifecycle::{
    Drift, LateInit, LifecycleError, ResourceKind, StatusTable, ensure_unchanged,
};
use crate::model::Condition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vpc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcParameters {
    pub name: String,

    /// Immutable.
    pub cidr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VpcObservation {
    pub id: String,
    pub status: String,
    pub cidr: String,
}

/// A VPC as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpcRecord {
    pub id: String,
    pub name: String,
    pub cidr: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcCreateOpts {
    pub name: String,
    pub cidr: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcUpdateOpts {
    pub name: String,
    pub description: Option<String>,
}

impl ResourceKind for Vpc {
    const KIND: &'static str = "VPC";

    const STATUS: StatusTable = StatusTable {
        available: &["ACTIVE", "OK"],
        creating: &["CREATING", "PENDING_UPDATE"],
        deleting: &["PENDING_DELETE"],
        unavailable: &[],
        otherwise: Condition::Unavailable,
    };

    type Parameters = VpcParameters;
    type Observation = VpcObservation;
    type Remote = VpcRecord;
    type CreateOpts = VpcCreateOpts;
    type UpdateOpts = VpcUpdateOpts;

    fn remote_id(remote: &VpcRecord) -> &str {
        &remote.id
    }

    fn raw_status(remote: &VpcRecord) -> &str {
        &remote.status
    }

    fn observation(remote: &VpcRecord) -> VpcObservation {
        VpcObservation {
            id: remote.id.clone(),
            status: remote.status.clone(),
            cidr: remote.cidr.clone(),
        }
    }

    fn late_initialize(desired: &mut VpcParameters, remote: &VpcRecord) -> LateInit {
        LateInit::new().string("description", &mut desired.description, &remote.description)
    }

    fn drift(desired: &VpcParameters, remote: &VpcRecord) -> Drift {
        Drift::new()
            .field("name", &desired.name, &remote.name)
            .field("cidr", &desired.cidr, &remote.cidr)
            .optional("description", desired.description.as_deref(), remote.description.as_str())
    }

    fn check_immutable(desired: &VpcParameters, observed: &VpcObservation) -> Result<(), LifecycleError> {
        ensure_unchanged(Self::KIND, "cidr", &desired.cidr, &observed.cidr)
    }

    fn create_opts(desired: &VpcParameters) -> VpcCreateOpts {
        VpcCreateOpts {
            name: desired.name.clone(),
            cidr: desired.cidr.clone(),
            description: desired.description.clone(),
        }
    }

    fn update_opts(desired: &VpcParameters) -> Result<VpcUpdateOpts, LifecycleError> {
        Ok(VpcUpdateOpts {
            name: desired.name.clone(),
            description: desired.description.clone(),
        })
    }
}
