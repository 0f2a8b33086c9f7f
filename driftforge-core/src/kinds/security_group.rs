//! Security group. Both fields can be updated in place.

use serde::{Deserialize, Serialize};

use crate::lifecycle::{Drift, LateInit, LifecycleError, ResourceKind, StatusTable};
use crate::model::Condition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityGroup;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupParameters {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityGroupObservation {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityGroupRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupOpts {
    pub name: String,
    pub description: Option<String>,
}

impl ResourceKind for SecurityGroup {
    const KIND: &'static str = "SecurityGroup";

    // Security groups have no provisioning states.
    const STATUS: StatusTable = StatusTable::constant(Condition::Available);

    type Parameters = SecurityGroupParameters;
    type Observation = SecurityGroupObservation;
    type Remote = SecurityGroupRecord;
    type CreateOpts = SecurityGroupOpts;
    type UpdateOpts = SecurityGroupOpts;

    fn remote_id(remote: &SecurityGroupRecord) -> &str {
        &remote.id
    }

    fn raw_status(remote: &SecurityGroupRecord) -> &str {
        &remote.status
    }

    fn observation(remote: &SecurityGroupRecord) -> SecurityGroupObservation {
        SecurityGroupObservation {
            id: remote.id.clone(),
            status: remote.status.clone(),
        }
    }

    fn late_initialize(desired: &mut SecurityGroupParameters, remote: &SecurityGroupRecord) -> LateInit {
        LateInit::new().string("description", &mut desired.description, &remote.description)
    }

    fn drift(desired: &SecurityGroupParameters, remote: &SecurityGroupRecord) -> Drift {
        Drift::new()
            .field("name", &desired.name, &remote.name)
            .optional("description", desired.description.as_deref(), remote.description.as_str())
    }

    fn check_immutable(
        _desired: &SecurityGroupParameters,
        _observed: &SecurityGroupObservation,
    ) -> Result<(), LifecycleError> {
        Ok(())
    }

    fn create_opts(desired: &SecurityGroupParameters) -> SecurityGroupOpts {
        SecurityGroupOpts {
            name: desired.name.clone(),
            description: desired.description.clone(),
        }
    }

    fn update_opts(desired: &SecurityGroupParameters) -> Result<SecurityGroupOpts, LifecycleError> {
        Ok(Self::create_opts(desired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_available() {
        assert_eq!(SecurityGroup::STATUS.condition(""), Condition::Available);
    }

    #[test]
    fn test_rename_drifts_and_updates() {
        let desired = SecurityGroupParameters {
            name: "web".to_string(),
            description: None,
        };
        let remote = SecurityGroupRecord {
            id: "sg-1".to_string(),
            name: "default".to_string(),
            ..Default::default()
        };

        assert_eq!(SecurityGroup::drift(&desired, &remote).fields(), &["name"]);
        let opts = SecurityGroup::update_opts(&desired).unwrap();
        assert_eq!(opts.name, "web");
    }
}
