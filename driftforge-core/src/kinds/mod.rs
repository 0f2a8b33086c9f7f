//! Resource kinds.
//!
//! Each submodule defines a zero-sized kind tag implementing
//! [`ResourceKind`](crate::lifecycle::ResourceKind) together with its
//! parameter, observation and provider record types.

pub mod elastic_ip;
pub mod nat_gateway;
pub mod security_group;
pub mod security_group_rule;
pub mod snat_rule;
pub mod subnet;
pub mod vpc;

pub use elastic_ip::ElasticIp;
pub use nat_gateway::NatGateway;
pub use security_group::SecurityGroup;
pub use security_group_rule::SecurityGroupRule;
pub use snat_rule::SnatRule;
pub use subnet::Subnet;
pub use vpc::Vpc;
