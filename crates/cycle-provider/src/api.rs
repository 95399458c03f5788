//! Typed contracts for the cloud services the engine consumes.
//!
//! Responses are converted into explicit record types at this boundary
//! so nothing downstream branches on untyped data.

use async_trait::async_trait;

use cycle_core::{HealthState, Instance};

use crate::error::ProviderResult;

/// Raw description of a compute group, before classification.
#[derive(Debug, Clone)]
pub struct GroupDescription {
    pub name: String,
    pub min_size: u32,
    pub desired_capacity: u32,
    pub zones: Vec<String>,
    /// Identifier of the currently-active launch configuration.
    pub launch_config: String,
    pub load_balancers: Vec<String>,
    pub instances: Vec<Instance>,
    pub tags: Vec<Tag>,
}

/// A key/value tag on the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Capacity fields to change on a group. `None` leaves a field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityUpdate {
    pub min_size: Option<u32>,
    pub desired_capacity: Option<u32>,
}

/// The compute group API: describe, mutate capacity, terminate, tag.
#[async_trait]
pub trait ComputeGroupApi: Send + Sync {
    async fn describe_group(&self, group: &str) -> ProviderResult<GroupDescription>;

    async fn update_group(&self, group: &str, update: CapacityUpdate) -> ProviderResult<()>;

    /// Terminate one instance, optionally decrementing the group's
    /// desired capacity alongside.
    async fn terminate_instance(
        &self,
        instance_id: &str,
        decrement_desired_capacity: bool,
    ) -> ProviderResult<()>;

    async fn create_or_update_tags(&self, group: &str, tags: &[Tag]) -> ProviderResult<()>;

    async fn delete_tags(&self, group: &str, keys: &[String]) -> ProviderResult<()>;
}

/// Per-balancer instance health, as (instance id, state) pairs.
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn describe_instance_health(
        &self,
        load_balancer: &str,
    ) -> ProviderResult<Vec<(String, HealthState)>>;
}

/// A generic keyed blob store, used as one baseline persistence backend.
/// Absent keys read as `None`; deleting an absent key is not an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> ProviderResult<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: &[u8]) -> ProviderResult<()>;

    async fn delete(&self, key: &str) -> ProviderResult<()>;
}
