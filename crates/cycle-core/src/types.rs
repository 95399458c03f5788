//! The typed view of one evaluation cycle.
//!
//! Snapshots are rebuilt from scratch every cycle and never mutated in
//! place; a new snapshot replaces the old one. Categories are derived
//! fresh each cycle and never cached across cycles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Instance lifecycle as reported by the compute group API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Pending,
    InService,
    Terminating,
    Terminated,
    /// A lifecycle state the replacement engine does not act on
    /// (e.g. Standby, Detaching).
    Other(String),
}

impl LifecycleState {
    /// Parse the compute API's string form.
    pub fn parse(s: &str) -> Self {
        match s {
            "Pending" => LifecycleState::Pending,
            "InService" => LifecycleState::InService,
            "Terminating" => LifecycleState::Terminating,
            "Terminated" => LifecycleState::Terminated,
            other => LifecycleState::Other(other.to_string()),
        }
    }

    /// Whether the instance is on its way out of the group.
    pub fn is_terminating(&self) -> bool {
        matches!(self, LifecycleState::Terminating | LifecycleState::Terminated)
    }
}

/// Health verdict reported by a single load balancer for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    InService,
    OutOfService,
    /// Any other state the balancer reports (e.g. still registering).
    Other(String),
}

impl HealthState {
    pub fn parse(s: &str) -> Self {
        match s {
            "InService" => HealthState::InService,
            "OutOfService" => HealthState::OutOfService,
            other => HealthState::Other(other.to_string()),
        }
    }
}

/// A compute instance as observed in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    /// Availability zone the instance runs in.
    pub zone: String,
    /// Launch configuration the instance was created from.
    pub launch_config: String,
    pub lifecycle: LifecycleState,
}

/// Category assigned to an instance by the classifier.
///
/// Exactly one category per instance per cycle. `Unknown` instances are
/// inert: the decision engine counts them in none of its comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceCategory {
    /// Matches the active launch configuration and is in service.
    CurrentInService,
    /// Matches the active launch configuration but not yet in service.
    CurrentOutOfService,
    /// Launched from a prior configuration, destined for termination.
    Obsolete,
    /// Lifecycle is Terminating or Terminated.
    Terminating,
    Unknown,
}

/// An instance together with the category assigned this cycle.
#[derive(Debug, Clone)]
pub struct CategorizedInstance {
    pub instance: Instance,
    pub category: InstanceCategory,
}

/// One cycle's authoritative view of the group, built from the group
/// description and the load-balancer health reports.
#[derive(Debug, Clone)]
pub struct GroupSnapshot {
    pub name: String,
    pub min_size: u32,
    pub desired_capacity: u32,
    /// Availability zones the group is configured to use.
    pub zones: Vec<String>,
    /// Identifier of the currently-active launch configuration.
    pub launch_config: String,
    pub load_balancers: Vec<String>,
    pub instances: Vec<CategorizedInstance>,
}

impl GroupSnapshot {
    /// Number of instances in the given category.
    pub fn count(&self, category: InstanceCategory) -> u32 {
        self.instances
            .iter()
            .filter(|i| i.category == category)
            .count() as u32
    }

    /// Instances on the active launch configuration, in service or not.
    pub fn live(&self) -> u32 {
        self.count(InstanceCategory::CurrentInService)
            + self.count(InstanceCategory::CurrentOutOfService)
    }

    /// Ids of instances in the given category.
    pub fn ids(&self, category: InstanceCategory) -> Vec<String> {
        self.instances
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.instance.id.clone())
            .collect()
    }

    /// Distinct zones used by instances in the given category, in
    /// deterministic order.
    pub fn zones_of(&self, category: InstanceCategory) -> BTreeSet<&str> {
        self.instances
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.instance.zone.as_str())
            .collect()
    }

    /// Number of instances of the given category in one zone.
    pub fn count_in_zone(&self, category: InstanceCategory, zone: &str) -> u32 {
        self.instances
            .iter()
            .filter(|i| i.category == category && i.instance.zone == zone)
            .count() as u32
    }
}

/// The group's capacity targets as they stood before the rollout began.
///
/// Created once per rollout, persisted externally, immutable until the
/// rollout completes and deletes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub min_size: u32,
    pub desired_capacity: u32,
}
