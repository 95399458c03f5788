//! In-process simulated cloud.
//!
//! Implements the provider traits over a mutable in-memory fleet. Each
//! `describe_group` call advances the simulated world one tick: pending
//! instances come into service, terminating instances drain away, and
//! the group launches replacements whenever it is below its desired
//! capacity. That is enough to rehearse a whole rollout end to end
//! without touching a real cloud account.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use cycle_core::{HealthState, Instance, LifecycleState};

use crate::api::{CapacityUpdate, ComputeGroupApi, GroupDescription, LoadBalancerApi, Tag};
use crate::error::{ProviderError, ProviderResult};

/// Seed description of a simulated fleet, loadable from JSON.
///
/// `launch_config` is the group's active configuration; instances
/// carrying a different configuration are the ones a rollout replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSpec {
    pub group: String,
    pub min_size: u32,
    pub desired_capacity: u32,
    pub zones: Vec<String>,
    pub launch_config: String,
    #[serde(default)]
    pub load_balancers: Vec<String>,
    #[serde(default)]
    pub instances: Vec<FleetInstance>,
}

/// One seeded instance. Seeded instances start in service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetInstance {
    pub id: String,
    pub zone: String,
    pub launch_config: String,
}

#[derive(Debug, Clone)]
struct SimInstance {
    id: String,
    zone: String,
    launch_config: String,
    lifecycle: LifecycleState,
    health: HealthState,
    /// Ticks remaining before a pending instance comes into service.
    settle: u32,
}

struct SimState {
    name: String,
    min_size: u32,
    desired_capacity: u32,
    zones: Vec<String>,
    launch_config: String,
    load_balancers: Vec<String>,
    instances: Vec<SimInstance>,
    tags: Vec<Tag>,
    next_id: u32,
}

impl SimState {
    /// Instances still counted toward the group's capacity.
    fn active_count(&self) -> u32 {
        self.instances
            .iter()
            .filter(|i| !i.lifecycle.is_terminating())
            .count() as u32
    }

    /// Zone with the fewest active instances, ties broken by list order.
    fn emptiest_zone(&self) -> String {
        self.zones
            .iter()
            .min_by_key(|zone| {
                self.instances
                    .iter()
                    .filter(|i| !i.lifecycle.is_terminating() && i.zone == **zone)
                    .count()
            })
            .cloned()
            .unwrap_or_else(|| "zone-a".to_string())
    }

    /// Advance the world one tick.
    fn tick(&mut self) {
        // Terminated instances leave the group.
        self.instances.retain(|i| i.lifecycle != LifecycleState::Terminated);

        for inst in &mut self.instances {
            if inst.lifecycle == LifecycleState::Terminating {
                inst.lifecycle = LifecycleState::Terminated;
            } else if inst.lifecycle == LifecycleState::Pending {
                if inst.settle > 0 {
                    inst.settle -= 1;
                } else {
                    inst.lifecycle = LifecycleState::InService;
                    inst.health = HealthState::InService;
                }
            }
        }

        // Launch replacements up to desired capacity, balanced by zone.
        while self.active_count() < self.desired_capacity {
            let zone = self.emptiest_zone();
            let id = format!("i-sim{}", self.next_id);
            self.next_id += 1;
            debug!(instance = %id, %zone, "sim launching instance");
            self.instances.push(SimInstance {
                id,
                zone,
                launch_config: self.launch_config.clone(),
                lifecycle: LifecycleState::Pending,
                health: HealthState::OutOfService,
                settle: 0,
            });
        }
    }
}

/// Simulated compute group and load-balancer APIs.
pub struct SimCloud {
    state: Mutex<SimState>,
}

impl SimCloud {
    pub fn new(spec: FleetSpec) -> Self {
        let instances = spec
            .instances
            .into_iter()
            .map(|i| SimInstance {
                id: i.id,
                zone: i.zone,
                launch_config: i.launch_config,
                lifecycle: LifecycleState::InService,
                health: HealthState::InService,
                settle: 0,
            })
            .collect();

        Self {
            state: Mutex::new(SimState {
                name: spec.group,
                min_size: spec.min_size,
                desired_capacity: spec.desired_capacity,
                zones: spec.zones,
                launch_config: spec.launch_config,
                load_balancers: spec.load_balancers,
                instances,
                tags: Vec::new(),
                next_id: 0,
            }),
        }
    }

    pub fn from_json(bytes: &[u8]) -> ProviderResult<Self> {
        let spec: FleetSpec =
            serde_json::from_slice(bytes).map_err(|e| ProviderError::Api(e.to_string()))?;
        Ok(Self::new(spec))
    }

    /// Current (min size, desired capacity), for assertions.
    pub async fn capacity(&self) -> (u32, u32) {
        let state = self.state.lock().await;
        (state.min_size, state.desired_capacity)
    }

    /// Ids of instances still in the group, for assertions.
    pub async fn instance_ids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.instances.iter().map(|i| i.id.clone()).collect()
    }

    /// Number of instances on the given launch configuration.
    pub async fn instances_on(&self, launch_config: &str) -> usize {
        let state = self.state.lock().await;
        state
            .instances
            .iter()
            .filter(|i| i.launch_config == launch_config)
            .count()
    }

    /// Value of a group tag, if set.
    pub async fn tag(&self, key: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.clone())
    }
}

#[async_trait]
impl ComputeGroupApi for SimCloud {
    async fn describe_group(&self, group: &str) -> ProviderResult<GroupDescription> {
        let mut state = self.state.lock().await;
        if state.name != group {
            return Err(ProviderError::GroupNotFound(group.to_string()));
        }
        state.tick();
        Ok(GroupDescription {
            name: state.name.clone(),
            min_size: state.min_size,
            desired_capacity: state.desired_capacity,
            zones: state.zones.clone(),
            launch_config: state.launch_config.clone(),
            load_balancers: state.load_balancers.clone(),
            instances: state
                .instances
                .iter()
                .map(|i| Instance {
                    id: i.id.clone(),
                    zone: i.zone.clone(),
                    launch_config: i.launch_config.clone(),
                    lifecycle: i.lifecycle.clone(),
                })
                .collect(),
            tags: state.tags.clone(),
        })
    }

    async fn update_group(&self, group: &str, update: CapacityUpdate) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        if state.name != group {
            return Err(ProviderError::GroupNotFound(group.to_string()));
        }
        if let Some(min) = update.min_size {
            state.min_size = min;
            // Raising the floor above the current desired capacity pulls
            // desired capacity up with it, as the real API does.
            if min > state.desired_capacity {
                state.desired_capacity = min;
            }
        }
        if let Some(desired) = update.desired_capacity {
            state.desired_capacity = desired;
        }
        Ok(())
    }

    async fn terminate_instance(
        &self,
        instance_id: &str,
        decrement_desired_capacity: bool,
    ) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        let inst = state
            .instances
            .iter_mut()
            .find(|i| i.id == instance_id)
            .ok_or_else(|| ProviderError::InstanceNotFound(instance_id.to_string()))?;
        inst.lifecycle = LifecycleState::Terminating;
        inst.health = HealthState::OutOfService;
        if decrement_desired_capacity {
            state.desired_capacity = state.desired_capacity.saturating_sub(1);
        }
        Ok(())
    }

    async fn create_or_update_tags(&self, group: &str, tags: &[Tag]) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        if state.name != group {
            return Err(ProviderError::GroupNotFound(group.to_string()));
        }
        for tag in tags {
            match state.tags.iter_mut().find(|t| t.key == tag.key) {
                Some(existing) => existing.value = tag.value.clone(),
                None => state.tags.push(tag.clone()),
            }
        }
        Ok(())
    }

    async fn delete_tags(&self, group: &str, keys: &[String]) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        if state.name != group {
            return Err(ProviderError::GroupNotFound(group.to_string()));
        }
        state.tags.retain(|t| !keys.contains(&t.key));
        Ok(())
    }
}

#[async_trait]
impl LoadBalancerApi for SimCloud {
    async fn describe_instance_health(
        &self,
        load_balancer: &str,
    ) -> ProviderResult<Vec<(String, HealthState)>> {
        let state = self.state.lock().await;
        if !state.load_balancers.iter().any(|lb| lb == load_balancer) {
            return Err(ProviderError::LoadBalancerNotFound(load_balancer.to_string()));
        }
        Ok(state
            .instances
            .iter()
            .map(|i| (i.id.clone(), i.health.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> FleetSpec {
        FleetSpec {
            group: "web".to_string(),
            min_size: 2,
            desired_capacity: 2,
            zones: vec!["zone-a".to_string(), "zone-b".to_string()],
            launch_config: "lc-2".to_string(),
            load_balancers: vec!["elb-web".to_string()],
            instances: vec![
                FleetInstance {
                    id: "i-old1".to_string(),
                    zone: "zone-a".to_string(),
                    launch_config: "lc-1".to_string(),
                },
                FleetInstance {
                    id: "i-old2".to_string(),
                    zone: "zone-b".to_string(),
                    launch_config: "lc-1".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn describe_unknown_group_fails() {
        let sim = SimCloud::new(fleet());
        let err = sim.describe_group("nope").await.unwrap_err();
        assert!(matches!(err, ProviderError::GroupNotFound(_)));
    }

    #[tokio::test]
    async fn raising_min_size_pulls_desired_up() {
        let sim = SimCloud::new(fleet());
        sim.update_group(
            "web",
            CapacityUpdate {
                min_size: Some(4),
                desired_capacity: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(sim.capacity().await, (4, 4));
    }

    #[tokio::test]
    async fn launches_fill_desired_capacity_balanced_by_zone() {
        let sim = SimCloud::new(fleet());
        sim.update_group(
            "web",
            CapacityUpdate {
                min_size: Some(4),
                desired_capacity: None,
            },
        )
        .await
        .unwrap();

        // Tick: two replacements launch, one per zone.
        let desc = sim.describe_group("web").await.unwrap();
        assert_eq!(desc.instances.len(), 4);
        let new: Vec<_> = desc
            .instances
            .iter()
            .filter(|i| i.launch_config == "lc-2")
            .collect();
        assert_eq!(new.len(), 2);
        assert_ne!(new[0].zone, new[1].zone);
    }

    #[tokio::test]
    async fn pending_instances_come_into_service_after_a_tick() {
        let sim = SimCloud::new(fleet());
        sim.update_group(
            "web",
            CapacityUpdate {
                min_size: Some(3),
                desired_capacity: None,
            },
        )
        .await
        .unwrap();

        let desc = sim.describe_group("web").await.unwrap();
        let pending = desc
            .instances
            .iter()
            .find(|i| i.launch_config == "lc-2")
            .unwrap();
        assert_eq!(pending.lifecycle, LifecycleState::Pending);

        let desc = sim.describe_group("web").await.unwrap();
        let settled = desc
            .instances
            .iter()
            .find(|i| i.launch_config == "lc-2")
            .unwrap();
        assert_eq!(settled.lifecycle, LifecycleState::InService);
    }

    #[tokio::test]
    async fn terminate_decrements_desired_and_drains() {
        let sim = SimCloud::new(fleet());
        sim.terminate_instance("i-old1", true).await.unwrap();
        assert_eq!(sim.capacity().await, (2, 1));

        // Terminating → Terminated → gone, over two ticks.
        let desc = sim.describe_group("web").await.unwrap();
        assert!(
            desc.instances
                .iter()
                .any(|i| i.id == "i-old1" && i.lifecycle == LifecycleState::Terminated)
        );
        let desc = sim.describe_group("web").await.unwrap();
        assert!(!desc.instances.iter().any(|i| i.id == "i-old1"));
    }

    #[tokio::test]
    async fn health_reports_cover_all_instances() {
        let sim = SimCloud::new(fleet());
        let states = sim.describe_instance_health("elb-web").await.unwrap();
        assert_eq!(states.len(), 2);
        assert!(states.iter().all(|(_, s)| *s == HealthState::InService));

        let err = sim.describe_instance_health("elb-nope").await.unwrap_err();
        assert!(matches!(err, ProviderError::LoadBalancerNotFound(_)));
    }

    #[tokio::test]
    async fn tags_round_trip() {
        let sim = SimCloud::new(fleet());
        sim.create_or_update_tags("web", &[Tag::new("cycle:MinSize", "2")])
            .await
            .unwrap();
        assert_eq!(sim.tag("cycle:MinSize").await.as_deref(), Some("2"));

        sim.create_or_update_tags("web", &[Tag::new("cycle:MinSize", "3")])
            .await
            .unwrap();
        assert_eq!(sim.tag("cycle:MinSize").await.as_deref(), Some("3"));

        sim.delete_tags("web", &["cycle:MinSize".to_string()])
            .await
            .unwrap();
        assert_eq!(sim.tag("cycle:MinSize").await, None);
        // Deleting again is fine.
        sim.delete_tags("web", &["cycle:MinSize".to_string()])
            .await
            .unwrap();
    }

    #[test]
    fn fleet_spec_parses_from_json() {
        let json = r#"{
            "group": "web",
            "min_size": 2,
            "desired_capacity": 4,
            "zones": ["zone-a"],
            "launch_config": "lc-2",
            "instances": [
                {"id": "i-1", "zone": "zone-a", "launch_config": "lc-1"}
            ]
        }"#;
        let spec: FleetSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.group, "web");
        assert!(spec.load_balancers.is_empty());
        assert_eq!(spec.instances.len(), 1);
    }
}
