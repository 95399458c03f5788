//! Snapshot assembly — one cycle's authoritative view of the group.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;

use cycle_core::{CategorizedInstance, GroupSnapshot};
use cycle_health::{LoadBalancerReport, in_service_set};
use cycle_provider::{ComputeGroupApi, LoadBalancerApi, ProviderError};

use crate::classify::classify;
use crate::error::{EngineError, EngineResult};

/// Builds a fresh, categorized [`GroupSnapshot`] from two authoritative
/// reads: the group description and the per-balancer health reports.
///
/// Health queries to multiple balancers run concurrently; if any one
/// fails, the whole cycle fails. Partial health data is never used.
pub struct SnapshotBuilder {
    compute: Arc<dyn ComputeGroupApi>,
    health: Arc<dyn LoadBalancerApi>,
}

impl SnapshotBuilder {
    pub fn new(compute: Arc<dyn ComputeGroupApi>, health: Arc<dyn LoadBalancerApi>) -> Self {
        Self { compute, health }
    }

    pub async fn describe(&self, group: &str) -> EngineResult<GroupSnapshot> {
        let desc = self.compute.describe_group(group).await?;
        let reports = self.health_reports(&desc.load_balancers).await?;
        let in_service = in_service_set(&reports);
        let has_load_balancers = !desc.load_balancers.is_empty();

        let instances: Vec<CategorizedInstance> = desc
            .instances
            .into_iter()
            .map(|instance| {
                let category = classify(
                    &instance,
                    &desc.launch_config,
                    &in_service,
                    has_load_balancers,
                );
                CategorizedInstance { instance, category }
            })
            .collect();

        debug!(
            %group,
            instances = instances.len(),
            in_service = in_service.len(),
            "snapshot assembled"
        );

        Ok(GroupSnapshot {
            name: desc.name,
            min_size: desc.min_size,
            desired_capacity: desc.desired_capacity,
            zones: desc.zones,
            launch_config: desc.launch_config,
            load_balancers: desc.load_balancers,
            instances,
        })
    }

    async fn health_reports(&self, balancers: &[String]) -> EngineResult<Vec<LoadBalancerReport>> {
        let mut queries = JoinSet::new();
        for name in balancers {
            let api = Arc::clone(&self.health);
            let name = name.clone();
            queries.spawn(async move {
                let states = api.describe_instance_health(&name).await?;
                Ok::<_, ProviderError>(LoadBalancerReport { name, states })
            });
        }

        let mut reports = Vec::with_capacity(balancers.len());
        while let Some(joined) = queries.join_next().await {
            let report = joined.map_err(|e| EngineError::Join(e.to_string()))??;
            reports.push(report);
        }
        Ok(reports)
    }
}
