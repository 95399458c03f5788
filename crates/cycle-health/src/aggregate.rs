//! Merge per-load-balancer health reports into one in-service set.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use cycle_core::HealthState;

/// Health states reported by one load balancer for the instances it
/// fronts, as (instance id, state) pairs.
#[derive(Debug, Clone)]
pub struct LoadBalancerReport {
    pub name: String,
    pub states: Vec<(String, HealthState)>,
}

/// Ids of instances every reporting balancer considers in service.
///
/// An `OutOfService` verdict is sticky: once any balancer reports an
/// instance out of service, no later report changes that for this cycle.
/// With no reports the set is empty; callers treat a group with zero
/// attached balancers as ungated by health.
pub fn in_service_set(reports: &[LoadBalancerReport]) -> HashSet<String> {
    let mut verdicts: HashMap<&str, &HealthState> = HashMap::new();
    for report in reports {
        for (id, state) in &report.states {
            match verdicts.get(id.as_str()) {
                Some(HealthState::OutOfService) => {
                    debug!(
                        balancer = %report.name,
                        instance = %id,
                        "already out of service, ignoring later report"
                    );
                }
                _ => {
                    verdicts.insert(id.as_str(), state);
                }
            }
        }
    }

    verdicts
        .into_iter()
        .filter(|(_, state)| **state == HealthState::InService)
        .map(|(id, _)| id.to_string())
        .collect()
}
