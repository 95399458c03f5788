//! Per-instance classification.

use std::collections::HashSet;

use cycle_core::{Instance, InstanceCategory};

/// Assign the category for one instance.
///
/// A terminating lifecycle always takes precedence over a
/// launch-configuration mismatch. With zero attached load balancers,
/// health is not a gate and every instance on the active configuration
/// counts as in service.
pub fn classify(
    instance: &Instance,
    active_launch_config: &str,
    in_service: &HashSet<String>,
    has_load_balancers: bool,
) -> InstanceCategory {
    if instance.lifecycle.is_terminating() {
        InstanceCategory::Terminating
    } else if instance.launch_config != active_launch_config {
        InstanceCategory::Obsolete
    } else if in_service.contains(&instance.id) || !has_load_balancers {
        InstanceCategory::CurrentInService
    } else {
        InstanceCategory::CurrentOutOfService
    }
}
