//! The ordered decision rules.
//!
//! `evaluate` is a pure function of one snapshot and one baseline; the
//! rules are checked in order and the first match wins. The ordering is
//! load-bearing: capacity raises and convergence waits come before any
//! shrink or terminate action, and MinSize is restored before obsolete
//! instances are torn down, so serving capacity never dips below the
//! baseline target during the swap.

use std::collections::BTreeSet;
use std::fmt;

use cycle_core::{Baseline, GroupSnapshot, InstanceCategory};

/// Fraction of the per-zone fair share a zone must hold before the
/// MinSize shrink is allowed.
const ZONE_SHARE_FLOOR: f64 = 0.7;

/// What the engine wants done this cycle. At most one mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Mutate(Mutation),
    Wait(WaitReason),
    /// The rollout is finished; the caller deletes the baseline.
    Complete,
}

/// A single mutating action against the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Raise MinSize to force replacement capacity to launch.
    RaiseMinSize { min_size: u32 },
    /// Lower MinSize back to the baseline floor.
    RestoreMinSize { min_size: u32 },
    /// Terminate every obsolete instance, decrementing desired capacity
    /// for each. One call per instance; calls are independent.
    TerminateObsolete { instance_ids: Vec<String> },
    /// Set DesiredCapacity back to the baseline target.
    RestoreDesiredCapacity { desired_capacity: u32 },
}

/// Why the engine chose to do nothing this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitReason {
    /// Raising capacity would exceed twice the baseline target. Needs
    /// operator investigation, not automation.
    CapacityCeiling { refused: u32, ceiling: u32 },
    /// New instances are still launching or joining load balancers.
    Converging { pending: u32 },
    /// New capacity does not yet cover the zones the obsolete fleet used.
    ZoneImbalance(Vec<ZoneComplaint>),
    /// Obsolete instances are still shutting down.
    TerminationsInFlight { count: u32 },
}

/// One reason the zone rebalance check failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneComplaint {
    FewerZones { new_zones: usize, obsolete_zones: usize },
    BelowShare { zone: String, ratio: f64 },
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::RaiseMinSize { min_size } => write!(f, "raise MinSize to {min_size}"),
            Mutation::RestoreMinSize { min_size } => write!(f, "restore MinSize to {min_size}"),
            Mutation::TerminateObsolete { instance_ids } => {
                write!(f, "terminate {} obsolete instances", instance_ids.len())
            }
            Mutation::RestoreDesiredCapacity { desired_capacity } => {
                write!(f, "restore DesiredCapacity to {desired_capacity}")
            }
        }
    }
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitReason::CapacityCeiling { refused, ceiling } => write!(
                f,
                "refusing to raise capacity to {refused}, ceiling is {ceiling}"
            ),
            WaitReason::Converging { pending } => {
                write!(f, "waiting for {pending} instances to come into service")
            }
            WaitReason::ZoneImbalance(complaints) => {
                write!(f, "waiting for zone rebalance:")?;
                for complaint in complaints {
                    write!(f, " {complaint};")?;
                }
                Ok(())
            }
            WaitReason::TerminationsInFlight { count } => {
                write!(f, "waiting for {count} instances to finish terminating")
            }
        }
    }
}

impl fmt::Display for ZoneComplaint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneComplaint::FewerZones {
                new_zones,
                obsolete_zones,
            } => write!(
                f,
                "new capacity spans {new_zones} zones, obsolete spanned {obsolete_zones}"
            ),
            ZoneComplaint::BelowShare { zone, ratio } => {
                write!(f, "{zone} at {ratio:.2} of its fair share")
            }
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Mutate(m) => write!(f, "{m}"),
            Decision::Wait(reason) => write!(f, "{reason}"),
            Decision::Complete => write!(f, "rollout complete"),
        }
    }
}

/// Derive this cycle's decision from a fresh snapshot and the baseline.
///
/// Evaluating the same snapshot and baseline twice yields the same
/// decision; nothing is remembered between calls.
pub fn evaluate(snapshot: &GroupSnapshot, baseline: &Baseline) -> Decision {
    let target = baseline.desired_capacity;
    let in_service = snapshot.count(InstanceCategory::CurrentInService);
    let live = snapshot.live();
    let obsolete = snapshot.count(InstanceCategory::Obsolete);
    let terminating = snapshot.count(InstanceCategory::Terminating);

    // 1. Under capacity: force replacements to launch by raising the
    // floor, unless a flapping fleet would push us past 2x the target.
    if live < target {
        let increase = target - live;
        let new_desired = snapshot.desired_capacity + increase;
        if new_desired > target * 2 {
            return Decision::Wait(WaitReason::CapacityCeiling {
                refused: new_desired,
                ceiling: target * 2,
            });
        }
        return Decision::Mutate(Mutation::RaiseMinSize {
            min_size: new_desired,
        });
    }

    // 2. Enough instances exist but not all serve traffic yet.
    if in_service < target {
        return Decision::Wait(WaitReason::Converging {
            pending: live - in_service,
        });
    }

    // 3. Shrink the floor back down, but only once the new fleet covers
    // the zones the obsolete fleet covered.
    if snapshot.min_size != baseline.min_size {
        let complaints = zone_complaints(snapshot, target);
        if !complaints.is_empty() {
            return Decision::Wait(WaitReason::ZoneImbalance(complaints));
        }
        return Decision::Mutate(Mutation::RestoreMinSize {
            min_size: baseline.min_size,
        });
    }

    // 4. Tear down the old fleet.
    if obsolete > 0 {
        return Decision::Mutate(Mutation::TerminateObsolete {
            instance_ids: snapshot.ids(InstanceCategory::Obsolete),
        });
    }

    // 5. Let in-flight terminations drain.
    if terminating > 0 {
        return Decision::Wait(WaitReason::TerminationsInFlight { count: terminating });
    }

    // 6. Put the target back where it started.
    if snapshot.desired_capacity != baseline.desired_capacity {
        return Decision::Mutate(Mutation::RestoreDesiredCapacity {
            desired_capacity: baseline.desired_capacity,
        });
    }

    // 7. Everything restored.
    Decision::Complete
}

/// The zone rebalance check guarding the MinSize shrink.
///
/// New in-service capacity must span at least as many zones as the
/// obsolete fleet did, and every zone that either fleet uses must hold
/// at least 70% of `floor(target / zone count)` in new capacity. A zone
/// the obsolete fleet used but the new fleet has not reached counts as
/// zero and blocks. A fair share that floors to zero passes trivially.
fn zone_complaints(snapshot: &GroupSnapshot, target: u32) -> Vec<ZoneComplaint> {
    let obsolete_zones = snapshot.zones_of(InstanceCategory::Obsolete);
    let new_zones = snapshot.zones_of(InstanceCategory::CurrentInService);

    let mut complaints = Vec::new();
    if new_zones.len() < obsolete_zones.len() {
        complaints.push(ZoneComplaint::FewerZones {
            new_zones: new_zones.len(),
            obsolete_zones: obsolete_zones.len(),
        });
    }

    let zone_count = snapshot.zones.len() as u32;
    let share = if zone_count == 0 { 0 } else { target / zone_count };
    if share > 0 {
        let mut used: BTreeSet<&str> = new_zones;
        used.extend(obsolete_zones);
        for zone in used {
            let count = snapshot.count_in_zone(InstanceCategory::CurrentInService, zone);
            let ratio = f64::from(count) / f64::from(share);
            if ratio < ZONE_SHARE_FLOOR {
                complaints.push(ZoneComplaint::BelowShare {
                    zone: zone.to_string(),
                    ratio,
                });
            }
        }
    }

    complaints
}
