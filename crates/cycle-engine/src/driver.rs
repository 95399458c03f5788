//! Poll loop driving the decision engine until the rollout completes.
//!
//! One logical flow of control per group: each tick gathers a fresh
//! snapshot, reads (or captures) the baseline, evaluates, and applies
//! at most one mutation. Between ticks the driver sleeps for the poll
//! interval or exits on the shutdown signal. A cycle already in flight
//! finishes its current mutating call before shutdown is honored, since
//! group mutations are not transactional.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use cycle_baseline::BaselineStore;
use cycle_core::Baseline;
use cycle_provider::{CapacityUpdate, ComputeGroupApi, LoadBalancerApi, ProviderError};

use crate::engine::{Decision, Mutation, WaitReason, evaluate};
use crate::error::{EngineError, EngineResult};
use crate::snapshot::SnapshotBuilder;

/// How a driver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The group converged and the baseline was deleted.
    Completed,
    /// Shutdown was requested between cycles.
    Cancelled,
}

/// Drives one group's rollout to completion.
pub struct Driver {
    group: String,
    poll_interval: Duration,
    snapshots: SnapshotBuilder,
    compute: Arc<dyn ComputeGroupApi>,
    baselines: Arc<dyn BaselineStore>,
}

impl Driver {
    pub fn new(
        compute: Arc<dyn ComputeGroupApi>,
        health: Arc<dyn LoadBalancerApi>,
        baselines: Arc<dyn BaselineStore>,
        group: &str,
    ) -> Self {
        Self {
            group: group.to_string(),
            poll_interval: Duration::from_secs(30),
            snapshots: SnapshotBuilder::new(Arc::clone(&compute), health),
            compute,
            baselines,
        }
    }

    /// Override the 30 second default poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run one evaluation cycle: snapshot, decide, apply.
    ///
    /// On `Complete` the baseline is deleted before returning, so a
    /// later `get_or_create` starts a fresh rollout from then-current
    /// values.
    pub async fn cycle(&self) -> EngineResult<Decision> {
        let snapshot = self.snapshots.describe(&self.group).await?;
        let current = Baseline {
            min_size: snapshot.min_size,
            desired_capacity: snapshot.desired_capacity,
        };
        let baseline = self.baselines.get_or_create(&self.group, current).await?;

        let decision = evaluate(&snapshot, &baseline);
        match &decision {
            Decision::Mutate(mutation) => {
                info!(group = %self.group, %mutation, "applying mutation");
                self.apply(mutation).await?;
            }
            Decision::Wait(reason @ WaitReason::CapacityCeiling { .. }) => {
                warn!(group = %self.group, %reason, "capacity safety bound hit");
                warn!(
                    group = %self.group,
                    "review the group's scaling activities for anomalies before resuming"
                );
            }
            Decision::Wait(reason) => {
                info!(group = %self.group, %reason, "no action this cycle");
            }
            Decision::Complete => {
                self.baselines.delete(&self.group).await?;
                info!(group = %self.group, "rollout complete, baseline cleared");
            }
        }
        Ok(decision)
    }

    /// Run cycles until completion, a fatal error, or shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> EngineResult<Outcome> {
        info!(
            group = %self.group,
            interval_secs = self.poll_interval.as_secs(),
            "replacement driver started"
        );

        loop {
            match self.cycle().await {
                Ok(Decision::Complete) => return Ok(Outcome::Completed),
                Ok(decision) => debug!(group = %self.group, %decision, "cycle evaluated"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(group = %self.group, error = %e, "cycle failed, will retry"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    info!(group = %self.group, "driver shutting down");
                    return Ok(Outcome::Cancelled);
                }
            }
        }
    }

    async fn apply(&self, mutation: &Mutation) -> EngineResult<()> {
        match mutation {
            Mutation::RaiseMinSize { min_size } | Mutation::RestoreMinSize { min_size } => {
                self.compute
                    .update_group(
                        &self.group,
                        CapacityUpdate {
                            min_size: Some(*min_size),
                            desired_capacity: None,
                        },
                    )
                    .await?;
            }
            Mutation::RestoreDesiredCapacity { desired_capacity } => {
                self.compute
                    .update_group(
                        &self.group,
                        CapacityUpdate {
                            min_size: None,
                            desired_capacity: Some(*desired_capacity),
                        },
                    )
                    .await?;
            }
            Mutation::TerminateObsolete { instance_ids } => {
                self.terminate_all(instance_ids).await?;
            }
        }
        Ok(())
    }

    /// Issue one terminate call per instance, concurrently. The step
    /// completes only after every call returns; the first failure is
    /// reported once all calls have settled.
    async fn terminate_all(&self, instance_ids: &[String]) -> EngineResult<()> {
        let mut calls = JoinSet::new();
        for id in instance_ids {
            let api = Arc::clone(&self.compute);
            let id = id.clone();
            calls.spawn(async move {
                debug!(instance = %id, "terminating obsolete instance");
                api.terminate_instance(&id, true).await
            });
        }

        let mut first_err: Option<EngineError> = None;
        while let Some(joined) = calls.join_next().await {
            let result: Result<(), ProviderError> =
                joined.map_err(|e| EngineError::Join(e.to_string()))?;
            if let Err(e) = result
                && first_err.is_none()
            {
                first_err = Some(e.into());
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
