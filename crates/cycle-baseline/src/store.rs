//! The `BaselineStore` contract and its two backends.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use cycle_core::Baseline;
use cycle_provider::{ComputeGroupApi, ObjectStore, Tag};

use crate::error::{BaselineError, BaselineResult};

/// Group tag holding the baseline MinSize.
pub const TAG_MIN_SIZE: &str = "cycle:MinSize";
/// Group tag holding the baseline DesiredCapacity.
pub const TAG_DESIRED_CAPACITY: &str = "cycle:DesiredCapacity";

/// Get-or-create semantics over a persisted capacity baseline.
///
/// Both operations are idempotent. `get_or_create` persists `current`
/// only when no baseline exists yet; an existing baseline is returned
/// unchanged no matter how far the group's live values have drifted.
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn get_or_create(&self, group: &str, current: Baseline) -> BaselineResult<Baseline>;

    /// Remove the baseline. Removing an absent baseline is not an error.
    async fn delete(&self, group: &str) -> BaselineResult<()>;
}

/// Baseline persisted as a pair of tags on the group itself.
///
/// Tag values are JSON-encoded integers. A pair with only one tag
/// present, or a value that does not parse, is treated as corruption
/// rather than silently rebuilt from drifted live values.
pub struct TagStore {
    api: Arc<dyn ComputeGroupApi>,
}

impl TagStore {
    pub fn new(api: Arc<dyn ComputeGroupApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl BaselineStore for TagStore {
    async fn get_or_create(&self, group: &str, current: Baseline) -> BaselineResult<Baseline> {
        let desc = self.api.describe_group(group).await?;
        let min = tag_value(&desc.tags, TAG_MIN_SIZE);
        let desired = tag_value(&desc.tags, TAG_DESIRED_CAPACITY);

        match (min, desired) {
            (Some(min), Some(desired)) => {
                let baseline = Baseline {
                    min_size: parse_tag(group, TAG_MIN_SIZE, min)?,
                    desired_capacity: parse_tag(group, TAG_DESIRED_CAPACITY, desired)?,
                };
                debug!(%group, ?baseline, "existing baseline read from tags");
                Ok(baseline)
            }
            (None, None) => {
                self.api
                    .create_or_update_tags(
                        group,
                        &[
                            Tag::new(TAG_MIN_SIZE, &current.min_size.to_string()),
                            Tag::new(TAG_DESIRED_CAPACITY, &current.desired_capacity.to_string()),
                        ],
                    )
                    .await?;
                info!(
                    %group,
                    min_size = current.min_size,
                    desired_capacity = current.desired_capacity,
                    "baseline captured in group tags"
                );
                Ok(current)
            }
            // One tag survived and the other is gone: the captured
            // baseline is no longer trustworthy.
            _ => Err(BaselineError::corrupt(
                group,
                "one of the two baseline tags is missing",
            )),
        }
    }

    async fn delete(&self, group: &str) -> BaselineResult<()> {
        self.api
            .delete_tags(
                group,
                &[TAG_MIN_SIZE.to_string(), TAG_DESIRED_CAPACITY.to_string()],
            )
            .await?;
        debug!(%group, "baseline tags deleted");
        Ok(())
    }
}

fn tag_value<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter().find(|t| t.key == key).map(|t| t.value.as_str())
}

fn parse_tag(group: &str, key: &str, value: &str) -> BaselineResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| BaselineError::corrupt(group, format!("tag {key} holds {value:?}")))
}

/// Baseline persisted as a JSON record in a blob store, keyed by
/// `baseline/<group>`.
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
}

impl BlobStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    fn key(group: &str) -> String {
        format!("baseline/{group}")
    }
}

#[async_trait]
impl BaselineStore for BlobStore {
    async fn get_or_create(&self, group: &str, current: Baseline) -> BaselineResult<Baseline> {
        let key = Self::key(group);
        match self.store.get(&key).await? {
            Some(bytes) => {
                let baseline: Baseline = serde_json::from_slice(&bytes)
                    .map_err(|e| BaselineError::corrupt(group, e.to_string()))?;
                debug!(%group, ?baseline, "existing baseline read from blob store");
                Ok(baseline)
            }
            None => {
                let bytes = serde_json::to_vec(&current)
                    .map_err(|e| BaselineError::corrupt(group, e.to_string()))?;
                self.store.put(&key, &bytes).await?;
                info!(
                    %group,
                    min_size = current.min_size,
                    desired_capacity = current.desired_capacity,
                    "baseline captured in blob store"
                );
                Ok(current)
            }
        }
    }

    async fn delete(&self, group: &str) -> BaselineResult<()> {
        self.store.delete(&Self::key(group)).await?;
        debug!(%group, "baseline blob deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cycle_provider::{FleetSpec, SimCloud};

    use crate::local::LocalStore;

    fn fleet() -> FleetSpec {
        FleetSpec {
            group: "web".to_string(),
            min_size: 2,
            desired_capacity: 4,
            zones: vec!["zone-a".to_string()],
            launch_config: "lc-1".to_string(),
            load_balancers: vec![],
            instances: vec![],
        }
    }

    fn current() -> Baseline {
        Baseline {
            min_size: 2,
            desired_capacity: 4,
        }
    }

    #[tokio::test]
    async fn tag_store_creates_then_returns_existing() {
        let sim = Arc::new(SimCloud::new(fleet()));
        let store = TagStore::new(sim.clone());

        let created = store.get_or_create("web", current()).await.unwrap();
        assert_eq!(created, current());
        assert_eq!(sim.tag(TAG_MIN_SIZE).await.as_deref(), Some("2"));
        assert_eq!(sim.tag(TAG_DESIRED_CAPACITY).await.as_deref(), Some("4"));

        // Live values have drifted; the stored baseline still wins.
        let drifted = Baseline {
            min_size: 8,
            desired_capacity: 8,
        };
        let read = store.get_or_create("web", drifted).await.unwrap();
        assert_eq!(read, current());
    }

    #[tokio::test]
    async fn tag_store_delete_is_idempotent() {
        let sim = Arc::new(SimCloud::new(fleet()));
        let store = TagStore::new(sim.clone());

        store.get_or_create("web", current()).await.unwrap();
        store.delete("web").await.unwrap();
        assert_eq!(sim.tag(TAG_MIN_SIZE).await, None);
        store.delete("web").await.unwrap();
    }

    #[tokio::test]
    async fn tag_store_unparseable_value_is_corrupt() {
        let sim = Arc::new(SimCloud::new(fleet()));
        sim.create_or_update_tags(
            "web",
            &[
                Tag::new(TAG_MIN_SIZE, "two"),
                Tag::new(TAG_DESIRED_CAPACITY, "4"),
            ],
        )
        .await
        .unwrap();

        let store = TagStore::new(sim);
        let err = store.get_or_create("web", current()).await.unwrap_err();
        assert!(matches!(err, BaselineError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn tag_store_partial_pair_is_corrupt() {
        let sim = Arc::new(SimCloud::new(fleet()));
        sim.create_or_update_tags("web", &[Tag::new(TAG_MIN_SIZE, "2")])
            .await
            .unwrap();

        let store = TagStore::new(sim);
        let err = store.get_or_create("web", current()).await.unwrap_err();
        assert!(matches!(err, BaselineError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn blob_store_creates_then_returns_existing() {
        let local = Arc::new(LocalStore::open_in_memory().unwrap());
        let store = BlobStore::new(local.clone());

        let created = store.get_or_create("web", current()).await.unwrap();
        assert_eq!(created, current());

        let drifted = Baseline {
            min_size: 8,
            desired_capacity: 8,
        };
        let read = store.get_or_create("web", drifted).await.unwrap();
        assert_eq!(read, current());
    }

    #[tokio::test]
    async fn blob_store_delete_then_recreate_snapshots_new_values() {
        let local = Arc::new(LocalStore::open_in_memory().unwrap());
        let store = BlobStore::new(local);

        store.get_or_create("web", current()).await.unwrap();
        store.delete("web").await.unwrap();
        store.delete("web").await.unwrap();

        // A later rollout captures then-current values afresh.
        let next = Baseline {
            min_size: 3,
            desired_capacity: 6,
        };
        let read = store.get_or_create("web", next).await.unwrap();
        assert_eq!(read, next);
    }

    #[tokio::test]
    async fn blob_store_unparseable_body_is_corrupt() {
        let local = Arc::new(LocalStore::open_in_memory().unwrap());
        local.put("baseline/web", b"not json").await.unwrap();

        let store = BlobStore::new(local);
        let err = store.get_or_create("web", current()).await.unwrap_err();
        assert!(matches!(err, BaselineError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn baselines_are_scoped_per_group() {
        let local = Arc::new(LocalStore::open_in_memory().unwrap());
        let store = BlobStore::new(local);

        let a = Baseline {
            min_size: 1,
            desired_capacity: 2,
        };
        let b = Baseline {
            min_size: 3,
            desired_capacity: 6,
        };
        store.get_or_create("alpha", a).await.unwrap();
        store.get_or_create("beta", b).await.unwrap();

        assert_eq!(store.get_or_create("alpha", b).await.unwrap(), a);
        assert_eq!(store.get_or_create("beta", a).await.unwrap(), b);
    }
}
