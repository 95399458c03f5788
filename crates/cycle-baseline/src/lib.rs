//! Baseline persistence for groupcycle.
//!
//! A baseline is the group's (MinSize, DesiredCapacity) pair as it stood
//! before the rollout began. It is created exactly once per rollout,
//! read every cycle, and deleted exactly once on completion. Two
//! backends expose the same `BaselineStore` contract: tag pairs on the
//! group itself, or a record in a blob store.

pub mod error;
pub mod local;
pub mod store;

pub use error::{BaselineError, BaselineResult};
pub use local::LocalStore;
pub use store::{BaselineStore, BlobStore, TagStore, TAG_DESIRED_CAPACITY, TAG_MIN_SIZE};
