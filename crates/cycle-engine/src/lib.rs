//! The replacement decision engine and its driver.
//!
//! Each evaluation cycle builds a fresh [`GroupSnapshot`] from the
//! compute and load-balancer APIs, classifies every instance against
//! the active launch configuration, and derives exactly one decision:
//! a single mutation to issue, a wait, or completion. The engine keeps
//! no state between cycles, so the process can be killed and restarted
//! at any point and pick up where the group actually is.
//!
//! # Components
//!
//! - **`classify`** — per-instance lifecycle/obsolescence categories
//! - **`snapshot`** — one cycle's authoritative group view
//! - **`engine`** — the ordered decision rules and safety bounds
//! - **`driver`** — the poll loop that applies decisions until done
//!
//! [`GroupSnapshot`]: cycle_core::GroupSnapshot

pub mod classify;
pub mod driver;
pub mod engine;
pub mod error;
pub mod snapshot;

pub use classify::classify;
pub use driver::{Driver, Outcome};
pub use engine::{Decision, Mutation, WaitReason, ZoneComplaint, evaluate};
pub use error::{EngineError, EngineResult};
pub use snapshot::SnapshotBuilder;
