//! External collaborator interfaces.
//!
//! The decision engine never talks to a cloud SDK directly; it consumes
//! the traits defined here. Real bindings live outside this workspace.
//! The `sim` module provides an in-process implementation used for tests
//! and for rehearsal runs (`groupcycle run --fleet`).

pub mod api;
pub mod error;
pub mod sim;

pub use api::{CapacityUpdate, ComputeGroupApi, GroupDescription, LoadBalancerApi, ObjectStore, Tag};
pub use error::{ProviderError, ProviderResult};
pub use sim::{FleetSpec, SimCloud};
