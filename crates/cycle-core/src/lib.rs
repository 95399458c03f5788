//! Shared types and configuration for groupcycle.
//!
//! Everything here is plain data: the typed view of a compute group that
//! the decision engine operates on, the persisted capacity baseline, and
//! the `groupcycle.toml` configuration layer.

pub mod config;
pub mod types;

pub use config::CycleConfig;
pub use types::*;
