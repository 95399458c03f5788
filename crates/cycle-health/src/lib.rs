//! Health aggregation across attached load balancers.
//!
//! Each load balancer reports health for the instances registered with
//! it. An instance counts as in service only if every balancer that
//! reports on it says `InService`. The first `OutOfService` sighting
//! wins and is sticky for the cycle, regardless of report order.

pub mod aggregate;

pub use aggregate::{LoadBalancerReport, in_service_set};
