//! Provider error types.

use thiserror::Error;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by the external collaborator APIs.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("load balancer not found: {0}")]
    LoadBalancerNotFound(String),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("api call failed: {0}")]
    Api(String),

    #[error("blob store error: {0}")]
    Store(String),
}
