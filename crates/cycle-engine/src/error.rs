//! Engine error types.

use thiserror::Error;

use cycle_baseline::BaselineError;
use cycle_provider::ProviderError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by snapshot gathering, decision application, or the
/// baseline store.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("baseline error: {0}")]
    Baseline(#[from] BaselineError),

    #[error("task join error: {0}")]
    Join(String),
}

impl EngineError {
    /// Whether the driver must stop instead of retrying next cycle.
    /// Only baseline corruption qualifies; everything else is transient
    /// and re-evaluated from fresh state on the next poll.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Baseline(BaselineError::Corrupt { .. }))
    }
}
