//! Baseline store error types.

use thiserror::Error;

use cycle_provider::ProviderError;

/// Result type alias for baseline store operations.
pub type BaselineResult<T> = Result<T, BaselineError>;

/// Errors that can occur while reading or writing a baseline.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// A persisted baseline exists but cannot be read back as capacity
    /// values. Fatal: the engine must not operate on fabricated targets.
    #[error("corrupt baseline for group {group}: {detail}")]
    Corrupt { group: String, detail: String },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl BaselineError {
    pub fn corrupt(group: &str, detail: impl Into<String>) -> Self {
        BaselineError::Corrupt {
            group: group.to_string(),
            detail: detail.into(),
        }
    }
}
