//! Error types for the benchmark harness

use crate::config::ConfigError;
use crate::selector::DeviceCategory;
use access_backends::BackendError;

/// Result type for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// No enumerated device qualifies for the category. Fatal.
    #[error("{}", category.unavailable_message())]
    DeviceUnavailable { category: DeviceCategory },

    /// Enqueueing work or waiting on it failed synchronously
    #[error("submission failure: {0}")]
    Submission(BackendError),

    /// Deferred failures surfaced while draining the error sink
    #[error("asynchronous failure: {0}")]
    Asynchronous(BackendError),

    /// First element whose value is not its own index
    #[error("validation failed at index {index}: expected {expected}, observed {observed}")]
    Validation { index: usize, expected: i64, observed: i64 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("accessed extent {extent} exceeds backing store of {store} elements")]
    ExtentExceedsStore { extent: usize, store: usize },

    #[error("report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

impl BenchError {
    /// Failures that discard only the current repetition
    pub fn is_repetition_failure(&self) -> bool {
        matches!(self, BenchError::Submission(_) | BenchError::Asynchronous(_))
    }
}

impl From<BackendError> for BenchError {
    fn from(err: BackendError) -> Self {
        if err.is_deferred() {
            BenchError::Asynchronous(err)
        } else {
            BenchError::Submission(err)
        }
    }
}
