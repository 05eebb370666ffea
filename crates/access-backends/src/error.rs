//! Error types for backend operations

use crate::backend::{AccessMode, BufferHandle};

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur while driving a device
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Invalid buffer handle
    #[error("invalid buffer handle: {0}")]
    InvalidBufferHandle(BufferHandle),

    /// View extends past the end of its buffer
    #[error("view out of bounds: offset {offset} + len {len} > buffer len {buffer_len}")]
    ViewOutOfBounds { offset: usize, len: usize, buffer_len: usize },

    /// Host slice length does not match the view it is copied through
    #[error("host slice has {actual} elements but view covers {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Operation requires an access mode the view does not grant
    #[error("{operation} requires {required:?} access but view is {granted:?}")]
    AccessModeViolation {
        operation: &'static str,
        required: AccessMode,
        granted: AccessMode,
    },

    /// Invalid launch configuration
    #[error("invalid launch configuration: {0}")]
    InvalidLaunchConfig(String),

    /// The device refused to create an execution context
    #[error("context creation failed: {0}")]
    ContextCreation(String),

    /// Enqueueing or waiting on work failed synchronously
    #[error("submission failed: {0}")]
    Submission(String),

    /// A kernel failed while executing on the device
    #[error("kernel failed: {0}")]
    Kernel(String),

    /// Failures reported asynchronously and collected by the error sink
    #[error("{count} deferred failure(s), first: {first}")]
    Deferred { count: usize, first: Box<BackendError> },

    /// Unsupported operation
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Create a submission error
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Create a kernel error
    pub fn kernel(msg: impl Into<String>) -> Self {
        Self::Kernel(msg.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// True for failures that surfaced through the error sink rather than
    /// from the call that caused them.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}
