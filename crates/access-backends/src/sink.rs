//! Per-context collector for asynchronous failures

use crate::error::{BackendError, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Accumulates failures raised by work that already left the submitting
/// call. Cloning shares the same list, so workers can report into the sink
/// of the context that spawned them.
///
/// The list is drained and cleared at every blocking wait.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    errors: Arc<Mutex<Vec<BackendError>>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, error: BackendError) {
        tracing::debug!(error = %error, "deferred_failure_reported");
        self.errors.lock().push(error);
    }

    pub fn pending(&self) -> usize {
        self.errors.lock().len()
    }

    /// Take every recorded failure and clear the list.
    ///
    /// Returns [`BackendError::Deferred`] carrying the count and the first
    /// failure when anything was recorded.
    pub fn drain(&self) -> Result<()> {
        let drained = std::mem::take(&mut *self.errors.lock());
        let count = drained.len();
        match drained.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(BackendError::Deferred {
                count,
                first: Box::new(first),
            }),
        }
    }
}
