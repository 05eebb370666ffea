//! Fault injection for the host device
//!
//! Lets tests and emulated devices fail in each of the ways a real runtime
//! can: refuse a context, reject a submission, report an asynchronous error,
//! or silently lose a write.

/// When an injected fault fires, keyed by the device-wide submission ordinal
/// (0-based, counting every kernel submitted to the device).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Trigger {
    #[default]
    Never,
    Always,
    On(Vec<u64>),
}

impl Trigger {
    pub fn fires(&self, ordinal: u64) -> bool {
        match self {
            Trigger::Never => false,
            Trigger::Always => true,
            Trigger::On(ordinals) => ordinals.contains(&ordinal),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultInjection {
    /// `create_context` fails
    pub context_creation: bool,
    /// `submit` returns a synchronous error
    pub submission: Trigger,
    /// The kernel runs, then reports an error into the sink
    pub deferred: Trigger,
    /// The identity kernel leaves this absolute index untouched
    pub skip_write: Option<usize>,
}

impl FaultInjection {
    pub fn none() -> Self {
        Self::default()
    }

    /// Every submission is rejected synchronously
    pub fn rejecting() -> Self {
        Self {
            submission: Trigger::Always,
            ..Self::default()
        }
    }

    /// Every submission reports an asynchronous failure
    pub fn deferred_always() -> Self {
        Self {
            deferred: Trigger::Always,
            ..Self::default()
        }
    }

    /// Every identity kernel leaves `index` untouched
    pub fn lossy(index: usize) -> Self {
        Self {
            skip_write: Some(index),
            ..Self::default()
        }
    }

    pub fn is_none(&self) -> bool {
        self == &Self::none()
    }
}
