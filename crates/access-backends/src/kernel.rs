//! Kernels understood by every device
//!
//! Kernels are described as data rather than code so each backend can lower
//! them to whatever it executes natively (a rayon loop on the host, NVRTC
//! compiled PTX on CUDA).

use crate::backend::{AccessMode, DeviceView};
use crate::error::Result;
use std::fmt;

/// Work that can be submitted to an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelTask {
    /// Single task with no body. Used to probe whether a device can run
    /// offloaded work at all.
    Noop,
    /// Writes each element's absolute index into it:
    /// `buffer[view.offset + gid] = view.offset + gid` for every live
    /// work-item `gid`.
    Identity { view: DeviceView },
}

impl KernelTask {
    pub const fn name(&self) -> &'static str {
        match self {
            KernelTask::Noop => "noop",
            KernelTask::Identity { .. } => "identity",
        }
    }

    /// View the kernel touches, if any
    pub const fn view(&self) -> Option<&DeviceView> {
        match self {
            KernelTask::Noop => None,
            KernelTask::Identity { view } => Some(view),
        }
    }

    /// Check the view grants what the kernel needs
    pub fn check_access(&self) -> Result<()> {
        match self {
            KernelTask::Noop => Ok(()),
            KernelTask::Identity { view } => view.require(AccessMode::ReadWrite, "identity"),
        }
    }
}

impl fmt::Display for KernelTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelTask::Noop => write!(f, "noop"),
            KernelTask::Identity { view } => write!(f, "identity({view})"),
        }
    }
}

/// Value the identity kernel stores at absolute element `index`
#[inline]
pub const fn identity_value(index: usize) -> i64 {
    index as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BufferHandle;

    #[test]
    fn identity_requires_read_write_view() {
        let buf = BufferHandle::new(3);
        let rw = KernelTask::Identity {
            view: DeviceView::prefix(buf, AccessMode::ReadWrite, 8),
        };
        assert!(rw.check_access().is_ok());
        assert_eq!(rw.name(), "identity");
        assert_eq!(rw.to_string(), "identity(buf3[0..8] ReadWrite)");

        let ro = KernelTask::Identity {
            view: DeviceView::prefix(buf, AccessMode::Read, 8),
        };
        assert!(ro.check_access().is_err());
    }

    #[test]
    fn noop_has_no_view() {
        assert!(KernelTask::Noop.view().is_none());
        assert!(KernelTask::Noop.check_access().is_ok());
        assert_eq!(identity_value(31), 31);
    }
}
