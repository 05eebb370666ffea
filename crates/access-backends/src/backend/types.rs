//! Types for buffers, views, launches and device descriptions

use crate::error::{BackendError, Result};
use std::fmt;
use std::ops::Range;

/// Handle to an allocated device buffer
///
/// Buffers are opaque handles owned by the execution context that allocated
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

impl BufferHandle {
    /// Create a new buffer handle
    pub const fn new(id: u64) -> Self {
        BufferHandle(id)
    }

    /// Get the internal ID
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf{}", self.0)
    }
}

/// Declared access mode of a device view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub const fn allows_read(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    pub const fn allows_write(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

/// Bounded window over a device buffer.
///
/// Views are cheap values built for a single submission or transfer. The
/// context checks them against the buffer they name before touching memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceView {
    pub buffer: BufferHandle,
    pub mode: AccessMode,
    /// First element covered by the view
    pub offset: usize,
    /// Number of elements covered by the view
    pub len: usize,
}

impl DeviceView {
    pub const fn new(buffer: BufferHandle, mode: AccessMode, offset: usize, len: usize) -> Self {
        Self {
            buffer,
            mode,
            offset,
            len,
        }
    }

    /// View over the first `len` elements of `buffer`
    pub const fn prefix(buffer: BufferHandle, mode: AccessMode, len: usize) -> Self {
        Self::new(buffer, mode, 0, len)
    }

    /// Same window with a different access mode
    pub const fn with_mode(self, mode: AccessMode) -> Self {
        Self { mode, ..self }
    }

    /// One past the last element covered by the view
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Check the view fits inside a buffer of `buffer_len` elements
    pub fn check_bounds(&self, buffer_len: usize) -> Result<()> {
        match self.offset.checked_add(self.len) {
            Some(end) if end <= buffer_len => Ok(()),
            _ => Err(BackendError::ViewOutOfBounds {
                offset: self.offset,
                len: self.len,
                buffer_len,
            }),
        }
    }

    /// Check the view grants the access `operation` needs
    pub fn require(&self, required: AccessMode, operation: &'static str) -> Result<()> {
        let granted = self.mode;
        let ok = (!required.allows_read() || granted.allows_read()) && (!required.allows_write() || granted.allows_write());
        if ok {
            Ok(())
        } else {
            Err(BackendError::AccessModeViolation {
                operation,
                required,
                granted,
            })
        }
    }
}

impl fmt::Display for DeviceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{}] {:?}", self.buffer, self.offset, self.end(), self.mode)
    }
}

/// One-dimensional launch configuration
///
/// `global_size` is the number of live work-items. The grid is padded to a
/// whole number of groups and the padding lanes are masked off, so the work
/// actually performed always matches `global_size` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    pub global_size: usize,
    pub group_size: usize,
}

impl LaunchConfig {
    /// Create simple 1D launch configuration
    pub const fn linear(global_size: usize, group_size: usize) -> Self {
        Self {
            global_size,
            group_size,
        }
    }

    /// A single work-item, used for single tasks
    pub const fn single() -> Self {
        Self::linear(1, 1)
    }

    /// Number of work-groups in the padded grid
    pub const fn num_groups(&self) -> usize {
        if self.group_size == 0 {
            0
        } else {
            self.global_size.div_ceil(self.group_size)
        }
    }

    /// Total lanes launched, including masked padding lanes
    pub const fn padded_size(&self) -> usize {
        self.num_groups() * self.group_size
    }

    pub fn validate(&self) -> Result<()> {
        if self.group_size == 0 {
            return Err(BackendError::InvalidLaunchConfig("group size must be non-zero".into()));
        }
        if self.global_size == 0 {
            return Err(BackendError::InvalidLaunchConfig("global size must be non-zero".into()));
        }
        Ok(())
    }
}

impl fmt::Display for LaunchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "global={}, group={}, groups={}",
            self.global_size,
            self.group_size,
            self.num_groups()
        )
    }
}

/// Coarse device class reported by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Gpu,
    Cpu,
    Accelerator,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Gpu => write!(f, "gpu"),
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Accelerator => write!(f, "accelerator"),
        }
    }
}

/// Runtime that drives a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Host,
    Cuda,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Host => write!(f, "host"),
            BackendKind::Cuda => write!(f, "cuda"),
        }
    }
}

/// Static description of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub kind: DeviceKind,
    /// True when the device shares physical memory with the host
    pub host_unified_memory: bool,
    pub backend: BackendKind,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} via {}", self.name, self.vendor, self.kind, self.backend)?;
        if self.host_unified_memory {
            write!(f, ", unified memory")?;
        }
        write!(f, ")")
    }
}

// ================================================================================================
// Tests
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_handle() {
        let handle = BufferHandle::new(42);
        assert_eq!(handle.id(), 42);
        assert_eq!(handle.to_string(), "buf42");
    }

    #[test]
    fn test_access_mode() {
        assert!(AccessMode::Read.allows_read());
        assert!(!AccessMode::Read.allows_write());
        assert!(AccessMode::Write.allows_write());
        assert!(!AccessMode::Write.allows_read());
        assert!(AccessMode::ReadWrite.allows_read() && AccessMode::ReadWrite.allows_write());
    }

    #[test]
    fn test_view_bounds() {
        let buf = BufferHandle::new(1);
        let view = DeviceView::new(buf, AccessMode::ReadWrite, 8, 24);
        assert_eq!(view.end(), 32);
        assert_eq!(view.range(), 8..32);
        assert!(view.check_bounds(32).is_ok());
        assert_eq!(
            view.check_bounds(31),
            Err(BackendError::ViewOutOfBounds {
                offset: 8,
                len: 24,
                buffer_len: 31
            })
        );

        let overflowing = DeviceView::new(buf, AccessMode::Read, usize::MAX, 2);
        assert!(overflowing.check_bounds(usize::MAX).is_err());
    }

    #[test]
    fn test_view_mode_requirements() {
        let view = DeviceView::prefix(BufferHandle::new(1), AccessMode::Write, 4);
        assert!(view.require(AccessMode::Write, "copy_in").is_ok());
        assert!(view.require(AccessMode::Read, "read_back").is_err());
        assert!(view.require(AccessMode::ReadWrite, "identity").is_err());
        assert!(view
            .with_mode(AccessMode::ReadWrite)
            .require(AccessMode::ReadWrite, "identity")
            .is_ok());
    }

    #[test]
    fn test_launch_config() {
        let linear = LaunchConfig::linear(1000, 256);
        assert_eq!(linear.num_groups(), 4); // ceil(1000 / 256)
        assert_eq!(linear.padded_size(), 1024);
        assert!(linear.validate().is_ok());

        // Smaller than one group still launches exactly the requested lanes.
        let small = LaunchConfig::linear(32, 64);
        assert_eq!(small.num_groups(), 1);
        assert_eq!(small.global_size, 32);

        assert_eq!(LaunchConfig::single().num_groups(), 1);
        assert!(LaunchConfig::linear(16, 0).validate().is_err());
        assert!(LaunchConfig::linear(0, 64).validate().is_err());
        assert_eq!(LaunchConfig::linear(16, 0).num_groups(), 0);
    }

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo {
            name: "iGPU".into(),
            vendor: "acme".into(),
            kind: DeviceKind::Gpu,
            host_unified_memory: true,
            backend: BackendKind::Host,
        };
        assert_eq!(info.to_string(), "iGPU (acme, gpu via host, unified memory)");
    }
}
