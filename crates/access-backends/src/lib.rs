//! Offload API for the buffer-access benchmark
//!
//! This crate provides:
//! - **Device / ExecutionContext traits**: the opaque "submit async work",
//!   "block until complete", "read back a range" capabilities
//! - **Views and launches**: bounded, mode-checked windows over device
//!   buffers and 1-D masked work grids
//! - **Kernels**: the identity assignment kernel and the no-op probe task
//! - **Error sink**: per-context collection of asynchronous failures
//! - **Host device**: rayon-backed reference device with fault injection
//! - **CUDA device**: NVIDIA GPUs through cudarc (feature `cuda`)
//! - **Platform**: ordered device enumeration
//!
//! # Usage
//!
//! ```rust
//! use access_backends::{AccessMode, Device, DeviceView, HostDevice, KernelTask, LaunchConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = HostDevice::cpu();
//! let mut ctx = device.create_context()?;
//! let buffer = ctx.allocate_buffer(8)?;
//!
//! // Only the first four elements are touched.
//! let view = DeviceView::prefix(buffer, AccessMode::ReadWrite, 4);
//! ctx.submit(KernelTask::Identity { view }, LaunchConfig::linear(4, 64))?;
//! ctx.wait()?;
//!
//! let mut out = [0i64; 8];
//! ctx.read_back(DeviceView::prefix(buffer, AccessMode::Read, 8), &mut out)?;
//! assert_eq!(out, [0, 1, 2, 3, 0, 0, 0, 0]);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod backends;
pub mod error;
pub mod kernel;
pub mod platform;
pub mod sink;

// Re-export public API
pub use backend::{
    AccessMode, BackendKind, BufferHandle, Device, DeviceInfo, DeviceKind, DeviceView, ExecutionContext, LaunchConfig,
};
pub use backends::{CudaAccelerator, FaultInjection, HostDevice, HostStats, Trigger};
pub use error::{BackendError, Result};
pub use kernel::{identity_value, KernelTask};
pub use platform::Platform;
pub use sink::ErrorSink;
