//! Device and execution context traits
//!
//! These traits are the whole offload surface the benchmark consumes:
//! enumerate a device, open a context on it, move `i64` data through bounded
//! views, submit kernels asynchronously and block until they finish.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 dyn Device                    │
//! │  - info()            static attributes        │
//! │  - create_context()  one queue + error sink   │
//! └─────────────────────┬────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │            dyn ExecutionContext               │
//! │  allocate ─ copy_in ─ submit ─ wait ─ read    │
//! └─────────────────────┬────────────────────────┘
//!              ┌────────┴────────┐
//!              ▼                 ▼
//!        ┌──────────┐      ┌──────────┐
//!        │   Host   │      │   CUDA   │
//!        │ (rayon)  │      │ (cudarc) │
//!        └──────────┘      └──────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use access_backends::{AccessMode, Device, DeviceView, HostDevice, KernelTask, LaunchConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = HostDevice::cpu();
//! let mut ctx = device.create_context()?;
//!
//! let buffer = ctx.allocate_buffer(32)?;
//! let view = DeviceView::prefix(buffer, AccessMode::ReadWrite, 32);
//! ctx.submit(KernelTask::Identity { view }, LaunchConfig::linear(32, 64))?;
//! ctx.wait()?;
//!
//! let mut out = vec![0i64; 32];
//! ctx.read_back(view.with_mode(AccessMode::Read), &mut out)?;
//! assert_eq!(out[31], 31);
//! # Ok(())
//! # }
//! ```

use super::types::{BufferHandle, DeviceInfo, DeviceView, LaunchConfig};
use crate::error::Result;
use crate::kernel::KernelTask;
use std::fmt;

/// A device that can run offloaded work
///
/// Devices are immutable descriptions plus a factory for execution contexts.
/// They are shared read-only between every case of a benchmark run.
pub trait Device: Send + Sync + fmt::Debug {
    /// Static attributes used for selection
    fn info(&self) -> &DeviceInfo;

    /// Open a new in-order execution context with its own error sink
    fn create_context(&self) -> Result<Box<dyn ExecutionContext>>;
}

/// In-order queue bound to one device
///
/// Buffers hold `i64` elements and are owned by the context; dropping the
/// context releases them after outstanding work has retired.
pub trait ExecutionContext: Send {
    /// Allocate a zero-initialized buffer of `len` elements
    fn allocate_buffer(&mut self, len: usize) -> Result<BufferHandle>;

    /// Free a buffer
    fn free_buffer(&mut self, handle: BufferHandle) -> Result<()>;

    /// Copy `src` host→device into the window of a write-mode view
    ///
    /// Ordered after all previously submitted work. `src.len()` must equal
    /// `view.len`.
    fn copy_in(&mut self, view: DeviceView, src: &[i64]) -> Result<()>;

    /// Enqueue a kernel and return immediately
    ///
    /// Synchronous failures (bad view, bad launch, rejected submission) are
    /// returned directly. Failures raised while the kernel runs land in the
    /// context's error sink and surface from the next [`wait`](Self::wait).
    fn submit(&mut self, task: KernelTask, launch: LaunchConfig) -> Result<()>;

    /// Block until all submitted work has completed, then drain the error
    /// sink
    fn wait(&mut self) -> Result<()>;

    /// Copy the window of a read-mode view device→host into `dst`
    ///
    /// Ordered after all previously submitted work. `dst.len()` must equal
    /// `view.len`.
    fn read_back(&mut self, view: DeviceView, dst: &mut [i64]) -> Result<()>;
}
