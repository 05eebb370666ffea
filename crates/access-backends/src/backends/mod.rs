//! Device implementations
//!
//! - `host` - host memory + rayon, always available; also used for emulated devices
//! - `cuda` - NVIDIA GPUs through cudarc (feature `cuda`)

pub mod cuda;
pub mod host;

pub use cuda::CudaAccelerator;
pub use host::{FaultInjection, HostDevice, HostStats, Trigger};
