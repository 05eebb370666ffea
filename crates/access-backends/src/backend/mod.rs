//! Device and execution context traits plus the types they exchange

mod traits;
mod types;

pub use traits::{Device, ExecutionContext};
pub use types::{AccessMode, BackendKind, BufferHandle, DeviceInfo, DeviceKind, DeviceView, LaunchConfig};
