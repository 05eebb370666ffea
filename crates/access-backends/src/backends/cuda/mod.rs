//! CUDA device implementation for NVIDIA GPUs
//!
//! Each execution context owns a handle to the device's primary context, the
//! buffers it allocated and the NVRTC-compiled kernels. Launches go to the
//! default stream, so copies and kernels are ordered with each other and
//! `wait` is a device synchronize followed by a sink drain.
//!
//! # Usage
//!
//! ```rust,ignore
//! use access_backends::{CudaAccelerator, Device};
//!
//! for device in CudaAccelerator::enumerate() {
//!     println!("{}", device.info());
//! }
//! ```

use crate::backend::Device;
use std::sync::Arc;

#[cfg(feature = "cuda")]
use crate::backend::{
    AccessMode, BackendKind, BufferHandle, DeviceInfo, DeviceKind, DeviceView, ExecutionContext, LaunchConfig,
};
#[cfg(feature = "cuda")]
use crate::error::{BackendError, Result};
#[cfg(feature = "cuda")]
use crate::kernel::KernelTask;
#[cfg(feature = "cuda")]
use crate::sink::ErrorSink;
#[cfg(feature = "cuda")]
use std::collections::HashMap;

#[cfg(feature = "cuda")]
use cudarc::driver::{sys, CudaDevice, CudaFunction, CudaSlice, LaunchAsync, LaunchConfig as CudaLaunchConfig};

#[cfg(feature = "cuda")]
const MODULE_NAME: &str = "access_kernels";

#[cfg(feature = "cuda")]
const KERNEL_SOURCE: &str = r#"
extern "C" __global__ void access_noop(int unused) {}

extern "C" __global__ void access_identity(long long *data, unsigned long long offset, unsigned long long count) {
    unsigned long long gid = (unsigned long long)blockIdx.x * blockDim.x + threadIdx.x;
    if (gid < count) {
        data[offset + gid] = (long long)(offset + gid);
    }
}
"#;

/// A CUDA device, described but not yet opened
#[cfg(feature = "cuda")]
#[derive(Debug)]
pub struct CudaAccelerator {
    ordinal: usize,
    info: DeviceInfo,
}

#[cfg(feature = "cuda")]
impl CudaAccelerator {
    /// Describe device `ordinal`
    ///
    /// The unified-memory flag comes from `CU_DEVICE_ATTRIBUTE_INTEGRATED`.
    pub fn new(ordinal: usize) -> Result<Self> {
        let device = CudaDevice::new(ordinal)
            .map_err(|e| BackendError::ContextCreation(format!("CUDA device {ordinal} unavailable: {e}")))?;
        let name = device
            .name()
            .map_err(|e| BackendError::Other(format!("CUDA device {ordinal} name query failed: {e}")))?;
        let integrated = device
            .attribute(sys::CUdevice_attribute::CU_DEVICE_ATTRIBUTE_INTEGRATED)
            .map_err(|e| BackendError::Other(format!("CUDA device {ordinal} attribute query failed: {e}")))?;

        Ok(Self {
            ordinal,
            info: DeviceInfo {
                name,
                vendor: "NVIDIA".to_string(),
                kind: DeviceKind::Gpu,
                host_unified_memory: integrated != 0,
                backend: BackendKind::Cuda,
            },
        })
    }

    /// Every CUDA device the driver reports, in driver order
    pub fn enumerate() -> Vec<Arc<dyn Device>> {
        let count = match CudaDevice::count() {
            Ok(count) => count.max(0) as usize,
            Err(e) => {
                tracing::debug!(error = %e, "cuda_driver_unavailable");
                return Vec::new();
            }
        };

        (0..count)
            .filter_map(|ordinal| match Self::new(ordinal) {
                Ok(device) => Some(Arc::new(device) as Arc<dyn Device>),
                Err(e) => {
                    tracing::debug!(ordinal, error = %e, "cuda_device_skipped");
                    None
                }
            })
            .collect()
    }
}

#[cfg(feature = "cuda")]
impl Device for CudaAccelerator {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn create_context(&self) -> Result<Box<dyn ExecutionContext>> {
        let device = CudaDevice::new(self.ordinal)
            .map_err(|e| BackendError::ContextCreation(format!("{}: {e}", self.info.name)))?;

        let ptx = cudarc::nvrtc::compile_ptx(KERNEL_SOURCE)
            .map_err(|e| BackendError::ContextCreation(format!("kernel compilation failed: {e}")))?;
        device
            .load_ptx(ptx, MODULE_NAME, &["access_noop", "access_identity"])
            .map_err(|e| BackendError::ContextCreation(format!("module load failed: {e}")))?;

        let noop = device
            .get_func(MODULE_NAME, "access_noop")
            .ok_or_else(|| BackendError::ContextCreation("access_noop missing from module".into()))?;
        let identity = device
            .get_func(MODULE_NAME, "access_identity")
            .ok_or_else(|| BackendError::ContextCreation("access_identity missing from module".into()))?;

        tracing::debug!(device = %self.info.name, ordinal = self.ordinal, "cuda_context_created");
        Ok(Box::new(CudaQueue {
            device,
            buffers: HashMap::new(),
            next_buffer_id: 1,
            sink: ErrorSink::new(),
            noop,
            identity,
        }))
    }
}

/// Execution context over one CUDA device
#[cfg(feature = "cuda")]
pub struct CudaQueue {
    device: Arc<CudaDevice>,
    buffers: HashMap<u64, CudaSlice<i64>>,
    next_buffer_id: u64,
    sink: ErrorSink,
    noop: CudaFunction,
    identity: CudaFunction,
}

#[cfg(feature = "cuda")]
impl CudaQueue {
    fn buffer(&self, handle: BufferHandle) -> Result<&CudaSlice<i64>> {
        self.buffers
            .get(&handle.id())
            .ok_or(BackendError::InvalidBufferHandle(handle))
    }

    fn buffer_mut(&mut self, handle: BufferHandle) -> Result<&mut CudaSlice<i64>> {
        self.buffers
            .get_mut(&handle.id())
            .ok_or(BackendError::InvalidBufferHandle(handle))
    }
}

#[cfg(feature = "cuda")]
fn to_cuda_launch(launch: LaunchConfig) -> Result<CudaLaunchConfig> {
    let groups = u32::try_from(launch.num_groups())
        .map_err(|_| BackendError::InvalidLaunchConfig(format!("{launch} exceeds the CUDA grid limit")))?;
    let group = u32::try_from(launch.group_size)
        .map_err(|_| BackendError::InvalidLaunchConfig(format!("{launch} exceeds the CUDA block limit")))?;
    Ok(CudaLaunchConfig {
        grid_dim: (groups, 1, 1),
        block_dim: (group, 1, 1),
        shared_mem_bytes: 0,
    })
}

#[cfg(feature = "cuda")]
impl ExecutionContext for CudaQueue {
    fn allocate_buffer(&mut self, len: usize) -> Result<BufferHandle> {
        let slice = self
            .device
            .alloc_zeros::<i64>(len)
            .map_err(|e| BackendError::Other(format!("CUDA buffer allocation failed: {e}")))?;

        let handle = BufferHandle::new(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.buffers.insert(handle.id(), slice);
        Ok(handle)
    }

    fn free_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        self.buffers
            .remove(&handle.id())
            .map(drop)
            .ok_or(BackendError::InvalidBufferHandle(handle))
    }

    fn copy_in(&mut self, view: DeviceView, src: &[i64]) -> Result<()> {
        view.require(AccessMode::Write, "copy_in")?;
        if src.len() != view.len {
            return Err(BackendError::LengthMismatch {
                expected: view.len,
                actual: src.len(),
            });
        }
        let device = Arc::clone(&self.device);
        let buffer = self.buffer_mut(view.buffer)?;
        view.check_bounds(buffer.len())?;
        let mut window = buffer.slice_mut(view.range());
        device
            .htod_sync_copy_into(src, &mut window)
            .map_err(|e| BackendError::submission(format!("host to device copy failed: {e}")))
    }

    fn submit(&mut self, task: KernelTask, launch: LaunchConfig) -> Result<()> {
        task.check_access()?;
        launch.validate()?;
        let cfg = to_cuda_launch(launch)?;

        let launched = match task {
            KernelTask::Noop => {
                let func = self.noop.clone();
                unsafe { func.launch(cfg, (0i32,)) }
            }
            KernelTask::Identity { view } => {
                if launch.global_size > view.len {
                    return Err(BackendError::InvalidLaunchConfig(format!(
                        "{} work-items exceed view of {} elements",
                        launch.global_size, view.len
                    )));
                }
                let func = self.identity.clone();
                let buffer = self.buffer_mut(view.buffer)?;
                view.check_bounds(buffer.len())?;
                unsafe { func.launch(cfg, (buffer, view.offset as u64, launch.global_size as u64)) }
            }
        };

        launched.map_err(|e| BackendError::submission(format!("kernel launch failed: {e}")))?;
        tracing::debug!(task = %task, launch = %launch, "kernel_submitted");
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        if let Err(e) = self.device.synchronize() {
            self.sink.report(BackendError::kernel(e.to_string()));
        }
        self.sink.drain()
    }

    fn read_back(&mut self, view: DeviceView, dst: &mut [i64]) -> Result<()> {
        view.require(AccessMode::Read, "read_back")?;
        if dst.len() != view.len {
            return Err(BackendError::LengthMismatch {
                expected: view.len,
                actual: dst.len(),
            });
        }
        let buffer = self.buffer(view.buffer)?;
        view.check_bounds(buffer.len())?;
        let window = buffer.slice(view.range());
        self.device
            .dtoh_sync_copy_into(&window, dst)
            .map_err(|e| BackendError::submission(format!("device to host copy failed: {e}")))
    }
}

// Stub implementation when CUDA feature is not enabled
#[cfg(not(feature = "cuda"))]
#[derive(Debug)]
pub struct CudaAccelerator;

#[cfg(not(feature = "cuda"))]
impl CudaAccelerator {
    pub fn enumerate() -> Vec<Arc<dyn Device>> {
        Vec::new()
    }
}

#[cfg(test)]
#[cfg(not(feature = "cuda"))]
mod stub_tests {
    use super::*;

    #[test]
    fn test_stub_reports_nothing() {
        assert!(CudaAccelerator::enumerate().is_empty());
    }
}

#[cfg(test)]
#[cfg(feature = "cuda")]
mod tests {
    use super::*;

    #[test]
    fn test_cuda_enumeration_reports_gpus() {
        // May or may not find hardware
        for device in CudaAccelerator::enumerate() {
            assert_eq!(device.info().kind, DeviceKind::Gpu);
        }
    }

    #[test]
    fn test_cuda_identity_subrange() {
        if CudaAccelerator::enumerate().is_empty() {
            return;
        }
        let device = CudaAccelerator::new(0).unwrap();
        assert_eq!(device.info().kind, DeviceKind::Gpu);
        let mut ctx = device.create_context().unwrap();

        let buf = ctx.allocate_buffer(256).unwrap();
        let view = DeviceView::prefix(buf, AccessMode::ReadWrite, 100);
        ctx.submit(KernelTask::Identity { view }, LaunchConfig::linear(100, 64))
            .unwrap();
        ctx.wait().unwrap();

        let mut out = vec![-1i64; 256];
        ctx.read_back(DeviceView::prefix(buf, AccessMode::Read, 256), &mut out)
            .unwrap();
        assert!(out[..100].iter().enumerate().all(|(i, &v)| v == i as i64));
        assert!(out[100..].iter().all(|&v| v == 0));
    }
}
