//! Host device implementation
//!
//! Runs kernels on the rayon thread pool behind an in-order queue, so it
//! behaves like an asynchronous accelerator: `submit` returns at once and
//! `wait` is the only point where completion and deferred failures are
//! observed.
//!
//! # Architecture
//!
//! ```text
//! HostDevice
//! ├── DeviceInfo      - reported name / kind / unified-memory flag
//! ├── FaultInjection  - optional injected failures
//! └── HostCounters    - device-wide transfer and kernel counters
//!
//! HostContext (one per create_context)
//! ├── MemoryManager   - i64 buffers behind a RwLock
//! ├── ErrorSink       - deferred failures
//! └── queue tail      - each job joins its predecessor before running
//! ```
//!
//! Besides standing in for the CPU itself, a host device can be configured
//! to report itself as an integrated or dedicated GPU. The platform uses this
//! for emulated devices and the tests use it to build deterministic device
//! sets.

mod fault;
pub(crate) mod memory;

pub use fault::{FaultInjection, Trigger};

use crate::backend::{
    AccessMode, BackendKind, BufferHandle, Device, DeviceInfo, DeviceKind, DeviceView, ExecutionContext, LaunchConfig,
};
use crate::error::{BackendError, Result};
use crate::kernel::{identity_value, KernelTask};
use crate::sink::ErrorSink;
use access_tracing::performance::{record_throughput, record_transfer, TransferDirection};
use memory::MemoryManager;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Device-wide counters shared by every context of a host device
#[derive(Debug, Default)]
pub struct HostCounters {
    submissions: AtomicU64,
    bytes_to_device: AtomicU64,
    bytes_from_device: AtomicU64,
    kernels_completed: AtomicU64,
    elements_written: AtomicU64,
    buffers_allocated: AtomicU64,
    buffers_freed: AtomicU64,
}

/// Point-in-time copy of [`HostCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub submissions: u64,
    pub bytes_to_device: u64,
    pub bytes_from_device: u64,
    pub kernels_completed: u64,
    pub elements_written: u64,
    pub buffers_allocated: u64,
    pub buffers_freed: u64,
}

impl HostCounters {
    fn snapshot(&self) -> HostStats {
        HostStats {
            submissions: self.submissions.load(Ordering::Relaxed),
            bytes_to_device: self.bytes_to_device.load(Ordering::Relaxed),
            bytes_from_device: self.bytes_from_device.load(Ordering::Relaxed),
            kernels_completed: self.kernels_completed.load(Ordering::Relaxed),
            elements_written: self.elements_written.load(Ordering::Relaxed),
            buffers_allocated: self.buffers_allocated.load(Ordering::Relaxed),
            buffers_freed: self.buffers_freed.load(Ordering::Relaxed),
        }
    }
}

/// Device backed by host memory and the rayon pool
#[derive(Debug, Clone)]
pub struct HostDevice {
    info: DeviceInfo,
    faults: FaultInjection,
    counters: Arc<HostCounters>,
}

impl HostDevice {
    /// The host CPU, reported as a CPU sharing memory with itself
    pub fn cpu() -> Self {
        let info = DeviceInfo {
            name: format!("host cpu ({} threads)", rayon::current_num_threads()),
            vendor: "host".to_string(),
            kind: DeviceKind::Cpu,
            host_unified_memory: true,
            backend: BackendKind::Host,
        };
        Self::from_info(info)
    }

    /// A host device that reports arbitrary attributes
    ///
    /// # Example
    ///
    /// ```rust
    /// use access_backends::{Device, DeviceKind, HostDevice};
    ///
    /// let igpu = HostDevice::emulated("emulated integrated gpu", DeviceKind::Gpu, true);
    /// assert!(igpu.info().host_unified_memory);
    /// ```
    pub fn emulated(name: impl Into<String>, kind: DeviceKind, host_unified_memory: bool) -> Self {
        let info = DeviceInfo {
            name: name.into(),
            vendor: "emulated".to_string(),
            kind,
            host_unified_memory,
            backend: BackendKind::Host,
        };
        Self::from_info(info)
    }

    fn from_info(info: DeviceInfo) -> Self {
        Self {
            info,
            faults: FaultInjection::none(),
            counters: Arc::new(HostCounters::default()),
        }
    }

    /// Attach injected faults
    pub fn with_faults(mut self, faults: FaultInjection) -> Self {
        self.faults = faults;
        self
    }

    pub fn faults(&self) -> &FaultInjection {
        &self.faults
    }

    /// Snapshot of the device-wide counters
    pub fn stats(&self) -> HostStats {
        self.counters.snapshot()
    }
}

impl Device for HostDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn create_context(&self) -> Result<Box<dyn ExecutionContext>> {
        if self.faults.context_creation {
            return Err(BackendError::ContextCreation(format!(
                "{} refused to create a context",
                self.info.name
            )));
        }
        tracing::debug!(device = %self.info.name, "host_context_created");
        Ok(Box::new(HostContext {
            device_name: self.info.name.clone(),
            faults: self.faults.clone(),
            counters: Arc::clone(&self.counters),
            memory: Arc::new(RwLock::new(MemoryManager::new())),
            extents: HashMap::new(),
            sink: ErrorSink::new(),
            tail: None,
        }))
    }
}

/// In-order queue over a [`HostDevice`]
pub struct HostContext {
    device_name: String,
    faults: FaultInjection,
    counters: Arc<HostCounters>,
    memory: Arc<RwLock<MemoryManager>>,
    /// Buffer lengths, readable without waiting for queued kernels
    extents: HashMap<u64, usize>,
    sink: ErrorSink,
    /// Most recently queued job
    tail: Option<JoinHandle<()>>,
}

impl HostContext {
    /// Block until every queued job has finished.
    fn retire(&mut self) {
        if let Some(tail) = self.tail.take() {
            if tail.join().is_err() {
                self.sink.report(BackendError::kernel("host queue worker panicked"));
            }
        }
    }

    fn extent(&self, handle: BufferHandle) -> Result<usize> {
        self.extents
            .get(&handle.id())
            .copied()
            .ok_or(BackendError::InvalidBufferHandle(handle))
    }
}

/// Run one kernel to completion, returning the number of elements written.
fn execute(memory: &RwLock<MemoryManager>, task: KernelTask, launch: LaunchConfig, skip_write: Option<usize>) -> Result<usize> {
    match task {
        KernelTask::Noop => Ok(0),
        KernelTask::Identity { view } => {
            let mut memory = memory.write();
            let window = memory.view_mut(&view)?;
            let live = &mut window[..launch.global_size];
            let base = view.offset;
            let group = launch.group_size;
            live.par_chunks_mut(group).enumerate().for_each(|(group_id, lanes)| {
                for (lane, slot) in lanes.iter_mut().enumerate() {
                    let index = base + group_id * group + lane;
                    if skip_write != Some(index) {
                        *slot = identity_value(index);
                    }
                }
            });
            let skipped = skip_write.is_some_and(|i| (base..base + launch.global_size).contains(&i));
            Ok(launch.global_size - usize::from(skipped))
        }
    }
}

impl ExecutionContext for HostContext {
    fn allocate_buffer(&mut self, len: usize) -> Result<BufferHandle> {
        let handle = self.memory.write().allocate_buffer(len)?;
        self.extents.insert(handle.id(), len);
        self.counters.buffers_allocated.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    fn free_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        self.retire();
        self.memory.write().free_buffer(handle)?;
        self.extents.remove(&handle.id());
        self.counters.buffers_freed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn copy_in(&mut self, view: DeviceView, src: &[i64]) -> Result<()> {
        view.require(AccessMode::Write, "copy_in")?;
        if src.len() != view.len {
            return Err(BackendError::LengthMismatch {
                expected: view.len,
                actual: src.len(),
            });
        }
        self.retire();

        let start = Instant::now();
        self.memory.write().view_mut(&view)?.copy_from_slice(src);
        let bytes = std::mem::size_of_val(src);
        self.counters.bytes_to_device.fetch_add(bytes as u64, Ordering::Relaxed);
        record_transfer(bytes, TransferDirection::HostToDevice, start.elapsed().as_micros() as u64);
        Ok(())
    }

    fn submit(&mut self, task: KernelTask, launch: LaunchConfig) -> Result<()> {
        task.check_access()?;
        launch.validate()?;
        if let Some(view) = task.view() {
            view.check_bounds(self.extent(view.buffer)?)?;
            if launch.global_size > view.len {
                return Err(BackendError::InvalidLaunchConfig(format!(
                    "{} work-items exceed view of {} elements",
                    launch.global_size, view.len
                )));
            }
        }

        let ordinal = self.counters.submissions.fetch_add(1, Ordering::Relaxed);
        if self.faults.submission.fires(ordinal) {
            return Err(BackendError::submission(format!(
                "{} rejected submission #{ordinal}",
                self.device_name
            )));
        }

        let previous = self.tail.take();
        let memory = Arc::clone(&self.memory);
        let counters = Arc::clone(&self.counters);
        let sink = self.sink.clone();
        let skip_write = self.faults.skip_write;
        let deferred = self.faults.deferred.fires(ordinal);

        let job = move || {
            if let Some(previous) = previous {
                if previous.join().is_err() {
                    sink.report(BackendError::kernel("host queue worker panicked"));
                }
            }

            let start = Instant::now();
            match panic::catch_unwind(AssertUnwindSafe(|| execute(&memory, task, launch, skip_write))) {
                Ok(Ok(written)) => {
                    counters.kernels_completed.fetch_add(1, Ordering::Relaxed);
                    counters.elements_written.fetch_add(written as u64, Ordering::Relaxed);
                    record_throughput(task.name(), written, start.elapsed().as_micros() as u64);
                }
                Ok(Err(err)) => sink.report(err),
                Err(_) => sink.report(BackendError::kernel(format!("{} kernel panicked", task.name()))),
            }

            if deferred {
                sink.report(BackendError::kernel(format!("asynchronous failure in submission #{ordinal}")));
            }
        };

        let handle = thread::Builder::new()
            .name(format!("host-queue-{ordinal}"))
            .spawn(job)
            .map_err(|err| BackendError::submission(format!("failed to spawn queue worker: {err}")))?;
        self.tail = Some(handle);

        tracing::debug!(task = %task, launch = %launch, ordinal, "kernel_submitted");
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        self.retire();
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
        self.retire();

        let start = Instant::now();
        dst.copy_from_slice(self.memory.read().view(&view)?);
        let bytes = std::mem::size_of_val(dst);
        self.counters.bytes_from_device.fetch_add(bytes as u64, Ordering::Relaxed);
        record_transfer(bytes, TransferDirection::DeviceToHost, start.elapsed().as_micros() as u64);
        Ok(())
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        self.retire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(buffer: BufferHandle, offset: usize, len: usize) -> KernelTask {
        KernelTask::Identity {
            view: DeviceView::new(buffer, AccessMode::ReadWrite, offset, len),
        }
    }

    #[test]
    fn test_identity_full_extent() {
        let device = HostDevice::cpu();
        let mut ctx = device.create_context().unwrap();
        let buf = ctx.allocate_buffer(100).unwrap();

        ctx.submit(identity(buf, 0, 100), LaunchConfig::linear(100, 64)).unwrap();
        ctx.wait().unwrap();

        let mut out = vec![-1i64; 100];
        ctx.read_back(DeviceView::prefix(buf, AccessMode::Read, 100), &mut out).unwrap();
        assert!(out.iter().enumerate().all(|(i, &v)| v == i as i64));

        let stats = device.stats();
        assert_eq!(stats.kernels_completed, 1);
        assert_eq!(stats.elements_written, 100);
        assert_eq!(stats.bytes_from_device, 800);
    }

    #[test]
    fn test_identity_writes_absolute_indices_inside_view_only() {
        let device = HostDevice::cpu();
        let mut ctx = device.create_context().unwrap();
        let buf = ctx.allocate_buffer(16).unwrap();

        ctx.submit(identity(buf, 4, 8), LaunchConfig::linear(8, 3)).unwrap();
        ctx.wait().unwrap();

        let mut out = vec![0i64; 16];
        ctx.read_back(DeviceView::prefix(buf, AccessMode::Read, 16), &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0, 4, 5, 6, 7, 8, 9, 10, 11, 0, 0, 0, 0]);
    }

    #[test]
    fn test_free_buffer_retires_pending_work() {
        let device = HostDevice::cpu();
        let mut ctx = device.create_context().unwrap();
        let buf = ctx.allocate_buffer(256).unwrap();

        ctx.submit(identity(buf, 0, 256), LaunchConfig::linear(256, 64)).unwrap();
        ctx.free_buffer(buf).unwrap();

        let stats = device.stats();
        assert_eq!(stats.kernels_completed, 1);
        assert_eq!((stats.buffers_allocated, stats.buffers_freed), (1, 1));

        let mut out = vec![0i64; 256];
        assert!(matches!(
            ctx.read_back(DeviceView::prefix(buf, AccessMode::Read, 256), &mut out),
            Err(BackendError::InvalidBufferHandle(_))
        ));
        assert!(ctx.free_buffer(buf).is_err());
    }

    #[test]
    fn test_queue_is_in_order() {
        let device = HostDevice::cpu();
        let mut ctx = device.create_context().unwrap();
        let buf = ctx.allocate_buffer(64).unwrap();

        ctx.copy_in(DeviceView::prefix(buf, AccessMode::Write, 64), &[9; 64]).unwrap();
        ctx.submit(identity(buf, 0, 32), LaunchConfig::linear(32, 64)).unwrap();
        ctx.submit(identity(buf, 32, 32), LaunchConfig::linear(32, 64)).unwrap();

        let mut out = vec![0i64; 64];
        // read_back is ordered after both kernels even without an explicit wait
        ctx.read_back(DeviceView::prefix(buf, AccessMode::Read, 64), &mut out).unwrap();
        assert!(out.iter().enumerate().all(|(i, &v)| v == i as i64));
        ctx.wait().unwrap();
    }

    #[test]
    fn test_synchronous_rejections() {
        let device = HostDevice::cpu();
        let mut ctx = device.create_context().unwrap();
        let buf = ctx.allocate_buffer(8).unwrap();

        let read_only = KernelTask::Identity {
            view: DeviceView::prefix(buf, AccessMode::Read, 8),
        };
        assert!(matches!(
            ctx.submit(read_only, LaunchConfig::linear(8, 4)),
            Err(BackendError::AccessModeViolation { .. })
        ));
        assert!(matches!(
            ctx.submit(identity(buf, 4, 8), LaunchConfig::linear(8, 4)),
            Err(BackendError::ViewOutOfBounds { .. })
        ));
        assert!(matches!(
            ctx.submit(identity(buf, 0, 8), LaunchConfig::linear(9, 4)),
            Err(BackendError::InvalidLaunchConfig(_))
        ));
        assert!(matches!(
            ctx.copy_in(DeviceView::prefix(buf, AccessMode::Write, 8), &[1, 2]),
            Err(BackendError::LengthMismatch { expected: 8, actual: 2 })
        ));
        assert!(matches!(
            ctx.submit(identity(BufferHandle::new(99), 0, 1), LaunchConfig::linear(1, 1)),
            Err(BackendError::InvalidBufferHandle(_))
        ));
        assert!(ctx.wait().is_ok());
    }

    #[test]
    fn test_injected_submission_failure() {
        let faults = FaultInjection {
            submission: Trigger::On(vec![1]),
            ..FaultInjection::none()
        };
        let device = HostDevice::cpu().with_faults(faults);
        let mut ctx = device.create_context().unwrap();

        assert!(ctx.submit(KernelTask::Noop, LaunchConfig::single()).is_ok());
        assert!(matches!(
            ctx.submit(KernelTask::Noop, LaunchConfig::single()),
            Err(BackendError::Submission(_))
        ));
        assert!(ctx.submit(KernelTask::Noop, LaunchConfig::single()).is_ok());
        assert!(ctx.wait().is_ok());
    }

    #[test]
    fn test_deferred_failure_surfaces_at_wait_and_clears() {
        let device = HostDevice::cpu().with_faults(FaultInjection::deferred_always());
        let mut ctx = device.create_context().unwrap();

        ctx.submit(KernelTask::Noop, LaunchConfig::single()).unwrap();
        ctx.submit(KernelTask::Noop, LaunchConfig::single()).unwrap();
        match ctx.wait() {
            Err(BackendError::Deferred { count, .. }) => assert_eq!(count, 2),
            other => panic!("expected deferred failure, got {other:?}"),
        }
        assert!(ctx.wait().is_ok());
    }

    #[test]
    fn test_context_creation_failure() {
        let faults = FaultInjection {
            context_creation: true,
            ..FaultInjection::none()
        };
        let device = HostDevice::emulated("broken", DeviceKind::Gpu, false).with_faults(faults);
        assert!(matches!(device.create_context(), Err(BackendError::ContextCreation(_))));
    }

    #[test]
    fn test_skip_write() {
        let faults = FaultInjection {
            skip_write: Some(7),
            ..FaultInjection::none()
        };
        let device = HostDevice::cpu().with_faults(faults);
        let mut ctx = device.create_context().unwrap();
        let buf = ctx.allocate_buffer(32).unwrap();

        ctx.submit(identity(buf, 0, 32), LaunchConfig::linear(32, 64)).unwrap();
        ctx.wait().unwrap();

        let mut out = vec![0i64; 32];
        ctx.read_back(DeviceView::prefix(buf, AccessMode::Read, 32), &mut out).unwrap();
        assert_eq!(out[6], 6);
        assert_eq!(out[7], 0);
        assert_eq!(out[8], 8);
        assert_eq!(device.stats().elements_written, 31);
    }
}
