//! Capability probe
//!
//! A device is only worth benchmarking if it can actually run offloaded
//! work. Attribute queries are not enough to know that: drivers happily
//! enumerate devices whose runtime is missing or broken.

use access_backends::{Device, KernelTask, LaunchConfig};
use access_tracing::timed_block;
use std::panic::{self, AssertUnwindSafe};

/// Run a no-op single task on `device` and report whether it completed.
///
/// Any synchronous failure (context creation, submission, wait), a panic,
/// or a deferred failure collected by the context's error sink makes the
/// device unsupported. The transient context is dropped before returning and
/// nothing is retried.
pub fn is_supported(device: &dyn Device) -> bool {
    let (outcome, probe_us) = timed_block!("capability_probe", {
        panic::catch_unwind(AssertUnwindSafe(|| -> access_backends::Result<()> {
            let mut ctx = device.create_context()?;
            ctx.submit(KernelTask::Noop, LaunchConfig::single())?;
            // Drains the sink, so deferred failures surface here too.
            ctx.wait()
        }))
    });

    let name = &device.info().name;
    match outcome {
        Ok(Ok(())) => {
            tracing::debug!(device = %name, probe_us, "probe_passed");
            true
        }
        Ok(Err(err)) => {
            tracing::debug!(device = %name, probe_us, error = %err, "probe_failed");
            false
        }
        Err(_) => {
            tracing::debug!(device = %name, probe_us, "probe_panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use access_backends::{BackendKind, DeviceInfo, DeviceKind, ExecutionContext, FaultInjection, HostDevice, Trigger};

    #[test]
    fn healthy_host_device_is_supported() {
        assert!(is_supported(&HostDevice::cpu()));
    }

    #[test]
    fn context_creation_failure_is_unsupported() {
        let device = HostDevice::emulated("no context", DeviceKind::Gpu, false).with_faults(FaultInjection {
            context_creation: true,
            ..FaultInjection::none()
        });
        assert!(!is_supported(&device));
    }

    #[test]
    fn synchronous_submission_failure_is_unsupported() {
        let device = HostDevice::emulated("rejects", DeviceKind::Gpu, false).with_faults(FaultInjection::rejecting());
        assert!(!is_supported(&device));
    }

    #[test]
    fn deferred_failure_is_unsupported() {
        let device =
            HostDevice::emulated("async", DeviceKind::Gpu, true).with_faults(FaultInjection::deferred_always());
        assert!(!is_supported(&device));
    }

    #[test]
    fn probe_is_not_retried() {
        // Only the first submission fails; a retrying probe would pass.
        let device = HostDevice::emulated("flaky", DeviceKind::Gpu, true).with_faults(FaultInjection {
            submission: Trigger::On(vec![0]),
            ..FaultInjection::none()
        });
        assert!(!is_supported(&device));
        assert_eq!(device.stats().submissions, 1);
        // The second probe sees ordinal 1 and passes.
        assert!(is_supported(&device));
    }

    #[derive(Debug)]
    struct PanickingDevice {
        info: DeviceInfo,
    }

    impl Device for PanickingDevice {
        fn info(&self) -> &DeviceInfo {
            &self.info
        }

        fn create_context(&self) -> access_backends::Result<Box<dyn ExecutionContext>> {
            panic!("driver crashed");
        }
    }

    #[test]
    fn panics_are_swallowed() {
        let device = PanickingDevice {
            info: DeviceInfo {
                name: "crashy".into(),
                vendor: "test".into(),
                kind: DeviceKind::Gpu,
                host_unified_memory: false,
                backend: BackendKind::Host,
            },
        };
        assert!(!is_supported(&device));
    }
}
