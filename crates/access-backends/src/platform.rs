//! Device enumeration
//!
//! `Platform::system()` lists, in order:
//!
//! 1. CUDA devices in driver order (feature `cuda`)
//! 2. Emulated devices requested through `ACCESS_DEVICE_FAKE`
//! 3. The host CPU
//!
//! `ACCESS_DEVICE_FAKE` is a comma-separated list of `integrated`,
//! `dedicated`, `broken-integrated`, `broken-dedicated`, `lossy-integrated`,
//! `lossy-dedicated` and `cpu`. Broken devices report GPU attributes but fail
//! every submission, so they pass the attribute filter and fail the
//! capability probe. Lossy devices pass the probe, then drop the identity
//! write to element 1 so every benchmark size fails validation. Strict mode
//! (`ACCESS_STRICT_MODE=1`) ignores `ACCESS_DEVICE_FAKE` and lists real
//! hardware only.

use crate::backend::{Device, DeviceKind};
use crate::backends::{CudaAccelerator, FaultInjection, HostDevice};
use std::sync::Arc;

pub const DEVICE_FAKE_ENV: &str = "ACCESS_DEVICE_FAKE";
pub const STRICT_MODE_ENV: &str = "ACCESS_STRICT_MODE";

// Inside every extent the benchmark sweeps
const LOSSY_INDEX: usize = 1;

/// Ordered set of candidate devices
#[derive(Debug, Clone, Default)]
pub struct Platform {
    devices: Vec<Arc<dyn Device>>,
}

impl Platform {
    /// Enumerate the devices visible to this process
    pub fn system() -> Self {
        let mut devices = CudaAccelerator::enumerate();

        if !strict_mode_enabled() {
            if let Ok(spec) = std::env::var(DEVICE_FAKE_ENV) {
                devices.extend(
                    parse_fake_devices(&spec)
                        .into_iter()
                        .map(|device| Arc::new(device) as Arc<dyn Device>),
                );
            }
        }

        devices.push(Arc::new(HostDevice::cpu()));

        for (index, device) in devices.iter().enumerate() {
            tracing::debug!(index, device = %device.info(), "device_enumerated");
        }
        Self { devices }
    }

    /// A fixed device set, enumerated in the given order
    pub fn from_devices(devices: Vec<Arc<dyn Device>>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[Arc<dyn Device>] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

fn strict_mode_enabled() -> bool {
    std::env::var(STRICT_MODE_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build emulated devices from an `ACCESS_DEVICE_FAKE` value.
///
/// Unknown tokens are skipped.
pub fn parse_fake_devices(spec: &str) -> Vec<HostDevice> {
    spec.split(',')
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let device = match token.as_str() {
                "integrated" => HostDevice::emulated("emulated integrated gpu", DeviceKind::Gpu, true),
                "dedicated" => HostDevice::emulated("emulated dedicated gpu", DeviceKind::Gpu, false),
                "broken-integrated" => HostDevice::emulated("broken integrated gpu", DeviceKind::Gpu, true)
                    .with_faults(FaultInjection::deferred_always()),
                "broken-dedicated" => HostDevice::emulated("broken dedicated gpu", DeviceKind::Gpu, false)
                    .with_faults(FaultInjection::rejecting()),
                "lossy-integrated" => HostDevice::emulated("lossy integrated gpu", DeviceKind::Gpu, true)
                    .with_faults(FaultInjection::lossy(LOSSY_INDEX)),
                "lossy-dedicated" => HostDevice::emulated("lossy dedicated gpu", DeviceKind::Gpu, false)
                    .with_faults(FaultInjection::lossy(LOSSY_INDEX)),
                "cpu" => HostDevice::emulated("emulated cpu", DeviceKind::Cpu, true),
                other => {
                    tracing::debug!(token = other, "unknown_fake_device_ignored");
                    return None;
                }
            };
            Some(device)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parse_fake_devices_in_order() {
        let devices = parse_fake_devices(" dedicated, INTEGRATED,,bogus,broken-dedicated ");
        let names: Vec<_> = devices.iter().map(|d| d.info().name.as_str()).collect();
        assert_eq!(
            names,
            vec!["emulated dedicated gpu", "emulated integrated gpu", "broken dedicated gpu"]
        );
        assert!(!devices[0].info().host_unified_memory);
        assert!(devices[1].info().host_unified_memory);
        assert!(!devices[2].faults().is_none());
    }

    #[test]
    fn parse_lossy_tokens() {
        let devices = parse_fake_devices("lossy-dedicated,lossy-integrated");
        assert_eq!(devices[0].info().name, "lossy dedicated gpu");
        assert!(!devices[0].info().host_unified_memory);
        assert!(devices[1].info().host_unified_memory);
        assert!(devices.iter().all(|d| d.faults().skip_write == Some(LOSSY_INDEX)));
    }

    #[test]
    fn parse_cpu_token() {
        let devices = parse_fake_devices("cpu");
        assert_eq!(devices[0].info().kind, DeviceKind::Cpu);
    }

    #[test]
    #[serial]
    fn system_includes_fakes_then_host() {
        std::env::remove_var(STRICT_MODE_ENV);
        std::env::set_var(DEVICE_FAKE_ENV, "integrated");
        let platform = Platform::system();
        std::env::remove_var(DEVICE_FAKE_ENV);

        let names: Vec<_> = platform.devices().iter().map(|d| d.info().name.clone()).collect();
        assert!(names.iter().any(|n| n == "emulated integrated gpu"));
        assert_eq!(platform.devices().last().map(|d| d.info().kind), Some(DeviceKind::Cpu));
    }

    #[test]
    #[serial]
    fn strict_mode_ignores_fakes() {
        std::env::set_var(STRICT_MODE_ENV, "1");
        std::env::set_var(DEVICE_FAKE_ENV, "integrated,dedicated");
        let platform = Platform::system();
        std::env::remove_var(DEVICE_FAKE_ENV);
        std::env::remove_var(STRICT_MODE_ENV);

        assert!(platform
            .devices()
            .iter()
            .all(|d| d.info().vendor != "emulated"));
    }

    #[test]
    fn from_devices_keeps_order() {
        let platform = Platform::from_devices(vec![
            Arc::new(HostDevice::emulated("a", DeviceKind::Gpu, true)),
            Arc::new(HostDevice::emulated("b", DeviceKind::Gpu, false)),
        ]);
        assert_eq!(platform.len(), 2);
        assert_eq!(platform.devices()[1].info().name, "b");
        assert!(Platform::default().is_empty());
    }
}
