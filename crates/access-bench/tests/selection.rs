//! Device selection against static and environment-provided device sets

use access_backends::{Device, DeviceKind, FaultInjection, HostDevice, Platform};
use access_bench::{select_device, select_from, BenchError, DeviceCategory};
use serial_test::serial;
use std::sync::Arc;

fn gpu(name: &str, unified: bool) -> Arc<dyn Device> {
    Arc::new(HostDevice::emulated(name, DeviceKind::Gpu, unified))
}

fn broken_gpu(name: &str, unified: bool) -> Arc<dyn Device> {
    Arc::new(HostDevice::emulated(name, DeviceKind::Gpu, unified).with_faults(FaultInjection::deferred_always()))
}

fn mixed_platform() -> Platform {
    Platform::from_devices(vec![
        Arc::new(HostDevice::cpu()) as Arc<dyn Device>,
        broken_gpu("igpu-broken", true),
        gpu("dgpu-a", false),
        gpu("igpu-a", true),
        gpu("dgpu-b", false),
    ])
}

#[test]
fn selection_is_deterministic() {
    let platform = mixed_platform();
    for _ in 0..5 {
        assert_eq!(
            select_from(DeviceCategory::Dedicated, &platform).unwrap().info().name,
            "dgpu-a"
        );
        assert_eq!(
            select_from(DeviceCategory::Integrated, &platform).unwrap().info().name,
            "igpu-a"
        );
    }
}

#[test]
fn probe_gating_skips_devices_that_cannot_run_work() {
    let platform = Platform::from_devices(vec![broken_gpu("only", false)]);
    assert!(DeviceCategory::Dedicated.matches(platform.devices()[0].info()));
    assert!(matches!(
        select_from(DeviceCategory::Dedicated, &platform),
        Err(BenchError::DeviceUnavailable {
            category: DeviceCategory::Dedicated
        })
    ));
}

#[test]
fn exhaustion_without_gpus() {
    let platform = Platform::from_devices(vec![
        Arc::new(HostDevice::cpu()) as Arc<dyn Device>,
        Arc::new(HostDevice::emulated("fpga", DeviceKind::Accelerator, false)) as Arc<dyn Device>,
    ]);
    for category in DeviceCategory::ALL {
        let err = select_from(category, &platform).err().unwrap();
        assert_eq!(err.to_string(), category.unavailable_message());
    }
}

#[test]
#[serial]
fn process_wide_selection_uses_fake_devices_and_is_cached() {
    std::env::remove_var("ACCESS_STRICT_MODE");
    std::env::set_var("ACCESS_DEVICE_FAKE", "broken-integrated,integrated");
    let first = select_device(DeviceCategory::Integrated).unwrap();

    // Later changes to the environment do not trigger a new selection.
    std::env::set_var("ACCESS_DEVICE_FAKE", "dedicated");
    let second = select_device(DeviceCategory::Integrated).unwrap();
    std::env::remove_var("ACCESS_DEVICE_FAKE");

    assert_eq!(first.info().name, "emulated integrated gpu");
    assert!(Arc::ptr_eq(&first, &second));
}
