//! Device selection
//!
//! A category admits a device when it is a GPU, its unified-memory flag
//! matches the category, and it passes the capability probe. The first
//! admitted device in enumeration order wins and is cached for the rest of
//! the process.

use crate::error::{BenchError, Result};
use crate::probe::is_supported;
use access_backends::{Device, DeviceInfo, DeviceKind, Platform};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    /// Discrete GPU with its own memory
    Dedicated,
    /// GPU sharing physical memory with the host
    Integrated,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 2] = [DeviceCategory::Dedicated, DeviceCategory::Integrated];

    /// Unified-memory flag a device of this category reports
    pub const fn expected_unified_memory(self) -> bool {
        matches!(self, DeviceCategory::Integrated)
    }

    pub const fn name(self) -> &'static str {
        match self {
            DeviceCategory::Dedicated => "dedicated",
            DeviceCategory::Integrated => "integrated",
        }
    }

    /// One-line diagnostic printed when no device qualifies
    pub const fn unavailable_message(self) -> &'static str {
        match self {
            DeviceCategory::Dedicated => "no dedicated GPU available that can run the buffer access benchmarks",
            DeviceCategory::Integrated => "no integrated GPU available that can run the buffer access benchmarks",
        }
    }

    /// Attribute filter, without probing
    pub fn matches(self, info: &DeviceInfo) -> bool {
        info.kind == DeviceKind::Gpu && info.host_unified_memory == self.expected_unified_memory()
    }

    /// Attribute filter followed by the capability probe
    pub fn rank(self, device: &dyn Device) -> Rank {
        let info = device.info();
        let rank = if !self.matches(info) {
            Rank::Invalid
        } else if is_supported(device) {
            Rank::Valid
        } else {
            Rank::Invalid
        };
        tracing::debug!(category = self.name(), device = %info.name, ?rank, "device_ranked");
        rank
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dedicated" => Ok(DeviceCategory::Dedicated),
            "integrated" => Ok(DeviceCategory::Integrated),
            other => Err(format!("unknown device category {other:?} (expected dedicated or integrated)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Valid,
    Invalid,
}

/// Pick the first device of `platform` that `category` admits
///
/// Uncached; see [`select_device`] for the process-wide selection.
pub fn select_from(category: DeviceCategory, platform: &Platform) -> Result<Arc<dyn Device>> {
    platform
        .devices()
        .iter()
        .find(|device| category.rank(device.as_ref()) == Rank::Valid)
        .cloned()
        .ok_or(BenchError::DeviceUnavailable { category })
}

/// Initialize-once slot for a selected device
///
/// The first successful selection is stored and returned to every later
/// caller without re-probing. Failed selections are not cached.
pub struct DeviceCache {
    slot: OnceLock<Arc<dyn Device>>,
    init: Mutex<()>,
}

impl DeviceCache {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
            init: parking_lot::const_mutex(()),
        }
    }

    pub fn get(&self) -> Option<Arc<dyn Device>> {
        self.slot.get().cloned()
    }

    pub fn get_or_select<F>(&self, select: F) -> Result<Arc<dyn Device>>
    where
        F: FnOnce() -> Result<Arc<dyn Device>>,
    {
        if let Some(device) = self.get() {
            return Ok(device);
        }

        let _guard = self.init.lock();
        // Another thread may have finished selecting while we waited.
        if let Some(device) = self.get() {
            return Ok(device);
        }

        let device = select()?;
        let stored = self.slot.get_or_init(|| device);
        Ok(Arc::clone(stored))
    }
}

impl Default for DeviceCache {
    fn default() -> Self {
        Self::new()
    }
}

static DEDICATED: DeviceCache = DeviceCache::new();
static INTEGRATED: DeviceCache = DeviceCache::new();

fn cache_for(category: DeviceCategory) -> &'static DeviceCache {
    match category {
        DeviceCategory::Dedicated => &DEDICATED,
        DeviceCategory::Integrated => &INTEGRATED,
    }
}

/// Select through `cache`, announcing the device on `out` only when this
/// call performed the selection
fn select_cached(
    cache: &DeviceCache,
    category: DeviceCategory,
    platform: impl FnOnce() -> Platform,
    out: &mut dyn Write,
) -> Result<Arc<dyn Device>> {
    cache.get_or_select(|| {
        let device = select_from(category, &platform())?;
        tracing::info!(category = category.name(), "using {}", device.info().name);
        if let Err(err) = write!(out, "\nusing {}\n\n", device.info().name) {
            tracing::warn!(error = %err, "failed to print device banner");
        }
        Ok(device)
    })
}

/// Process-wide device for `category`, selected from [`Platform::system`]
/// on first use
///
/// The first successful selection prints a `using <device>` banner to
/// stdout; cached lookups print nothing.
pub fn select_device(category: DeviceCategory) -> Result<Arc<dyn Device>> {
    select_cached(cache_for(category), category, Platform::system, &mut io::stdout())
}

/// [`select_device`], printing the category diagnostic and exiting the
/// process with status 1 when nothing qualifies
pub fn select_device_or_exit(category: DeviceCategory) -> Arc<dyn Device> {
    match select_device(category) {
        Ok(device) => device,
        Err(err) => {
            tracing::error!(category = category.name(), error = %err, "device_unavailable");
            println!("{}", category.unavailable_message());
            std::process::exit(1);
        }
    }
}
