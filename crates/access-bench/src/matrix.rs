//! Access pattern matrix
//!
//! {subrange, full} x {device-resident, host-round-trip} for a device
//! category, each case swept over a geometric range of sizes.

use crate::config::BenchConfig;
use crate::selector::DeviceCategory;
use serde::Serialize;
use std::fmt;

/// How much of the backing store a case touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtentPolicy {
    /// Store has exactly N elements and all of them are accessed
    Full,
    /// Store has a fixed large size and only the first N elements are accessed
    Subrange,
}

/// Whether data moves between host and device inside the measured region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPolicy {
    /// Only the kernel is measured
    DeviceResident,
    /// Copy-in, kernel and read-back are all measured
    HostRoundTrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AccessPattern {
    pub extent: ExtentPolicy,
    pub transfer: TransferPolicy,
}

impl AccessPattern {
    /// Every pattern, in registration order
    pub const ALL: [AccessPattern; 4] = [
        AccessPattern::new(ExtentPolicy::Subrange, TransferPolicy::DeviceResident),
        AccessPattern::new(ExtentPolicy::Subrange, TransferPolicy::HostRoundTrip),
        AccessPattern::new(ExtentPolicy::Full, TransferPolicy::DeviceResident),
        AccessPattern::new(ExtentPolicy::Full, TransferPolicy::HostRoundTrip),
    ];

    pub const fn new(extent: ExtentPolicy, transfer: TransferPolicy) -> Self {
        Self { extent, transfer }
    }

    pub const fn name(&self) -> &'static str {
        match (self.extent, self.transfer) {
            (ExtentPolicy::Subrange, TransferPolicy::DeviceResident) => "subr_host_from_device",
            (ExtentPolicy::Subrange, TransferPolicy::HostRoundTrip) => "subr_device_from_host",
            (ExtentPolicy::Full, TransferPolicy::DeviceResident) => "full_host_from_device",
            (ExtentPolicy::Full, TransferPolicy::HostRoundTrip) => "full_device_from_host",
        }
    }

    /// Backing store length for accessed extent `n`
    pub const fn store_len(&self, n: usize, subrange_store: usize) -> usize {
        match self.extent {
            ExtentPolicy::Full => n,
            ExtentPolicy::Subrange => subrange_store,
        }
    }

    pub const fn measures_transfers(&self) -> bool {
        matches!(self.transfer, TransferPolicy::HostRoundTrip)
    }
}

impl fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One registered benchmark: a pattern, the category whose device runs it,
/// and the sizes it sweeps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkCase {
    pub category: DeviceCategory,
    pub pattern: AccessPattern,
    pub sizes: Vec<usize>,
}

impl BenchmarkCase {
    /// `pattern/category`, e.g. `subr_host_from_device/integrated`
    pub fn name(&self) -> String {
        format!("{}/{}", self.pattern, self.category)
    }

    /// Name of one size of this case, e.g. `full_host_from_device/dedicated/1024`
    pub fn size_name(&self, n: usize) -> String {
        format!("{}/{n}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessMatrix {
    cases: Vec<BenchmarkCase>,
}

impl AccessMatrix {
    /// The four cases for one category
    pub fn for_category(category: DeviceCategory, config: &BenchConfig) -> Self {
        let sizes = geometric_sweep(config.min_elements, config.max_elements, config.multiplier);
        let cases = AccessPattern::ALL
            .iter()
            .map(|&pattern| BenchmarkCase {
                category,
                pattern,
                sizes: sizes.clone(),
            })
            .collect();
        Self { cases }
    }

    /// Cases for every category, dedicated first
    pub fn all(config: &BenchConfig) -> Self {
        let cases = DeviceCategory::ALL
            .iter()
            .flat_map(|&category| Self::for_category(category, config).cases)
            .collect();
        Self { cases }
    }

    pub fn cases(&self) -> &[BenchmarkCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl<'a> IntoIterator for &'a AccessMatrix {
    type Item = &'a BenchmarkCase;
    type IntoIter = std::slice::Iter<'a, BenchmarkCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

/// Sizes from `min` to `max`: `min`, every power of `multiplier` strictly
/// between them, then `max`.
///
/// ```rust
/// use access_bench::matrix::geometric_sweep;
///
/// assert_eq!(geometric_sweep(1 << 25, 1 << 28, 2), vec![1 << 25, 1 << 26, 1 << 27, 1 << 28]);
/// assert_eq!(geometric_sweep(10, 100, 8), vec![10, 64, 100]);
/// ```
pub fn geometric_sweep(min: usize, max: usize, multiplier: usize) -> Vec<usize> {
    let mut sizes = vec![min];
    if max <= min {
        return sizes;
    }
    if multiplier >= 2 {
        let mut power = 1usize;
        while power < max {
            if power > min {
                sizes.push(power);
            }
            match power.checked_mul(multiplier) {
                Some(next) => power = next,
                None => break,
            }
        }
    }
    sizes.push(max);
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_matches_reference_range() {
        assert_eq!(
            geometric_sweep(1 << 25, 1 << 28, 2),
            vec![33_554_432, 67_108_864, 134_217_728, 268_435_456]
        );
    }

    #[test]
    fn sweep_edge_cases() {
        assert_eq!(geometric_sweep(32, 32, 2), vec![32]);
        assert_eq!(geometric_sweep(5, 6, 2), vec![5, 6]);
        assert_eq!(geometric_sweep(3, 17, 2), vec![3, 4, 8, 16, 17]);
        assert_eq!(geometric_sweep(1, 1000, 10), vec![1, 10, 100, 1000]);
        assert_eq!(geometric_sweep(1, usize::MAX, usize::MAX / 2 + 1).len(), 3);
    }

    #[test]
    fn patterns_in_registration_order() {
        let names: Vec<_> = AccessPattern::ALL.iter().map(AccessPattern::name).collect();
        assert_eq!(
            names,
            vec![
                "subr_host_from_device",
                "subr_device_from_host",
                "full_host_from_device",
                "full_device_from_host"
            ]
        );
    }

    #[test]
    fn store_len_depends_on_extent_policy() {
        let full = AccessPattern::new(ExtentPolicy::Full, TransferPolicy::DeviceResident);
        let subr = AccessPattern::new(ExtentPolicy::Subrange, TransferPolicy::HostRoundTrip);
        assert_eq!(full.store_len(32, 1 << 20), 32);
        assert_eq!(subr.store_len(32, 1 << 20), 1 << 20);
        assert!(subr.measures_transfers());
        assert!(!full.measures_transfers());
    }

    #[test]
    fn matrix_enumerates_cross_product() {
        let config = BenchConfig::quick();
        let matrix = AccessMatrix::for_category(DeviceCategory::Integrated, &config);
        assert_eq!(matrix.len(), 4);
        assert!(matrix.cases().iter().all(|c| c.sizes == vec![1024, 4096, 16384]));
        assert_eq!(matrix.cases()[0].name(), "subr_host_from_device/integrated");
        assert_eq!(matrix.cases()[3].size_name(64), "full_device_from_host/integrated/64");

        let all = AccessMatrix::all(&config);
        assert_eq!(all.len(), 8);
        assert_eq!(all.cases()[0].category, DeviceCategory::Dedicated);
        assert_eq!(all.cases()[7].category, DeviceCategory::Integrated);
        assert_eq!((&all).into_iter().count(), 8);
    }
}
