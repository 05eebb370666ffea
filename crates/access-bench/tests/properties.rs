use access_backends::{Device, HostDevice};
use access_bench::{
    geometric_sweep, validate_identity, AccessPattern, BackingStore, BenchError, BufferAccessHarness, TimingMode,
};
use proptest::prelude::*;
use std::sync::Arc;

fn pattern_strategy() -> impl Strategy<Value = AccessPattern> {
    prop::sample::select(AccessPattern::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn identity_and_containment(
        pattern in pattern_strategy(),
        extent in 1usize..2_000,
        slack in 0usize..2_000,
        group in prop::sample::select(vec![1usize, 7, 32, 64, 256]),
    ) {
        let device: Arc<dyn Device> = Arc::new(HostDevice::cpu());
        let harness = BufferAccessHarness::with_timing(device, TimingMode::WallClock, group);
        let store_len = extent + slack;
        let mut store = BackingStore::new(store_len);

        let sample = harness.run_case(pattern, extent, &mut store).unwrap();

        prop_assert_eq!(sample.validated_elements, extent);
        prop_assert!(store.slice(0..extent).iter().enumerate().all(|(i, &v)| v == i as i64));
        prop_assert!(store.slice(extent..store_len).iter().all(|&v| v == 0));
    }

    #[test]
    fn validation_reports_lowest_mismatch(len in 1usize..5_000, bad in any::<prop::sample::Index>(), value in any::<i64>()) {
        let index = bad.index(len);
        prop_assume!(value != index as i64);
        let mut values: Vec<i64> = (0..len as i64).collect();
        values[index] = value;
        if index + 1 < len {
            values[len - 1] = -1;
        }

        match validate_identity(&values) {
            Err(BenchError::Validation { index: found, expected, observed }) => {
                prop_assert_eq!(found, index);
                prop_assert_eq!(expected, index as i64);
                prop_assert_eq!(observed, value);
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn sweep_is_bounded_and_increasing(min in 1usize..1 << 20, span in 0usize..1 << 24, multiplier in 2usize..16) {
        let max = min + span;
        let sizes = geometric_sweep(min, max, multiplier);

        prop_assert_eq!(sizes[0], min);
        prop_assert_eq!(*sizes.last().unwrap(), max);
        prop_assert!(sizes.windows(2).all(|w| w[0] < w[1]));
        for &n in sizes.iter().skip(1).take(sizes.len().saturating_sub(2)) {
            let mut power = 1usize;
            while power < n {
                power *= multiplier;
            }
            prop_assert_eq!(power, n);
        }
    }
}
