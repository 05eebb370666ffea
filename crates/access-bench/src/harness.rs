//! Buffer access harness
//!
//! Runs one timed repetition of a case:
//!
//! ```text
//! step                                   device-resident   host-round-trip
//! 1. zero-fill backing store             excluded          excluded
//! 2. create context + device buffer      excluded          excluded
//! 3. copy extent host -> device          -                 measured
//! 4. submit identity kernel over extent  measured          measured
//! 5. wait + drain error sink             measured          measured
//! 6. read extent device -> host          excluded          measured
//! 7. free buffer, validate value[i] == i excluded          excluded
//! 8. record sample
//! ```

use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::matrix::AccessPattern;
use crate::store::BackingStore;
use crate::timer::{IterationState, Phase, TimingMode};
use access_backends::{identity_value, AccessMode, Device, DeviceView, KernelTask, LaunchConfig};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Result of one successful repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    /// Time spent in measured phases
    pub elapsed: Duration,
    /// Accessed extent, used as the complexity covariate
    pub complexity_n: usize,
    /// Elements checked by validation
    pub validated_elements: usize,
}

pub struct BufferAccessHarness {
    device: Arc<dyn Device>,
    timing_mode: TimingMode,
    group_size: usize,
}

impl BufferAccessHarness {
    pub fn new(device: Arc<dyn Device>, config: &BenchConfig) -> Self {
        Self::with_timing(device, config.timing_mode, config.group_size)
    }

    pub fn with_timing(device: Arc<dyn Device>, timing_mode: TimingMode, group_size: usize) -> Self {
        Self {
            device,
            timing_mode,
            group_size,
        }
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Run one repetition of `pattern` over the first `n` elements of `store`
    ///
    /// The store must be at least `n` long. It is zero-filled on entry and,
    /// on return, holds the device's values for `[0, n)`; `[n, len)` keeps
    /// its reset value.
    #[tracing::instrument(skip(self, store), fields(device = %self.device.info().name, store_len = store.len()))]
    pub fn run_case(&self, pattern: AccessPattern, n: usize, store: &mut BackingStore) -> Result<TimingSample> {
        let mut state = IterationState::new(self.timing_mode);

        store.check_extent(n)?;
        store.reset();
        let mut ctx = self.device.create_context()?;
        let buffer = ctx.allocate_buffer(store.len())?;
        let extent = DeviceView::prefix(buffer, AccessMode::ReadWrite, n);

        state.enter(Phase::Measured);

        if pattern.measures_transfers() {
            ctx.copy_in(extent.with_mode(AccessMode::Write), store.slice(0..n))?;
        }

        ctx.submit(KernelTask::Identity { view: extent }, LaunchConfig::linear(n, self.group_size))?;
        ctx.wait()?;

        if !pattern.measures_transfers() {
            state.enter(Phase::Validation);
        }
        ctx.read_back(extent.with_mode(AccessMode::Read), store.slice_mut(0..n))?;

        state.enter(Phase::Validation);
        ctx.free_buffer(buffer)?;
        validate_identity(store.slice(0..n))?;

        let elapsed = state.measured();
        tracing::debug!(elapsed_us = elapsed.as_micros() as u64, n, "repetition_complete");

        Ok(TimingSample {
            elapsed,
            complexity_n: n,
            validated_elements: n,
        })
    }
}

/// Check `values[i] == i` for every element, reporting the lowest failing
/// index
pub fn validate_identity(values: &[i64]) -> Result<()> {
    let mismatch = values
        .par_iter()
        .enumerate()
        .find_first(|&(index, &observed)| observed != identity_value(index));

    match mismatch {
        None => Ok(()),
        Some((index, &observed)) => Err(BenchError::Validation {
            index,
            expected: identity_value(index),
            observed,
        }),
    }
}
