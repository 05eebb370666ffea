//! Repetition driver
//!
//! Runs every size of a case sequentially, `repetitions` times each, and
//! folds the samples into aggregates. Submission and asynchronous failures
//! discard one repetition; a validation failure skips the rest of that size.

use crate::complexity::{fit_complexity, ComplexityFit};
use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::harness::BufferAccessHarness;
use crate::matrix::{AccessMatrix, AccessPattern, BenchmarkCase};
use crate::selector::DeviceCategory;
use crate::stats::Aggregate;
use crate::store::BackingStore;
use access_backends::Device;
use access_tracing::perf_span;
use serde::Serialize;
use std::sync::Arc;

/// How the repetitions at one size ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SizeOutcome {
    /// Every repetition was attempted
    Completed,
    /// A repetition read back a wrong value; later repetitions were skipped
    ValidationFailed { index: usize, expected: i64, observed: i64 },
    /// A non-repetition error stopped this size
    Aborted { reason: String },
}

impl SizeOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, SizeOutcome::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeResult {
    pub n: usize,
    /// Aggregate over successful repetitions, `None` if there were none
    pub aggregate: Option<Aggregate>,
    /// Repetitions started
    pub attempted: usize,
    /// Repetitions discarded by submission or asynchronous failures
    pub errored: usize,
    pub errors: Vec<String>,
    pub outcome: SizeOutcome,
}

impl SizeResult {
    pub fn succeeded(&self) -> usize {
        self.aggregate.map_or(0, |agg| agg.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub category: DeviceCategory,
    pub pattern: AccessPattern,
    pub sizes: Vec<SizeResult>,
    pub complexity: Option<ComplexityFit>,
}

impl CaseReport {
    pub fn has_failures(&self) -> bool {
        self.sizes
            .iter()
            .any(|size| size.errored > 0 || size.outcome.is_failure())
    }
}

pub struct CaseDriver {
    harness: BufferAccessHarness,
    config: BenchConfig,
}

impl CaseDriver {
    pub fn new(device: Arc<dyn Device>, config: BenchConfig) -> Self {
        Self {
            harness: BufferAccessHarness::new(device, &config),
            config,
        }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn harness(&self) -> &BufferAccessHarness {
        &self.harness
    }

    /// Run all repetitions of `case` at extent `n`
    pub fn run_size(&self, case: &BenchmarkCase, n: usize) -> SizeResult {
        let pattern = case.pattern;
        let mut store = BackingStore::new(pattern.store_len(n, self.config.subrange_store_elements));
        let mut samples = Vec::with_capacity(self.config.repetitions);
        let mut result = SizeResult {
            n,
            aggregate: None,
            attempted: 0,
            errored: 0,
            errors: Vec::new(),
            outcome: SizeOutcome::Completed,
        };

        let size_name = case.size_name(n);
        let span = perf_span!(size_name.as_str(), repetitions = self.config.repetitions);
        let _entered = span.enter();

        for repetition in 0..self.config.repetitions {
            result.attempted += 1;
            match self.harness.run_case(pattern, n, &mut store) {
                Ok(sample) => samples.push(sample.elapsed),
                Err(err) if err.is_repetition_failure() => {
                    tracing::warn!(case = %case.name(), n, repetition, error = %err, "repetition_errored");
                    result.errored += 1;
                    result.errors.push(err.to_string());
                }
                Err(BenchError::Validation {
                    index,
                    expected,
                    observed,
                }) => {
                    tracing::error!(
                        case = %case.name(),
                        n,
                        repetition,
                        index,
                        expected,
                        observed,
                        "validation_failed"
                    );
                    result.outcome = SizeOutcome::ValidationFailed {
                        index,
                        expected,
                        observed,
                    };
                    break;
                }
                Err(err) => {
                    tracing::error!(case = %case.name(), n, repetition, error = %err, "size_aborted");
                    result.outcome = SizeOutcome::Aborted {
                        reason: err.to_string(),
                    };
                    break;
                }
            }
        }

        result.aggregate = Aggregate::from_samples(&samples);
        result
    }

    /// Run every size of `case` and fit its complexity
    pub fn run_case(&self, case: &BenchmarkCase) -> CaseReport {
        let name = case.name();
        tracing::info!(case = %name, sizes = case.sizes.len(), "case_started");

        let sizes: Vec<SizeResult> = case.sizes.iter().map(|&n| self.run_size(case, n)).collect();

        let complexity = if self.config.complexity {
            let points: Vec<(usize, f64)> = sizes
                .iter()
                .filter_map(|size| size.aggregate.map(|agg| (size.n, agg.mean.as_secs_f64())))
                .collect();
            fit_complexity(&points)
        } else {
            None
        };

        let report = CaseReport {
            name,
            category: case.category,
            pattern: case.pattern,
            sizes,
            complexity,
        };
        tracing::info!(
            case = %report.name,
            failures = report.has_failures(),
            big_o = ?report.complexity.map(|fit| fit.big_o),
            "case_finished"
        );
        report
    }

    /// Run the cases of `matrix` in registration order
    pub fn run_matrix(&self, matrix: &AccessMatrix) -> Vec<CaseReport> {
        matrix.cases().iter().map(|case| self.run_case(case)).collect()
    }
}
