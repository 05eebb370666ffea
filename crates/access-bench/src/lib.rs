//! Buffer access benchmark
//!
//! Measures how fast a host program can hand data to an accelerator, have
//! it written by an offloaded kernel, and read it back, for dedicated and
//! integrated GPUs.
//!
//! - **probe / selector**: pick the first device of a category that can
//!   actually run work, once per process
//! - **matrix**: {subrange, full} x {device-resident, host-round-trip}
//!   swept over a geometric size range
//! - **harness**: one phase-timed repetition with validation
//! - **driver**: repetition policy, aggregation and complexity fit
//! - **report**: text table and JSON output
//!
//! # Example
//!
//! ```rust
//! use access_backends::HostDevice;
//! use access_bench::{AccessMatrix, BenchConfig, CaseDriver, DeviceCategory};
//! use std::sync::Arc;
//!
//! let config = BenchConfig {
//!     min_elements: 32,
//!     max_elements: 128,
//!     subrange_store_elements: 256,
//!     ..BenchConfig::quick()
//! };
//! let driver = CaseDriver::new(Arc::new(HostDevice::cpu()), config.clone());
//! let reports = driver.run_matrix(&AccessMatrix::for_category(DeviceCategory::Integrated, &config));
//!
//! assert_eq!(reports.len(), 4);
//! assert!(reports.iter().all(|r| !r.has_failures()));
//! ```

pub mod complexity;
pub mod config;
pub mod driver;
pub mod error;
pub mod harness;
pub mod matrix;
pub mod probe;
pub mod report;
pub mod selector;
pub mod stats;
pub mod store;
pub mod timer;

pub use complexity::{fit_complexity, BigO, ComplexityFit};
pub use config::{BenchConfig, ConfigError};
pub use driver::{CaseDriver, CaseReport, SizeOutcome, SizeResult};
pub use error::{BenchError, Result};
pub use harness::{validate_identity, BufferAccessHarness, TimingSample};
pub use matrix::{geometric_sweep, AccessMatrix, AccessPattern, BenchmarkCase, ExtentPolicy, TransferPolicy};
pub use probe::is_supported;
pub use report::{render, render_json, render_text, OutputFormat, TimeUnit};
pub use selector::{select_device, select_device_or_exit, select_from, DeviceCache, DeviceCategory, Rank};
pub use stats::Aggregate;
pub use store::BackingStore;
pub use timer::{IterationState, Phase, TimingMode};
