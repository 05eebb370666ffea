//! Performance-focused tracing utilities
//!
//! Timing spans with threshold filtering plus standard events for host/device
//! transfers and kernel throughput.
//!
//! ## Example
//!
//! ```rust
//! use access_tracing::performance::{record_transfer, PerformanceSpan, TransferDirection};
//!
//! let span = PerformanceSpan::new("copy_in", Some(100));
//! // ... do work ...
//! drop(span); // Logs only if duration > 100μs
//!
//! record_transfer(4096, TransferDirection::HostToDevice, 12);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::Level;

static PERF_ENABLED: AtomicBool = AtomicBool::new(true);
// u64::MAX means "no global threshold".
static PERF_THRESHOLD_US: AtomicU64 = AtomicU64::new(u64::MAX);

/// Apply process-wide performance span settings.
///
/// Called by [`crate::init_global_tracing`]; spans created afterwards honour
/// the new settings.
pub fn configure(enabled: bool, threshold_us: Option<u64>) {
    PERF_ENABLED.store(enabled, Ordering::Relaxed);
    PERF_THRESHOLD_US.store(threshold_us.unwrap_or(u64::MAX), Ordering::Relaxed);
}

/// Returns whether performance spans currently emit completion events.
pub fn is_enabled() -> bool {
    PERF_ENABLED.load(Ordering::Relaxed)
}

fn global_threshold() -> Option<u64> {
    match PERF_THRESHOLD_US.load(Ordering::Relaxed) {
        u64::MAX => None,
        value => Some(value),
    }
}

/// RAII guard that measures span duration and conditionally logs based on threshold.
///
/// # Example
///
/// ```rust
/// use access_tracing::performance::PerformanceSpan;
///
/// {
///     let _span = PerformanceSpan::new("expensive_operation", Some(1000));
///     // ... operation code ...
/// } // Span logged only if duration > 1000μs
/// ```
pub struct PerformanceSpan {
    threshold_us: Option<u64>,
    start_time: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// Create a new performance span with optional threshold filtering.
    ///
    /// When `threshold_us` is `None` the process-wide threshold set through
    /// [`configure`] applies.
    pub fn new(span_name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        Self::with_level(Level::DEBUG, span_name, threshold_us)
    }

    /// Create a new performance span at the specified tracing level.
    pub fn with_level(level: Level, span_name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let span_name = span_name.into();
        let span = match level {
            Level::TRACE => tracing::trace_span!("perf", name = %span_name),
            Level::DEBUG => tracing::debug_span!("perf", name = %span_name),
            Level::INFO => tracing::info_span!("perf", name = %span_name),
            Level::WARN => tracing::warn_span!("perf", name = %span_name),
            Level::ERROR => tracing::error_span!("perf", name = %span_name),
        };
        Self::with_span(span, threshold_us)
    }

    /// Time an already-built span, e.g. one carrying extra fields.
    ///
    /// The completion event is recorded inside `span`.
    pub fn with_span(span: tracing::Span, threshold_us: Option<u64>) -> Self {
        Self {
            threshold_us: threshold_us.or_else(global_threshold),
            start_time: Instant::now(),
            span,
        }
    }

    /// Get the elapsed time since span creation.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    /// Enter this span's context.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_us = self.elapsed_us();

        if self.threshold_us.is_none_or(|t| elapsed_us >= t) {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

/// Direction of a host/device transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    HostToDevice,
    DeviceToHost,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::HostToDevice => write!(f, "H2D"),
            TransferDirection::DeviceToHost => write!(f, "D2H"),
        }
    }
}

/// Bytes per second for a transfer; zero when the duration rounds to zero.
pub fn bandwidth_bytes_per_sec(bytes: usize, duration_us: u64) -> f64 {
    if duration_us == 0 {
        0.0
    } else {
        bytes as f64 / duration_us as f64 * 1_000_000.0
    }
}

/// Record a host/device transfer event with calculated bandwidth.
///
/// ```rust
/// use access_tracing::performance::{record_transfer, TransferDirection};
///
/// record_transfer(1 << 20, TransferDirection::DeviceToHost, 250);
/// ```
pub fn record_transfer(bytes: usize, direction: TransferDirection, duration_us: u64) {
    let bandwidth = bandwidth_bytes_per_sec(bytes, duration_us);
    tracing::debug!(
        event = "transfer",
        direction = %direction,
        bytes = bytes,
        duration_us = duration_us,
        bandwidth_gb_s = bandwidth / 1e9,
        "buffer_transfer"
    );
}

/// Record an element-throughput event (e.g. a completed kernel).
pub fn record_throughput(operation: &str, elements: usize, duration_us: u64) {
    let throughput = if duration_us > 0 {
        (elements as f64 / duration_us as f64) * 1_000_000.0
    } else {
        0.0
    };

    tracing::debug!(
        event = "throughput",
        operation = operation,
        elements = elements,
        duration_us = duration_us,
        elements_per_sec = throughput,
        "operation_throughput"
    );
}
