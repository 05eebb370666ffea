//! Convenience macros for performance tracing

/// Create a performance span with automatic field capture.
///
/// Returns a guard that logs timing when dropped.
///
/// ```rust
/// use access_tracing::perf_span;
///
/// {
///     let _span = perf_span!("identity_kernel", elements = 1024);
///     // ... operation code ...
/// }
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        $crate::performance::PerformanceSpan::with_span(
            $crate::__private::tracing::debug_span!(
                "perf",
                name = %$name,
                $($field = $value),+
            ),
            None,
        )
    }};
}

/// Execute a block of code with automatic timing.
///
/// Evaluates to `(result, duration_us)`.
///
/// ```rust
/// use access_tracing::timed_block;
///
/// let (sum, duration_us) = timed_block!("sum_calculation", {
///     (1..=100).sum::<i32>()
/// });
/// assert_eq!(sum, 5050);
/// let _ = duration_us;
/// ```
#[macro_export]
macro_rules! timed_block {
    ($name:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = $block;
        let duration_us = start.elapsed().as_micros() as u64;
        $crate::__private::tracing::debug!(
            operation = $name,
            duration_us = duration_us,
            duration_ms = duration_us as f64 / 1000.0,
            "timed_block_complete"
        );
        (result, duration_us)
    }};
}
