//! Text and JSON reports

use crate::driver::{CaseReport, SizeOutcome, SizeResult};
use crate::error::Result;
use crate::stats::Aggregate;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
}

impl TimeUnit {
    pub const fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Nanosecond => "ns",
            TimeUnit::Microsecond => "us",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Second => "s",
        }
    }

    pub fn convert(self, duration: Duration) -> f64 {
        self.convert_secs(duration.as_secs_f64())
    }

    /// Scale a value in seconds; sub-nanosecond values are kept
    pub fn convert_secs(self, secs: f64) -> f64 {
        match self {
            TimeUnit::Nanosecond => secs * 1e9,
            TimeUnit::Microsecond => secs * 1e6,
            TimeUnit::Millisecond => secs * 1e3,
            TimeUnit::Second => secs,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ns" | "nanosecond" | "nanoseconds" => Ok(TimeUnit::Nanosecond),
            "us" | "microsecond" | "microseconds" => Ok(TimeUnit::Microsecond),
            "ms" | "millisecond" | "milliseconds" => Ok(TimeUnit::Millisecond),
            "s" | "second" | "seconds" => Ok(TimeUnit::Second),
            other => Err(format!("unknown time unit {other:?} (expected ns, us, ms or s)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "console" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format {other:?} (expected text or json)")),
        }
    }
}

/// Render `reports` in `format`
pub fn render(reports: &[CaseReport], unit: TimeUnit, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(reports, unit)),
        OutputFormat::Json => render_json(reports, unit),
    }
}

const NAME_WIDTH: usize = 48;

/// Console table, one row per case and size plus complexity rows
pub fn render_text(reports: &[CaseReport], unit: TimeUnit) -> String {
    let mut out = String::new();
    let header = format!(
        "{:<NAME_WIDTH$} {:>12} {:>12} {:>12} {:>8} {:>12} {:>12} {:>5} {:>6}  {}",
        "Benchmark", "Mean", "Median", "StdDev", "CV", "Min", "Max", "Reps", "Errors", "Status"
    );
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", "-".repeat(header.len()));

    for report in reports {
        for size in &report.sizes {
            let name = format!("{}/{}", report.name, size.n);
            let _ = writeln!(out, "{}", text_row(&name, size, unit));
        }
        if let Some(fit) = report.complexity {
            let _ = writeln!(
                out,
                "{:<NAME_WIDTH$} {:>12.4} {} {}",
                format!("{}_BigO", report.name),
                unit.convert_secs(fit.coefficient),
                unit,
                fit.big_o
            );
            let _ = writeln!(
                out,
                "{:<NAME_WIDTH$} {:>11.2} %",
                format!("{}_RMS", report.name),
                fit.rms * 100.0
            );
        }
    }
    out
}

fn text_row(name: &str, size: &SizeResult, unit: TimeUnit) -> String {
    let time = |pick: fn(&Aggregate) -> Duration| match &size.aggregate {
        Some(agg) => format!("{:.3} {}", unit.convert(pick(agg)), unit),
        None => "-".to_string(),
    };
    let cv = match &size.aggregate {
        Some(agg) => format!("{:.2} %", agg.coefficient_of_variation() * 100.0),
        None => "-".to_string(),
    };
    format!(
        "{:<NAME_WIDTH$} {:>12} {:>12} {:>12} {:>8} {:>12} {:>12} {:>5} {:>6}  {}",
        name,
        time(|a| a.mean),
        time(|a| a.median),
        time(|a| a.stddev),
        cv,
        time(|a| a.min),
        time(|a| a.max),
        size.succeeded(),
        size.errored,
        status(&size.outcome)
    )
}

fn status(outcome: &SizeOutcome) -> String {
    match outcome {
        SizeOutcome::Completed => "ok".to_string(),
        SizeOutcome::ValidationFailed {
            index,
            expected,
            observed,
        } => format!("validation failed at {index}: expected {expected}, observed {observed}"),
        SizeOutcome::Aborted { reason } => format!("aborted: {reason}"),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    time_unit: TimeUnit,
    benchmarks: Vec<JsonCase<'a>>,
}

#[derive(Serialize)]
struct JsonCase<'a> {
    name: &'a str,
    category: crate::selector::DeviceCategory,
    pattern: &'static str,
    sizes: Vec<JsonSize<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    complexity: Option<JsonComplexity>,
}

#[derive(Serialize)]
struct JsonSize<'a> {
    n: usize,
    attempted: usize,
    succeeded: usize,
    errored: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stddev: Option<f64>,
    /// `stddev / mean`, unitless
    #[serde(skip_serializing_if = "Option::is_none")]
    cv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    errors: &'a [String],
    outcome: &'a SizeOutcome,
}

#[derive(Serialize)]
struct JsonComplexity {
    big_o: crate::complexity::BigO,
    coefficient: f64,
    rms: f64,
}

/// Machine-readable report with times converted to `unit`
pub fn render_json(reports: &[CaseReport], unit: TimeUnit) -> Result<String> {
    let benchmarks = reports
        .iter()
        .map(|report| JsonCase {
            name: &report.name,
            category: report.category,
            pattern: report.pattern.name(),
            sizes: report
                .sizes
                .iter()
                .map(|size| {
                    let pick = |f: fn(&Aggregate) -> Duration| size.aggregate.as_ref().map(|a| unit.convert(f(a)));
                    JsonSize {
                        n: size.n,
                        attempted: size.attempted,
                        succeeded: size.succeeded(),
                        errored: size.errored,
                        mean: pick(|a| a.mean),
                        median: pick(|a| a.median),
                        stddev: pick(|a| a.stddev),
                        cv: size.aggregate.as_ref().map(Aggregate::coefficient_of_variation),
                        min: pick(|a| a.min),
                        max: pick(|a| a.max),
                        errors: &size.errors,
                        outcome: &size.outcome,
                    }
                })
                .collect(),
            complexity: report.complexity.map(|fit| JsonComplexity {
                big_o: fit.big_o,
                coefficient: unit.convert_secs(fit.coefficient),
                rms: fit.rms,
            }),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&JsonReport {
        time_unit: unit,
        benchmarks,
    })?)
}
