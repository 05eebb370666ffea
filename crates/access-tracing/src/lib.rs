//! Tracing setup shared by the buffer-access binary, benches and tests.
//!
//! Every entry point installs its subscriber through [`init_global_tracing`]
//! so log lines look the same whichever one produced them. Configuration is
//! environment-first:
//!
//! | Variable                   | Meaning                                        |
//! |----------------------------|------------------------------------------------|
//! | `ACCESS_TRACING_PROFILE`   | `local` (default), `ci` or `performance`       |
//! | `ACCESS_TRACING_DIRECTIVES`| filter directives, e.g. `access_bench=debug`   |
//! | `ACCESS_TRACING_FORMAT`    | `pretty`, `compact` or `json`                  |
//! | `ACCESS_PERF_TRACING`      | emit [`performance::PerformanceSpan`] events   |
//! | `ACCESS_PERF_THRESHOLD_US` | drop performance spans faster than this        |
//!
//! Without directives the filter falls back to `RUST_LOG`, then to the
//! profile's default directive. Log lines go to stderr.

pub mod performance;

#[macro_use]
pub mod macros;

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}

use std::env;
use std::str::FromStr;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter, Registry};

/// Named presets selected by `ACCESS_TRACING_PROFILE`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TracingProfile {
    /// Pretty, coloured output for a terminal
    #[default]
    Local,
    /// JSON lines without colour for log collectors
    Ci,
    /// JSON with span close events and debug output from the workspace crates
    Performance,
}

impl FromStr for TracingProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "dev" => Ok(Self::Local),
            "ci" => Ok(Self::Ci),
            "performance" | "perf" => Ok(Self::Performance),
            other => Err(format!("unknown tracing profile {other:?}")),
        }
    }
}

/// Formatter layer output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingOutput {
    Compact,
    Pretty,
    Json,
}

impl FromStr for TracingOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown tracing format {other:?}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Filter directives; `None` defers to `RUST_LOG`
    pub directives: Option<String>,
    /// Used when neither `directives` nor `RUST_LOG` is set
    pub default_directive: String,
    pub include_targets: bool,
    pub ansi: bool,
    pub span_events: FmtSpan,
    pub output: TracingOutput,
    /// Whether [`performance::PerformanceSpan`] logs on drop
    pub enable_performance_tracing: bool,
    pub performance_threshold_us: Option<u64>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_profile(TracingProfile::Local)
    }
}

impl TracingConfig {
    pub fn for_profile(profile: TracingProfile) -> Self {
        let base = Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: false,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Json,
            enable_performance_tracing: false,
            performance_threshold_us: None,
        };
        match profile {
            TracingProfile::Local => Self {
                ansi: true,
                output: TracingOutput::Pretty,
                enable_performance_tracing: cfg!(debug_assertions),
                ..base
            },
            TracingProfile::Ci => base,
            TracingProfile::Performance => Self {
                directives: Some("access_backends=debug,access_bench=debug,info".to_string()),
                span_events: FmtSpan::CLOSE,
                enable_performance_tracing: true,
                ..base
            },
        }
    }

    /// Read the `ACCESS_TRACING_*` / `ACCESS_PERF_*` variables
    ///
    /// Unparseable values are ignored rather than rejected; a bad logging
    /// variable should never stop a benchmark run.
    pub fn from_env() -> Self {
        let profile = env_value::<TracingProfile>("ACCESS_TRACING_PROFILE").unwrap_or_default();
        let mut config = Self::for_profile(profile);

        if let Ok(directives) = env::var("ACCESS_TRACING_DIRECTIVES") {
            if !directives.trim().is_empty() {
                config.directives = Some(directives);
            }
        }
        if let Some(output) = env_value::<TracingOutput>("ACCESS_TRACING_FORMAT") {
            config.output = output;
            if output == TracingOutput::Json {
                config.ansi = false;
            }
        }
        if let Ok(flag) = env::var("ACCESS_PERF_TRACING") {
            config.enable_performance_tracing = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(threshold) = env_value::<u64>("ACCESS_PERF_THRESHOLD_US") {
            config.performance_threshold_us = Some(threshold);
        }

        config
    }

    fn filter(&self) -> Result<EnvFilter, TracingSetupError> {
        match &self.directives {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|err| TracingSetupError::InvalidFilter(err.to_string()))
            }
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive))),
        }
    }

    fn format_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        // stdout carries the benchmark report
        let layer = tracing_fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(self.include_targets)
            .with_span_events(self.span_events.clone());
        match self.output {
            TracingOutput::Compact => Box::new(layer.compact().with_ansi(self.ansi)),
            TracingOutput::Pretty => Box::new(layer.pretty().with_ansi(self.ansi)),
            TracingOutput::Json => Box::new(layer.json().with_ansi(false)),
        }
    }
}

fn env_value<T: FromStr>(var: &str) -> Option<T> {
    env::var(var).ok().and_then(|value| value.parse().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum TracingSetupError {
    #[error("invalid tracing directive: {0}")]
    InvalidFilter(String),

    /// Usually a subscriber is already installed
    #[error("failed to install global tracing subscriber: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Subscriber for `config` without installing it
pub fn build_subscriber(config: &TracingConfig) -> Result<impl Subscriber + Send + Sync, TracingSetupError> {
    let filter = config.filter()?;
    Ok(Registry::default().with(config.format_layer()).with(filter))
}

/// Install the subscriber for `config` process-wide and apply its
/// performance-span settings
pub fn init_global_tracing(config: &TracingConfig) -> Result<(), TracingSetupError> {
    performance::configure(config.enable_performance_tracing, config.performance_threshold_us);
    build_subscriber(config)?.try_init()?;
    Ok(())
}
