//! Benchmark registration parameters
//!
//! Defaults reproduce the reference run: sizes 2^25..=2^28 doubling, one
//! repetition, wall-clock timing in milliseconds, complexity fit on.
//! Every field can be overridden from the environment (`ACCESS_BENCH_*`) and
//! the binary's flags override the environment.

use crate::report::TimeUnit;
use crate::timer::TimingMode;
use std::env;
use std::str::FromStr;

pub const DEFAULT_MIN_ELEMENTS: usize = 1 << 25;
pub const DEFAULT_MAX_ELEMENTS: usize = 1 << 28;
pub const DEFAULT_MULTIPLIER: usize = 2;
pub const DEFAULT_REPETITIONS: usize = 1;
pub const DEFAULT_GROUP_SIZE: usize = 64;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not valid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Smallest accessed element count in the sweep
    pub min_elements: usize,
    /// Largest accessed element count in the sweep
    pub max_elements: usize,
    /// Geometric step between sizes
    pub multiplier: usize,
    /// Timed repetitions per size
    pub repetitions: usize,
    pub timing_mode: TimingMode,
    /// Unit used when reporting times
    pub unit: TimeUnit,
    /// Fit an asymptotic order against the sweep
    pub complexity: bool,
    /// Backing store length for subrange cases
    pub subrange_store_elements: usize,
    /// Work-group size for the identity kernel
    pub group_size: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            min_elements: DEFAULT_MIN_ELEMENTS,
            max_elements: DEFAULT_MAX_ELEMENTS,
            multiplier: DEFAULT_MULTIPLIER,
            repetitions: DEFAULT_REPETITIONS,
            timing_mode: TimingMode::WallClock,
            unit: TimeUnit::Millisecond,
            complexity: true,
            subrange_store_elements: DEFAULT_MAX_ELEMENTS,
            group_size: DEFAULT_GROUP_SIZE,
        }
    }
}

impl BenchConfig {
    /// Small sweep suitable for tests and smoke runs
    pub fn quick() -> Self {
        Self {
            min_elements: 1 << 10,
            max_elements: 1 << 14,
            multiplier: 4,
            repetitions: 2,
            unit: TimeUnit::Microsecond,
            subrange_store_elements: 1 << 14,
            ..Self::default()
        }
    }

    /// Build a configuration using environment hints.
    ///
    /// # Environment Variables
    ///
    /// - `ACCESS_BENCH_MIN` / `ACCESS_BENCH_MAX` - sweep bounds (elements)
    /// - `ACCESS_BENCH_MULTIPLIER` - geometric step
    /// - `ACCESS_BENCH_REPETITIONS` - timed repetitions per size
    /// - `ACCESS_BENCH_TIMING` - `wall` or `process`
    /// - `ACCESS_BENCH_UNIT` - `ns`, `us`, `ms` or `s`
    /// - `ACCESS_BENCH_COMPLEXITY` - `true` or `false`
    /// - `ACCESS_BENCH_STORE` - subrange backing store length
    /// - `ACCESS_BENCH_GROUP` - work-group size
    ///
    /// When `ACCESS_BENCH_MAX` is raised above the store length and
    /// `ACCESS_BENCH_STORE` is unset, the store grows to match.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_var("ACCESS_BENCH_MIN")? {
            config.min_elements = v;
        }
        if let Some(v) = parse_var("ACCESS_BENCH_MAX")? {
            config.max_elements = v;
        }
        if let Some(v) = parse_var("ACCESS_BENCH_MULTIPLIER")? {
            config.multiplier = v;
        }
        if let Some(v) = parse_var("ACCESS_BENCH_REPETITIONS")? {
            config.repetitions = v;
        }
        if let Some(v) = parse_var("ACCESS_BENCH_TIMING")? {
            config.timing_mode = v;
        }
        if let Some(v) = parse_var("ACCESS_BENCH_UNIT")? {
            config.unit = v;
        }
        if let Some(v) = parse_var::<BoolFlag>("ACCESS_BENCH_COMPLEXITY")? {
            config.complexity = v.0;
        }
        match parse_var("ACCESS_BENCH_STORE")? {
            Some(v) => config.subrange_store_elements = v,
            None => config.subrange_store_elements = config.subrange_store_elements.max(config.max_elements),
        }
        if let Some(v) = parse_var("ACCESS_BENCH_GROUP")? {
            config.group_size = v;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_elements == 0 {
            return Err(ConfigError::Inconsistent("minimum size must be at least 1".into()));
        }
        if self.min_elements > self.max_elements {
            return Err(ConfigError::Inconsistent(format!(
                "minimum size {} exceeds maximum {}",
                self.min_elements, self.max_elements
            )));
        }
        if self.multiplier < 2 {
            return Err(ConfigError::Inconsistent("multiplier must be at least 2".into()));
        }
        if self.repetitions == 0 {
            return Err(ConfigError::Inconsistent("at least one repetition is required".into()));
        }
        if self.group_size == 0 {
            return Err(ConfigError::Inconsistent("group size must be non-zero".into()));
        }
        if self.subrange_store_elements < self.max_elements {
            return Err(ConfigError::Inconsistent(format!(
                "subrange store of {} elements cannot hold extent {}",
                self.subrange_store_elements, self.max_elements
            )));
        }
        Ok(())
    }
}

struct BoolFlag(bool);

impl FromStr for BoolFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(BoolFlag(true)),
            "0" | "false" | "no" | "off" => Ok(BoolFlag(false)),
            other => Err(format!("expected a boolean, got {other:?}")),
        }
    }
}

fn parse_var<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| ConfigError::InvalidValue {
                var,
                value,
                reason: err.to_string(),
            }),
        _ => Ok(None),
    }
}
