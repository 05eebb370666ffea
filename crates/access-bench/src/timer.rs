//! Phase-aware timing for one repetition
//!
//! Only time spent in [`Phase::Measured`] counts. Setup and validation run
//! with the clock paused.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Which clock drives the measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Real elapsed time
    WallClock,
    /// CPU time consumed by every thread of the process
    ProcessTime,
}

impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingMode::WallClock => write!(f, "wall"),
            TimingMode::ProcessTime => write!(f, "process"),
        }
    }
}

impl FromStr for TimingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wall" | "real" | "wall-clock" => Ok(TimingMode::WallClock),
            "process" | "cpu" | "process-time" => Ok(TimingMode::ProcessTime),
            other => Err(format!("unknown timing mode {other:?} (expected wall or process)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Store reset and context construction
    Setup,
    /// Work that counts toward the sample
    Measured,
    /// Result checking on the host
    Validation,
}

/// Phase markers and accumulated measured time for one repetition
#[derive(Debug)]
pub struct IterationState {
    mode: TimingMode,
    origin: Instant,
    phase: Phase,
    started_at: Duration,
    measured: Duration,
}

impl IterationState {
    /// Starts in [`Phase::Setup`] with nothing measured
    pub fn new(mode: TimingMode) -> Self {
        Self {
            mode,
            origin: Instant::now(),
            phase: Phase::Setup,
            started_at: Duration::ZERO,
            measured: Duration::ZERO,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> TimingMode {
        self.mode
    }

    /// Move to `phase`, starting or stopping the clock as needed
    pub fn enter(&mut self, phase: Phase) {
        if phase == self.phase {
            return;
        }
        let now = self.read_clock();
        if self.phase == Phase::Measured {
            self.measured += now.saturating_sub(self.started_at);
        }
        if phase == Phase::Measured {
            self.started_at = now;
        }
        self.phase = phase;
    }

    /// Measured time so far, including a still-open measured phase
    pub fn measured(&self) -> Duration {
        if self.phase == Phase::Measured {
            self.measured + self.read_clock().saturating_sub(self.started_at)
        } else {
            self.measured
        }
    }

    fn read_clock(&self) -> Duration {
        match self.mode {
            TimingMode::WallClock => self.origin.elapsed(),
            TimingMode::ProcessTime => process_cpu_time(),
        }
    }
}

#[cfg(unix)]
fn process_cpu_time() -> Duration {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        tracing::warn!("clock_gettime(CLOCK_PROCESS_CPUTIME_ID) failed");
        return Duration::ZERO;
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

#[cfg(not(unix))]
fn process_cpu_time() -> Duration {
    use std::sync::OnceLock;
    // No portable process clock; fall back to wall time since first use.
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    ORIGIN.get_or_init(Instant::now).elapsed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn only_measured_phase_counts() {
        let mut state = IterationState::new(TimingMode::WallClock);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(state.measured(), Duration::ZERO);

        state.enter(Phase::Measured);
        thread::sleep(Duration::from_millis(5));
        state.enter(Phase::Validation);
        let after_measure = state.measured();
        assert!(after_measure >= Duration::from_millis(5));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(state.measured(), after_measure);
        assert_eq!(state.phase(), Phase::Validation);
    }

    #[test]
    fn measured_intervals_accumulate() {
        let mut state = IterationState::new(TimingMode::WallClock);
        state.enter(Phase::Measured);
        thread::sleep(Duration::from_millis(2));
        state.enter(Phase::Setup);
        state.enter(Phase::Measured);
        // re-entering the current phase is a no-op
        state.enter(Phase::Measured);
        thread::sleep(Duration::from_millis(2));
        assert!(state.measured() >= Duration::from_millis(4));
    }

    #[test]
    fn process_time_advances_with_work() {
        let mut state = IterationState::new(TimingMode::ProcessTime);
        state.enter(Phase::Measured);
        let mut acc = 0u64;
        for i in 0..5_000_000u64 {
            acc = std::hint::black_box(acc.wrapping_mul(31).wrapping_add(i));
        }
        state.enter(Phase::Setup);
        assert!(state.measured() > Duration::ZERO);
    }

    #[test]
    fn timing_mode_parsing() {
        assert_eq!("wall".parse::<TimingMode>().unwrap(), TimingMode::WallClock);
        assert_eq!("Process".parse::<TimingMode>().unwrap(), TimingMode::ProcessTime);
        assert!("sundial".parse::<TimingMode>().is_err());
        assert_eq!(TimingMode::ProcessTime.to_string(), "process");
    }
}
