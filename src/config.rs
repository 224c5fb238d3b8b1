use crate::error::{BenchError, BenchResult};
use crate::fixture::DEFAULT_INPUT_SIZE;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit used when presenting durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[value(name = "ns")]
    Nanoseconds,
    #[value(name = "us")]
    Microseconds,
    #[default]
    #[value(name = "ms")]
    Milliseconds,
    #[value(name = "s")]
    Seconds,
}

impl TimeUnit {
    pub fn label(&self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }

    pub fn convert(&self, duration: Duration) -> f64 {
        let nanos = duration.as_nanos() as f64;
        match self {
            TimeUnit::Nanoseconds => nanos,
            TimeUnit::Microseconds => nanos / 1e3,
            TimeUnit::Milliseconds => nanos / 1e6,
            TimeUnit::Seconds => nanos / 1e9,
        }
    }
}

/// Longest accepted fork timeout (one week).
pub const MAX_FORK_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// How long a warmup or measurement phase lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhasePolicy {
    /// Exactly this many iterations.
    Iterations(u64),
    /// Whole iterations until this much wall-clock time has passed.
    Time(Duration),
}

impl PhasePolicy {
    /// Builds a policy from the mutually exclusive count/seconds options,
    /// falling back to `default` when neither is given.
    pub fn from_options(
        phase: &str,
        iterations: Option<u64>,
        seconds: Option<f64>,
        default: PhasePolicy,
    ) -> BenchResult<Self> {
        match (iterations, seconds) {
            (Some(_), Some(_)) => Err(BenchError::config(format!(
                "{phase}: iterations and time are mutually exclusive"
            ))),
            (Some(n), None) => Ok(PhasePolicy::Iterations(n)),
            (None, Some(secs)) => Ok(PhasePolicy::Time(positive_secs(phase, secs)?)),
            (None, None) => Ok(default),
        }
    }

    fn validate(&self, phase: &str) -> BenchResult<()> {
        match self {
            PhasePolicy::Time(d) if d.is_zero() => Err(BenchError::config(format!(
                "{phase} time must be positive"
            ))),
            _ => Ok(()),
        }
    }
}

/// Parses a positive number of seconds.
pub fn positive_secs(what: &str, secs: f64) -> BenchResult<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(BenchError::config(format!(
            "{what} must be a positive number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| BenchError::config(format!("{what}: {e}")))
}

/// Settings shared by every fork of a run. Also the payload handed to forked
/// workers, hence serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    pub forks: usize,
    pub warmup: PhasePolicy,
    pub measurement: PhasePolicy,
    pub input_size: usize,
    pub time_unit: TimeUnit,
    /// Wall-clock budget for one fork (warmup + measurement).
    pub fork_timeout: Option<Duration>,
    /// Fork `n` seeds its fixture with `seed + n`.
    pub seed: Option<u64>,
    /// Hex-encode each digest inside the timed region.
    pub encode_hex: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            forks: 2,
            warmup: PhasePolicy::Time(Duration::from_secs(25)),
            measurement: PhasePolicy::Time(Duration::from_secs(4)),
            input_size: DEFAULT_INPUT_SIZE,
            time_unit: TimeUnit::Milliseconds,
            fork_timeout: None,
            seed: None,
            encode_hex: true,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> BenchResult<()> {
        if self.forks == 0 {
            return Err(BenchError::config("fork count must be at least 1"));
        }
        if self.input_size == 0 {
            return Err(BenchError::config("input size must be at least one byte"));
        }
        self.warmup.validate("warmup")?;
        self.measurement.validate("measurement")?;
        if let Some(timeout) = self.fork_timeout {
            if timeout.is_zero() {
                return Err(BenchError::config("fork timeout must be positive"));
            }
            if timeout > MAX_FORK_TIMEOUT {
                return Err(BenchError::config(format!(
                    "fork timeout must not exceed {:?}, got {:?}",
                    MAX_FORK_TIMEOUT, timeout
                )));
            }
        }
        Ok(())
    }

    pub fn fixture_seed(&self, fork: usize) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(fork as u64))
    }
}
