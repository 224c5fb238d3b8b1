//! Folding per-iteration samples into per-fork results.

use crate::error::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Warmup,
    Measurement,
}

/// Elapsed time of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub elapsed: Duration,
    pub phase: Phase,
}

impl Sample {
    pub fn warmup(elapsed: Duration) -> Self {
        Self {
            elapsed,
            phase: Phase::Warmup,
        }
    }

    pub fn measurement(elapsed: Duration) -> Self {
        Self {
            elapsed,
            phase: Phase::Measurement,
        }
    }
}

/// Summary of the measurement samples of one fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialResult {
    pub count: u64,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
}

/// Arithmetic mean over measurement-phase samples. Warmup samples are
/// skipped; no outlier rejection.
pub fn aggregate(samples: &[Sample]) -> BenchResult<TrialResult> {
    let mut count = 0u64;
    let mut total = 0u128;
    let mut min = Duration::MAX;
    let mut max = Duration::ZERO;

    for sample in samples.iter().filter(|s| s.phase == Phase::Measurement) {
        count += 1;
        total += sample.elapsed.as_nanos();
        min = min.min(sample.elapsed);
        max = max.max(sample.elapsed);
    }

    if count == 0 {
        return Err(BenchError::InsufficientData(format!(
            "no measurement samples among {} collected",
            samples.len()
        )));
    }

    Ok(TrialResult {
        count,
        mean: nanos_to_duration(total / count as u128),
        min,
        max,
    })
}

/// Mean of the per-fork means, `None` when no fork succeeded.
pub fn mean_of_means<'a, I>(results: I) -> Option<Duration>
where
    I: IntoIterator<Item = &'a TrialResult>,
{
    let (n, total) = results
        .into_iter()
        .fold((0u128, 0u128), |(n, total), r| (n + 1, total + r.mean.as_nanos()));
    if n == 0 {
        None
    } else {
        Some(nanos_to_duration(total / n))
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
