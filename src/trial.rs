//! Body of one fork: build the fixture, warm up, measure, aggregate.

use crate::config::{BenchConfig, PhasePolicy};
use crate::digest::{new_adapter, BenchCase};
use crate::error::{BenchError, BenchResult};
use crate::fixture::InputFixture;
use crate::runner::IterationRunner;
use crate::stats::{aggregate, Sample, TrialResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Everything a fork needs to run on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub case: BenchCase,
    pub fork: usize,
    pub config: BenchConfig,
}

impl TrialSpec {
    pub fn new(case: BenchCase, fork: usize, config: &BenchConfig) -> Self {
        Self {
            case,
            fork,
            config: config.clone(),
        }
    }
}

/// Runs warmup and measurement for one fork, sequentially, in this process.
pub fn run_trial(spec: &TrialSpec) -> BenchResult<TrialResult> {
    aggregate(&collect_samples(spec)?)
}

/// Warmup iterations run and are discarded; only measurement samples are
/// kept.
fn collect_samples(spec: &TrialSpec) -> BenchResult<Vec<Sample>> {
    let deadline = match spec.config.fork_timeout {
        Some(timeout) => Some(Instant::now().checked_add(timeout).ok_or_else(|| {
            BenchError::config(format!("fork timeout {timeout:?} is too large"))
        })?),
        None => None,
    };

    let mut fixture = match spec.config.fixture_seed(spec.fork) {
        Some(seed) => InputFixture::with_seed(spec.config.input_size, seed)?,
        None => InputFixture::create(spec.config.input_size)?,
    };
    let mut runner = IterationRunner::new(spec.config.encode_hex);
    let case = spec.case;

    run_phase(spec.config.warmup, deadline, || {
        runner.run_once(&mut fixture, || new_adapter(case)).map(drop)
    })?;

    let mut samples = Vec::new();
    run_phase(spec.config.measurement, deadline, || {
        let elapsed = runner.run_once(&mut fixture, || new_adapter(case))?;
        samples.push(Sample::measurement(elapsed));
        Ok(())
    })?;
    Ok(samples)
}

fn run_phase<F>(
    policy: PhasePolicy,
    deadline: Option<Instant>,
    mut iteration: F,
) -> BenchResult<()>
where
    F: FnMut() -> BenchResult<()>,
{
    let started = Instant::now();
    let mut done = 0u64;
    loop {
        let finished = match policy {
            PhasePolicy::Iterations(n) => done >= n,
            PhasePolicy::Time(budget) => done > 0 && started.elapsed() >= budget,
        };
        if finished {
            return Ok(());
        }
        check_deadline(deadline)?;
        iteration()?;
        done += 1;
    }
}

fn check_deadline(deadline: Option<Instant>) -> BenchResult<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(BenchError::execution(
            "fork exceeded its wall-clock budget",
        )),
        _ => Ok(()),
    }
}

/// Extra time a forked worker gets before the parent kills it, so an
/// in-worker budget overrun can still report itself.
pub const KILL_GRACE: Duration = Duration::from_secs(1);
