//! Fork orchestration.
//!
//! Cases run one after another and the forks of a case run one after another;
//! nothing is parallel so forks never compete for the CPU. A failed fork is
//! recorded and the executor moves on.

use crate::config::BenchConfig;
use crate::digest::BenchCase;
use crate::error::{BenchError, BenchResult};
use crate::report::{BenchmarkReport, CaseReport};
use crate::stats::TrialResult;
use crate::trial::{run_trial, TrialSpec, KILL_GRACE};
use crate::utils::Logger;
use crossbeam_channel::{bounded, RecvTimeoutError};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// Runs one fork somewhere and hands back its result.
pub trait TrialLauncher {
    fn launch(&self, spec: &TrialSpec) -> BenchResult<TrialResult>;
}

impl<F> TrialLauncher for F
where
    F: Fn(&TrialSpec) -> BenchResult<TrialResult>,
{
    fn launch(&self, spec: &TrialSpec) -> BenchResult<TrialResult> {
        self(spec)
    }
}

/// Runs forks inside the calling process. No isolation, but no spawn cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessLauncher;

impl TrialLauncher for InProcessLauncher {
    fn launch(&self, spec: &TrialSpec) -> BenchResult<TrialResult> {
        run_trial(spec)
    }
}

/// Runs every fork in a fresh OS process by re-executing `program worker`.
///
/// The worker answers with one JSON line on stdout. The parent reads it on a
/// helper thread so it can give up after the fork timeout and kill the child.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Launcher that re-executes the running binary.
    pub fn current_exe() -> BenchResult<Self> {
        std::env::current_exe()
            .map(Self::new)
            .map_err(|e| BenchError::config(format!("cannot locate own executable: {e}")))
    }
}

impl TrialLauncher for ProcessLauncher {
    fn launch(&self, spec: &TrialSpec) -> BenchResult<TrialResult> {
        let payload = serde_json::to_string(spec)
            .map_err(|e| BenchError::execution(format!("encode trial: {e}")))?;
        let wait_limit = match spec.config.fork_timeout {
            Some(limit) => Some((limit, parent_wait(limit)?)),
            None => None,
        };

        let mut child = Command::new(&self.program)
            .arg("worker")
            .arg("--trial")
            .arg(&payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BenchError::execution(format!("spawn {}: {e}", self.program.display()))
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| BenchError::execution("worker stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| BenchError::execution("worker stderr not captured"))?;

        let (sender, receiver) = bounded::<std::io::Result<String>>(1);
        thread::spawn(move || {
            let mut out = String::new();
            let result = stdout.read_to_string(&mut out).map(|_| out);
            let _ = sender.send(result);
        });
        let stderr_handle = thread::spawn(move || {
            let mut err = String::new();
            let _ = stderr.read_to_string(&mut err);
            err
        });

        let received = match wait_limit {
            Some((limit, wait)) => match receiver.recv_timeout(wait) {
                Ok(received) => received,
                Err(RecvTimeoutError::Timeout) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BenchError::execution(format!(
                        "fork {} killed after exceeding {:?}",
                        spec.fork, limit
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BenchError::execution("worker output reader stopped"));
                }
            },
            None => receiver
                .recv()
                .map_err(|_| BenchError::execution("worker output reader stopped"))?,
        };

        let status = child
            .wait()
            .map_err(|e| BenchError::execution(format!("wait for worker: {e}")))?;
        let stderr = stderr_handle.join().unwrap_or_default();
        let stdout =
            received.map_err(|e| BenchError::execution(format!("read worker output: {e}")))?;

        if !status.success() {
            return Err(BenchError::execution(format!(
                "worker exited with {status}: {}",
                stderr.trim()
            )));
        }
        parse_worker_reply(&stdout)
    }
}

/// How long the parent waits for a worker before killing it.
fn parent_wait(limit: Duration) -> BenchResult<Duration> {
    limit
        .checked_add(KILL_GRACE)
        .ok_or_else(|| BenchError::config(format!("fork timeout {limit:?} is too large")))
}

/// Decodes the last non-empty stdout line of a worker.
pub fn parse_worker_reply(stdout: &str) -> BenchResult<TrialResult> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| BenchError::execution("worker produced no result"))?;
    serde_json::from_str::<BenchResult<TrialResult>>(line)
        .map_err(|e| BenchError::execution(format!("malformed worker reply: {e}")))?
}

/// What happened to one fork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ForkOutcome {
    Completed { fork: usize, result: TrialResult },
    Failed { fork: usize, error: BenchError },
}

impl ForkOutcome {
    pub fn fork(&self) -> usize {
        match self {
            ForkOutcome::Completed { fork, .. } | ForkOutcome::Failed { fork, .. } => *fork,
        }
    }

    pub fn result(&self) -> Option<&TrialResult> {
        match self {
            ForkOutcome::Completed { result, .. } => Some(result),
            ForkOutcome::Failed { .. } => None,
        }
    }
}

pub struct ForkedTrialExecutor<L> {
    launcher: L,
    config: BenchConfig,
    logger: Option<Logger>,
    progress: ProgressBar,
}

impl<L: TrialLauncher> ForkedTrialExecutor<L> {
    /// Validates `config` up front so a bad setting never reaches a fork.
    pub fn new(launcher: L, config: BenchConfig) -> BenchResult<Self> {
        config.validate()?;
        Ok(Self {
            launcher,
            config,
            logger: None,
            progress: ProgressBar::hidden(),
        })
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every fork of `case`.
    pub fn execute(&self, case: BenchCase) -> CaseReport {
        let mut outcomes = Vec::with_capacity(self.config.forks);

        for fork in 0..self.config.forks {
            self.progress
                .set_message(format!("{case} fork {}/{}", fork + 1, self.config.forks));

            let spec = TrialSpec::new(case, fork, &self.config);
            let outcome = match self.launcher.launch(&spec) {
                Ok(result) => ForkOutcome::Completed { fork, result },
                Err(error) => ForkOutcome::Failed { fork, error },
            };
            self.log_outcome(case, &outcome);
            outcomes.push(outcome);
            self.progress.inc(1);
        }

        CaseReport { case, outcomes }
    }

    pub fn execute_all(&self, cases: &[BenchCase]) -> BenchmarkReport {
        self.progress
            .set_length((cases.len() * self.config.forks) as u64);
        let cases = cases.iter().map(|&case| self.execute(case)).collect();
        self.progress.finish_with_message("Benchmark finished.");

        BenchmarkReport {
            forks: self.config.forks,
            time_unit: self.config.time_unit,
            cases,
        }
    }

    fn log_outcome(&self, case: BenchCase, outcome: &ForkOutcome) {
        let Some(logger) = &self.logger else {
            return;
        };
        let message = match outcome {
            ForkOutcome::Completed { fork, result } => format!(
                "{case} fork {fork}: {} samples, mean {:?} (min {:?}, max {:?})",
                result.count, result.mean, result.min, result.max
            ),
            ForkOutcome::Failed { fork, error } => format!("{case} fork {fork} failed: {error}"),
        };
        if let Err(e) = logger.log(&message) {
            eprintln!("Failed to write log: {}", e);
        }
    }
}
