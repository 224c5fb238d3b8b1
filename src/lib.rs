pub mod config;
pub mod digest;
pub mod error;
pub mod executor;
pub mod fixture;
pub mod report;
pub mod runner;
pub mod stats;
pub mod trial;
pub mod utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;

use config::{positive_secs, BenchConfig, PhasePolicy, TimeUnit};
use digest::BenchCase;
use error::BenchResult;
use executor::{ForkedTrialExecutor, InProcessLauncher, ProcessLauncher, TrialLauncher};
use fixture::DEFAULT_INPUT_SIZE;
use report::{BenchmarkReport, Reporter};
use trial::{run_trial, TrialSpec};
use utils::{format_bytes, Logger};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Benchmark digest implementations against each other
    Run(RunArgs),

    /// Run a single fork and print its result as JSON
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Implementations to benchmark (rustcrypto, openssl, ring); all if omitted
    #[arg(short, long = "implementation", value_delimiter = ',')]
    pub implementations: Vec<String>,

    /// Algorithms to benchmark (md5, sha1, sha-256); all if omitted
    #[arg(short, long = "algorithm", value_delimiter = ',')]
    pub algorithms: Vec<String>,

    /// Number of isolated forks per case
    #[arg(long, default_value_t = 2)]
    pub forks: usize,

    /// Warmup iterations per fork
    #[arg(long, conflicts_with = "warmup_time")]
    pub warmup_iterations: Option<u64>,

    /// Warmup time per fork in seconds (default: 25)
    #[arg(long)]
    pub warmup_time: Option<f64>,

    /// Measured iterations per fork
    #[arg(long, conflicts_with = "measurement_time")]
    pub measurement_iterations: Option<u64>,

    /// Measurement time per fork in seconds (default: 4)
    #[arg(long)]
    pub measurement_time: Option<f64>,

    /// Size of the random input in bytes
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE)]
    pub input_size: usize,

    /// Unit used in the report
    #[arg(long, value_enum, default_value_t = TimeUnit::Milliseconds)]
    pub time_unit: TimeUnit,

    /// Kill a fork after this many seconds
    #[arg(long)]
    pub fork_timeout: Option<f64>,

    /// Seed for the input generator (fork n uses seed + n)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Leave hex encoding of the digest out of the timed region
    #[arg(long)]
    pub no_hex: bool,

    /// Run forks inside this process instead of spawning workers
    #[arg(long)]
    pub in_process: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Audit log file path
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl RunArgs {
    pub fn to_config(&self) -> BenchResult<BenchConfig> {
        let defaults = BenchConfig::default();
        let config = BenchConfig {
            forks: self.forks,
            warmup: PhasePolicy::from_options(
                "warmup",
                self.warmup_iterations,
                self.warmup_time,
                defaults.warmup,
            )?,
            measurement: PhasePolicy::from_options(
                "measurement",
                self.measurement_iterations,
                self.measurement_time,
                defaults.measurement,
            )?,
            input_size: self.input_size,
            time_unit: self.time_unit,
            fork_timeout: self
                .fork_timeout
                .map(|secs| positive_secs("fork timeout", secs))
                .transpose()?,
            seed: self.seed,
            encode_hex: !self.no_hex,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct WorkerArgs {
    /// Trial specification as JSON
    #[arg(long)]
    pub trial: String,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => {
            let report = run_benchmark(&args)?;
            write_report(&args, &report)
        }
        Command::Worker(args) => run_worker(&args),
    }
}

/// Resolves and validates everything, then runs every selected case.
/// Configuration problems surface here before the first fork starts.
pub fn run_benchmark(args: &RunArgs) -> Result<BenchmarkReport> {
    let cases = BenchCase::select(&args.implementations, &args.algorithms)?;
    let config = args.to_config()?;
    let logger = args.log.as_ref().map(Logger::new);

    eprintln!(
        "Benchmarking {} cases x {} forks over {} of input...",
        cases.len(),
        config.forks,
        format_bytes(config.input_size as u64)
    );
    if let Some(logger) = &logger {
        logger.log(&format!(
            "Run started: {} cases, {} forks, warmup {:?}, measurement {:?}, input {} bytes",
            cases.len(),
            config.forks,
            config.warmup,
            config.measurement,
            config.input_size
        ))?;
    }

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg}\n[{bar:40.cyan/blue}] {pos}/{len} forks ({elapsed})")?
                .progress_chars("=>-"),
        );
        pb
    };

    let report = if args.in_process {
        execute_cases(InProcessLauncher, config, &cases, logger.clone(), progress)?
    } else {
        let launcher = ProcessLauncher::current_exe()?;
        execute_cases(launcher, config, &cases, logger.clone(), progress)?
    };

    if let Some(logger) = &logger {
        logger.log(&format!(
            "Run finished: {} failed forks",
            report.failed_forks()
        ))?;
    }
    Ok(report)
}

fn execute_cases<L: TrialLauncher>(
    launcher: L,
    config: BenchConfig,
    cases: &[BenchCase],
    logger: Option<Logger>,
    progress: ProgressBar,
) -> BenchResult<BenchmarkReport> {
    let mut executor = ForkedTrialExecutor::new(launcher, config)?.with_progress(progress);
    if let Some(logger) = logger {
        executor = executor.with_logger(logger);
    }
    Ok(executor.execute_all(cases))
}

fn write_report(args: &RunArgs, report: &BenchmarkReport) -> Result<()> {
    let reporter = Reporter::new(report.time_unit);
    let mut rendered = match args.format {
        OutputFormat::Table => reporter.render(report),
        OutputFormat::Json => reporter.render_json(report)?,
    };
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            eprintln!("Report written to {:?}", path);
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

/// Worker side of a forked trial: exactly one JSON line on stdout, either
/// `{"Ok": ...}` or `{"Err": ...}`.
pub fn run_worker(args: &WorkerArgs) -> Result<()> {
    let spec: TrialSpec =
        serde_json::from_str(&args.trial).context("Invalid trial specification")?;
    let reply = run_trial(&spec);
    println!("{}", serde_json::to_string(&reply)?);
    Ok(())
}
