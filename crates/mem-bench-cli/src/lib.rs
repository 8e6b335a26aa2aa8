#![forbid(unsafe_code)]

//! `mem-bench`: compare a reference memory store against the native one.

pub mod pipeline;
pub mod process;
pub mod provision;
pub mod reference;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mem_bench_core::{BenchConfig, BenchError, ComparisonReport, SummaryMode};
use tracing_subscriber::EnvFilter;

use crate::pipeline::{Pipeline, RunOutcome};
use crate::process::{ProcessRunner, SystemProcessRunner};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Bench(#[from] BenchError),
}

impl CliError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::Bench(BenchError::InvalidConfig(_)) => 2,
            Self::Bench(_) => 1,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(
    name = "mem-bench",
    version,
    about = "Benchmark a reference memory store against the native implementation"
)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,
    /// Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags layered over `MEM_BENCH_*` environment configuration.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Delete and reinstall the reference environment. Irreversible.
    #[arg(long, global = true)]
    pub force_refresh: bool,
    /// `immediate` or `deferred`.
    #[arg(long, global = true)]
    pub summary_mode: Option<SummaryMode>,
    #[arg(long, global = true)]
    pub iterations: Option<u32>,
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    #[arg(long, global = true)]
    pub results_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    pub vendor_root: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, config: &mut BenchConfig) {
        if self.force_refresh {
            config.force_refresh = true;
        }
        if let Some(mode) = self.summary_mode {
            config.summary_mode = mode;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(dir) = &self.results_dir {
            config.results_dir.clone_from(dir);
        }
        if let Some(dir) = &self.vendor_root {
            config.vendor_root.clone_from(dir);
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision, measure both implementations, and write a comparison report.
    Run,
    /// Provision and measure the reference only; candidate results are zeroed.
    Reference,
    /// Measure the native implementation and write its raw suites.
    Candidate,
    /// Merge raw suite files into a comparison report.
    Compare {
        /// Raw reference suites. Defaults to the environment's raw results file.
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Raw candidate suites, as written by `candidate`.
        #[arg(long)]
        candidate: Option<PathBuf>,
    },
    /// Recompute the summaries of a deferred report into a new report.
    Finalize { report: PathBuf },
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing();
    match execute(cli, &SystemProcessRunner) {
        Ok(()) => 0,
        Err(err) => {
            if let CliError::Bench(inner) = &err {
                tracing::debug!(kind = inner.kind(), "run aborted");
            }
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Resolve configuration and dispatch `cli` using `runner` for every
/// external process.
pub fn execute(cli: Cli, runner: &dyn ProcessRunner) -> CliResult<()> {
    let mut config = BenchConfig::from_env();
    cli.overrides.apply(&mut config);
    config.validate()?;

    let pipeline = Pipeline::new(&config, runner);
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => print_outcome(&pipeline.run_full()?),
        Commands::Reference => print_outcome(&pipeline.run_reference_phase()?),
        Commands::Candidate => {
            let path = pipeline.run_candidate_phase()?;
            println!("candidate results: {}", path.display());
        }
        Commands::Compare {
            reference,
            candidate,
        } => {
            let reference = reference.unwrap_or_else(|| config.raw_results_path());
            print_outcome(&pipeline.compare(Some(&reference), candidate.as_deref())?);
        }
        Commands::Finalize { report } => {
            if !report.is_file() {
                return Err(CliError::InvalidArgument(format!(
                    "report {} does not exist",
                    report.display()
                )));
            }
            print_outcome(&pipeline.finalize(&report)?);
        }
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    println!("report: {}", outcome.report_path.display());
    println!("summary: {}", outcome.summary_path.display());
    print!("{}", render_summary(&outcome.report));
}

/// Fixed-width summary table, one row per summary entry.
fn render_summary(report: &ComparisonReport) -> String {
    let mut out = format!(
        "{:<24} {:>14} {:>14} {:>10}\n",
        "suite", "reference ms", "candidate ms", "speedup"
    );
    for (name, entry) in &report.comparison.summary {
        let speedup = if entry.speedup_factor == 0.0 {
            "n/a".to_string()
        } else {
            format!("{:.2}x", entry.speedup_factor)
        };
        out.push_str(&format!(
            "{name:<24} {:>14.4} {:>14.4} {speedup:>10}\n",
            entry.reference_avg_ms, entry.candidate_avg_ms
        ));
    }
    out
}
