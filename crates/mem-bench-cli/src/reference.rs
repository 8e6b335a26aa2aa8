//! Reference-side measurement.
//!
//! The reference implementation is timed inside its own interpreter: a
//! bundled driver is written into the provisioned environment and run with
//! the environment's Python. The driver writes a raw suite set to a known
//! path, which is read back once the process exits cleanly.

#![forbid(unsafe_code)]

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use mem_bench_core::{BenchError, Result, SuiteSet, Workload, load_json};

use crate::process::{CommandSpec, ProcessRunner};
use crate::provision::Environment;

/// File name the driver is written under inside the environment root.
pub const DRIVER_FILE_NAME: &str = "mem_bench_driver.py";

const DRIVER_SCRIPT: &str = include_str!("../assets/reference_driver.py");

fn join_sizes(sizes: &[usize]) -> String {
    sizes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Driver invocation for `workload`, writing to `output`.
#[must_use]
pub fn driver_command(
    env: &Environment,
    workload: &Workload,
    seed: Option<u64>,
    output: &Path,
) -> CommandSpec {
    let mut spec = CommandSpec::new(env.python().to_string_lossy())
        .arg(env.root().join(DRIVER_FILE_NAME).to_string_lossy())
        .args(["--output".to_string(), output.to_string_lossy().into_owned()])
        .args(["--iterations".to_string(), workload.iterations.to_string()])
        .args(["--content-sizes".to_string(), join_sizes(&workload.content_sizes)])
        .args(["--embedding-dims".to_string(), join_sizes(&workload.embedding_dims)])
        .args(["--list-sizes".to_string(), join_sizes(&workload.list_sizes)])
        .args([
            "--fixture-content-size".to_string(),
            workload.fixture_content_size.to_string(),
        ])
        .args([
            "--retrieval-fixture".to_string(),
            workload.retrieval_fixture.to_string(),
        ])
        .current_dir(env.root());
    if let Some(seed) = seed {
        spec = spec.args(["--seed".to_string(), seed.to_string()]);
    }
    spec
}

/// Run the reference driver and load the suites it wrote to `output`.
///
/// A stale `output` from an earlier run is removed first, so a driver that
/// exits cleanly without writing surfaces as [`BenchError::MissingArtifact`].
pub fn run_reference(
    runner: &dyn ProcessRunner,
    env: &Environment,
    workload: &Workload,
    seed: Option<u64>,
    output: &Path,
) -> Result<SuiteSet> {
    fs::write(env.root().join(DRIVER_FILE_NAME), DRIVER_SCRIPT)?;
    match fs::remove_file(output) {
        Ok(()) => tracing::debug!(path = %output.display(), "removed stale raw results"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    let spec = driver_command(env, workload, seed, output);
    tracing::info!(command = %spec.display(), "running reference driver");
    let captured = runner.run(&spec).map_err(|e| BenchError::ExternalProcess {
        program: spec.program.clone(),
        exit_code: None,
        stderr: e.to_string(),
    })?;
    if !captured.succeeded() {
        return Err(BenchError::ExternalProcess {
            program: spec.program,
            exit_code: captured.exit_code,
            stderr: captured.diagnostics(),
        });
    }

    let suites: SuiteSet = load_json(output)?;
    tracing::info!(suites = suites.len(), path = %output.display(), "reference results loaded");
    Ok(suites)
}
