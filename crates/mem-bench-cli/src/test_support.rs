//! Scripted [`ProcessRunner`] for unit tests.
//!
//! The fake records every invocation. `git clone` creates the target
//! directory with a placeholder file, and a driver call (anything carrying
//! `--output`) writes the configured suite set there, so provisioning and the
//! reference phase can run without git, Python or a network.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;

use mem_bench_core::SuiteSet;

use crate::process::{CapturedOutput, CommandSpec, ProcessRunner};

#[derive(Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<CommandSpec>>,
    failure: Option<(String, CapturedOutput)>,
    spawn_error: Option<String>,
    driver_output: Option<SuiteSet>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `output` for any command whose rendering contains `needle`.
    pub fn fail_on(mut self, needle: &str, output: CapturedOutput) -> Self {
        self.failure = Some((needle.to_string(), output));
        self
    }

    /// Fail to spawn any command whose rendering contains `needle`.
    pub fn spawn_error_on(mut self, needle: &str) -> Self {
        self.spawn_error = Some(needle.to_string());
        self
    }

    /// Suite set the driver writes to its `--output` path.
    pub fn with_driver_output(mut self, suites: SuiteSet) -> Self {
        self.driver_output = Some(suites);
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|spec| spec.display().contains(needle))
            .count()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CapturedOutput> {
        self.calls.borrow_mut().push(spec.clone());
        let rendered = spec.display();

        if self
            .spawn_error
            .as_deref()
            .is_some_and(|needle| rendered.contains(needle))
        {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }
        if let Some((needle, output)) = &self.failure
            && rendered.contains(needle.as_str())
        {
            return Ok(output.clone());
        }

        if spec.args.first().map(String::as_str) == Some("clone")
            && let Some(target) = spec.args.last()
        {
            fs::create_dir_all(target)?;
            fs::write(Path::new(target).join("README.md"), "# mem0\n")?;
        }
        if let (Some(output), Some(suites)) = (spec.flag_value("--output"), &self.driver_output) {
            let body = serde_json::to_string(suites).map_err(io::Error::other)?;
            fs::write(output, body)?;
        }
        Ok(CapturedOutput::success())
    }
}
