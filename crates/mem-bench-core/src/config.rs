//! Configuration management for mem-bench
//!
//! Configuration is loaded from `MEM_BENCH_*` environment variables on top of
//! built-in defaults, then overridden by CLI flags. Loading goes through a
//! lookup function so tests can supply values without touching the process
//! environment.

use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::{BenchError, Result};
use crate::report::SummaryMode;

pub const DEFAULT_REFERENCE_NAME: &str = "mem0";
pub const DEFAULT_REFERENCE_SOURCE: &str = "https://github.com/mem0ai/mem0.git";
pub const DEFAULT_RAW_RESULTS_FILE: &str = "benchmark_results.json";
pub const DEFAULT_ITERATIONS: u32 = 10;
pub const DEFAULT_CONTENT_SIZES: &[usize] = &[10, 100, 1000, 10_000];
pub const DEFAULT_EMBEDDING_DIMS: &[usize] = &[32, 128, 512, 1536];
pub const DEFAULT_LIST_SIZES: &[usize] = &[100];
/// Content length used by the embedding and retrieval suites.
pub const DEFAULT_FIXTURE_CONTENT_SIZE: usize = 100;
/// Records seeded before the retrieval suite is timed.
pub const DEFAULT_RETRIEVAL_FIXTURE: usize = 100;

/// Main configuration struct for mem-bench
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    // Layout
    pub project_root: PathBuf,
    pub vendor_root: PathBuf,
    pub results_dir: PathBuf,
    pub raw_results_file: String,

    // Reference implementation
    pub reference_name: String,
    pub reference_source: String,
    pub python: String,
    pub git: String,
    /// One pip install step per entry, shell-split (e.g. `-e .`).
    pub install_packages: Vec<String>,
    /// Delete and recreate the reference environment. Irreversible.
    pub force_refresh: bool,

    // Workload
    pub iterations: u32,
    pub content_sizes: Vec<usize>,
    pub embedding_dims: Vec<usize>,
    pub list_sizes: Vec<usize>,
    pub fixture_content_size: usize,
    pub retrieval_fixture: usize,
    pub seed: Option<u64>,

    // Report
    pub summary_mode: SummaryMode,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::with_project_root(PathBuf::from("."))
    }
}

impl BenchConfig {
    /// Defaults with every derived path rooted at `project_root`.
    #[must_use]
    pub fn with_project_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            vendor_root: project_root.join("vendor"),
            results_dir: project_root.join("target").join("benchmark_results"),
            project_root,
            raw_results_file: DEFAULT_RAW_RESULTS_FILE.to_string(),
            reference_name: DEFAULT_REFERENCE_NAME.to_string(),
            reference_source: DEFAULT_REFERENCE_SOURCE.to_string(),
            python: "python3".to_string(),
            git: "git".to_string(),
            install_packages: vec!["numpy".to_string(), "-e .".to_string()],
            force_refresh: false,
            iterations: DEFAULT_ITERATIONS,
            content_sizes: DEFAULT_CONTENT_SIZES.to_vec(),
            embedding_dims: DEFAULT_EMBEDDING_DIMS.to_vec(),
            list_sizes: DEFAULT_LIST_SIZES.to_vec(),
            fixture_content_size: DEFAULT_FIXTURE_CONTENT_SIZE,
            retrieval_fixture: DEFAULT_RETRIEVAL_FIXTURE,
            seed: None,
            summary_mode: SummaryMode::default(),
        }
    }

    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let project_root = value("MEM_BENCH_PROJECT_ROOT")
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut config = Self::with_project_root(project_root);

        // Layout
        if let Some(v) = value("MEM_BENCH_VENDOR_ROOT") {
            config.vendor_root = PathBuf::from(v);
        }
        if let Some(v) = value("MEM_BENCH_RESULTS_DIR") {
            config.results_dir = PathBuf::from(v);
        }
        if let Some(v) = value("MEM_BENCH_RAW_RESULTS_FILE") {
            config.raw_results_file = v;
        }

        // Reference implementation
        if let Some(v) = value("MEM_BENCH_REFERENCE_NAME") {
            config.reference_name = v;
        }
        if let Some(v) = value("MEM_BENCH_REFERENCE_SOURCE") {
            config.reference_source = v;
        }
        if let Some(v) = value("MEM_BENCH_PYTHON") {
            config.python = v;
        }
        if let Some(v) = value("MEM_BENCH_GIT") {
            config.git = v;
        }
        if let Some(v) = value("MEM_BENCH_INSTALL_PACKAGES") {
            config.install_packages = parse_csv(&v);
        }
        config.force_refresh = value("MEM_BENCH_FORCE_REFRESH")
            .map_or(config.force_refresh, |v| parse_bool(&v, config.force_refresh));

        // Workload
        config.iterations = value("MEM_BENCH_ITERATIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.iterations);
        if let Some(sizes) = value("MEM_BENCH_CONTENT_SIZES").and_then(|v| parse_usize_list(&v)) {
            config.content_sizes = sizes;
        }
        if let Some(dims) = value("MEM_BENCH_EMBEDDING_DIMS").and_then(|v| parse_usize_list(&v)) {
            config.embedding_dims = dims;
        }
        if let Some(sizes) = value("MEM_BENCH_LIST_SIZES").and_then(|v| parse_usize_list(&v)) {
            config.list_sizes = sizes;
        }
        config.seed = value("MEM_BENCH_SEED").and_then(|v| v.parse().ok());

        // Report
        if let Some(mode) = value("MEM_BENCH_SUMMARY_MODE").and_then(|v| v.parse().ok()) {
            config.summary_mode = mode;
        }

        config
    }

    /// Where the reference implementation is provisioned.
    #[must_use]
    pub fn environment_dir(&self) -> PathBuf {
        self.vendor_root.join(&self.reference_name)
    }

    /// Where the reference driver writes its raw suite results.
    #[must_use]
    pub fn raw_results_path(&self) -> PathBuf {
        self.environment_dir().join(&self.raw_results_file)
    }

    /// Install steps, each split into pip arguments.
    pub fn install_steps(&self) -> Result<Vec<Vec<String>>> {
        self.install_packages
            .iter()
            .map(|entry| {
                shlex::split(entry)
                    .filter(|args| !args.is_empty())
                    .ok_or_else(|| {
                        BenchError::InvalidConfig(format!("unparseable install step: {entry:?}"))
                    })
            })
            .collect()
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(BenchError::InvalidConfig(
                "iterations must be greater than zero".to_string(),
            ));
        }
        if self.content_sizes.is_empty() {
            return Err(BenchError::InvalidConfig(
                "content sizes must not be empty".to_string(),
            ));
        }
        if self.embedding_dims.is_empty() || self.embedding_dims.contains(&0) {
            return Err(BenchError::InvalidConfig(
                "embedding dims must be non-empty and positive".to_string(),
            ));
        }
        if self.list_sizes.is_empty() {
            return Err(BenchError::InvalidConfig(
                "list sizes must not be empty".to_string(),
            ));
        }
        if self.retrieval_fixture == 0 {
            return Err(BenchError::InvalidConfig(
                "retrieval fixture must hold at least one record".to_string(),
            ));
        }
        if !is_single_dir_name(&self.reference_name) {
            return Err(BenchError::InvalidConfig(format!(
                "reference name {:?} must be a single directory name inside the vendor root",
                self.reference_name
            )));
        }
        self.install_steps()?;
        Ok(())
    }
}

/// Exactly one normal path component: no separators, no `.` or `..`.
fn is_single_dir_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && name.trim() == name && !name.contains(['/', '\\'])
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => true,
        "0" | "false" | "f" | "no" | "n" => false,
        _ => default,
    }
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Comma-separated sizes; `None` when any entry fails to parse.
fn parse_usize_list(value: &str) -> Option<Vec<usize>> {
    parse_csv(value).iter().map(|v| v.parse().ok()).collect()
}
