//! Error types for mem-bench
//!
//! Every variant is fatal to a run: nothing retries, and callers propagate
//! with `?` up to the binary, which reports once and exits non-zero.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for mem-bench operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Stage of environment provisioning that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    /// Clearing or validating the target directory before any fetch.
    Prepare,
    /// Cloning the reference source.
    Fetch,
    /// Creating the isolated dependency set (virtualenv).
    Isolate,
    /// Installing packages into the isolated dependency set.
    Install,
    /// Writing the install marker.
    Finalize,
}

impl ProvisionStep {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Fetch => "fetch",
            Self::Isolate => "isolate",
            Self::Install => "install",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for mem-bench
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("provisioning failed during {step}: {diagnostics}")]
    Provisioning {
        step: ProvisionStep,
        diagnostics: String,
    },

    #[error("external process `{program}` failed ({}): {stderr}", describe_exit(.exit_code))]
    ExternalProcess {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("cannot summarize an empty latency sequence")]
    EmptyInput,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("memory store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(
        || "terminated without exit code".to_string(),
        |code| format!("exit code {code}"),
    )
}

impl BenchError {
    /// Short machine-friendly category name, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Provisioning { .. } => "provisioning",
            Self::ExternalProcess { .. } => "external_process",
            Self::MissingArtifact(_) => "missing_artifact",
            Self::EmptyInput => "empty_input",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Store(_) => "store",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}
