//! Reference environment provisioning.
//!
//! An environment is a directory holding a clone of the reference source and
//! a virtualenv with its dependencies installed. Provisioning is idempotent:
//! once the install marker is written, later calls return the existing
//! environment without spawning anything.
//!
//! [`RefreshPolicy::ForceRefresh`] deletes the whole environment directory
//! before reinstalling. That deletion cannot be undone, so it is only ever
//! taken on explicit request.

#![forbid(unsafe_code)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use mem_bench_core::{BenchConfig, BenchError, ProvisionStep, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::process::{CommandSpec, ProcessRunner};

/// Marker written into the environment root after a successful install.
pub const MARKER_FILE: &str = ".mem-bench-env.json";
/// Virtualenv directory inside the environment root.
pub const VENV_DIR: &str = "venv";

/// Whether an existing environment may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    #[default]
    Reuse,
    /// Delete the environment directory and reinstall from scratch.
    ForceRefresh,
}

impl RefreshPolicy {
    #[must_use]
    pub const fn from_flag(force_refresh: bool) -> Self {
        if force_refresh {
            Self::ForceRefresh
        } else {
            Self::Reuse
        }
    }
}

/// A provisioned reference implementation.
///
/// Only [`Provisioner`] constructs one, and only once the install marker is
/// in place, so holding an `Environment` means it is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    root: PathBuf,
    python: PathBuf,
}

impl Environment {
    fn installed_at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            python: venv_bin(root, "python"),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Interpreter inside the isolated dependency set.
    #[must_use]
    pub fn python(&self) -> &Path {
        &self.python
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct InstallMarker {
    source: String,
    fingerprint: String,
    installed_at: String,
}

/// Programs and package steps used to build an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub git: String,
    pub python: String,
    /// Arguments for each `pip install` invocation, in order.
    pub packages: Vec<Vec<String>>,
}

impl InstallPlan {
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        Ok(Self {
            git: config.git.clone(),
            python: config.python.clone(),
            packages: config.install_steps()?,
        })
    }

    /// Stable identity of this plan for `source`. A marker whose fingerprint
    /// differs belongs to a different plan and is not reused.
    #[must_use]
    pub fn fingerprint(&self, source: &str) -> String {
        let packages = self
            .packages
            .iter()
            .map(|step| step.join(" "))
            .collect::<Vec<_>>()
            .join(";");
        let material = format!("{source}|{}|{packages}", self.python);
        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        let digest = hasher.finalize();
        hex::encode(digest)[..16].to_string()
    }
}

/// Path of an executable inside the environment's virtualenv.
#[must_use]
pub fn venv_bin(root: &Path, exe: &str) -> PathBuf {
    if cfg!(windows) {
        root.join(VENV_DIR).join("Scripts").join(format!("{exe}.exe"))
    } else {
        root.join(VENV_DIR).join("bin").join(exe)
    }
}

pub struct Provisioner<'a> {
    runner: &'a dyn ProcessRunner,
    plan: InstallPlan,
}

impl<'a> Provisioner<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn ProcessRunner, plan: InstallPlan) -> Self {
        Self { runner, plan }
    }

    /// The environment at `target`, if it was fully installed from `source`
    /// under the current plan.
    #[must_use]
    pub fn detect(&self, source: &str, target: &Path) -> Option<Environment> {
        let contents = fs::read_to_string(target.join(MARKER_FILE)).ok()?;
        let marker: InstallMarker = serde_json::from_str(&contents).ok()?;
        (marker.source == source && marker.fingerprint == self.plan.fingerprint(source))
            .then(|| Environment::installed_at(target))
    }

    /// Ensure an installed environment for `source` exists at `target`.
    pub fn provision(
        &self,
        source: &str,
        target: &Path,
        refresh: RefreshPolicy,
    ) -> Result<Environment> {
        match refresh {
            RefreshPolicy::ForceRefresh => {
                if target.exists() {
                    tracing::warn!(dir = %target.display(), "force refresh: deleting environment");
                    fs::remove_dir_all(target).map_err(|e| {
                        prepare_error(format!("failed to delete {}: {e}", target.display()))
                    })?;
                }
            }
            RefreshPolicy::Reuse => {
                if let Some(env) = self.detect(source, target) {
                    tracing::info!(dir = %target.display(), "reusing provisioned environment");
                    return Ok(env);
                }
                if is_non_empty_dir(target) {
                    return Err(prepare_error(format!(
                        "{} exists but holds no environment provisioned from {source} with the \
                         current install plan; rerun with --force-refresh to delete and replace it",
                        target.display()
                    )));
                }
            }
        }

        let existed = target.exists();
        tracing::info!(source, dir = %target.display(), "provisioning environment");
        match self.install(source, target) {
            Ok(env) => {
                tracing::info!(dir = %target.display(), "environment ready");
                Ok(env)
            }
            Err(err) => {
                discard_partial(target, existed);
                Err(err)
            }
        }
    }

    fn install(&self, source: &str, target: &Path) -> Result<Environment> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                prepare_error(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let target_arg = target.to_string_lossy().into_owned();

        self.step(
            ProvisionStep::Fetch,
            &CommandSpec::new(&self.plan.git).args([
                "clone",
                "--depth",
                "1",
                source,
                target_arg.as_str(),
            ]),
        )?;

        let venv = target.join(VENV_DIR).to_string_lossy().into_owned();
        self.step(
            ProvisionStep::Isolate,
            &CommandSpec::new(&self.plan.python)
                .args(["-m", "venv", venv.as_str()])
                .current_dir(target),
        )?;

        let pip = venv_bin(target, "pip").to_string_lossy().into_owned();
        for package in &self.plan.packages {
            self.step(
                ProvisionStep::Install,
                &CommandSpec::new(&pip)
                    .arg("install")
                    .args(package.iter().cloned())
                    .current_dir(target),
            )?;
        }

        let marker = InstallMarker {
            source: source.to_string(),
            fingerprint: self.plan.fingerprint(source),
            installed_at: Utc::now().to_rfc3339(),
        };
        write_marker(target, &marker).map_err(|e| BenchError::Provisioning {
            step: ProvisionStep::Finalize,
            diagnostics: format!("failed to write install marker: {e}"),
        })?;

        Ok(Environment::installed_at(target))
    }

    fn step(&self, step: ProvisionStep, spec: &CommandSpec) -> Result<()> {
        tracing::info!(%step, command = %spec.display(), "provisioning step");
        let output = self.runner.run(spec).map_err(|e| BenchError::Provisioning {
            step,
            diagnostics: format!("failed to spawn `{}`: {e}", spec.program),
        })?;
        if output.succeeded() {
            return Ok(());
        }
        Err(BenchError::Provisioning {
            step,
            diagnostics: format!("`{}` failed: {}", spec.display(), output.diagnostics()),
        })
    }
}

fn prepare_error(diagnostics: String) -> BenchError {
    BenchError::Provisioning {
        step: ProvisionStep::Prepare,
        diagnostics,
    }
}

/// Write the marker through a temp file and rename it into place, so a
/// failed write never leaves a marker that parses.
fn write_marker(target: &Path, marker: &InstallMarker) -> std::io::Result<()> {
    fs::create_dir_all(target)?;
    let body = serde_json::to_string_pretty(marker).map_err(std::io::Error::other)?;
    let path = target.join(MARKER_FILE);
    let temp_path = path.with_extension(format!("tmp.{}", std::process::id()));
    let result = fs::write(&temp_path, body).and_then(|()| fs::rename(&temp_path, &path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_some())
}

/// Remove what a failed install left behind. A directory that existed (empty)
/// before the call is emptied rather than removed.
fn discard_partial(target: &Path, existed: bool) {
    let result = if existed {
        fs::read_dir(target).and_then(|entries| {
            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
            }
            Ok(())
        })
    } else {
        match fs::remove_dir_all(target) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    };
    if let Err(e) = result {
        tracing::warn!(dir = %target.display(), error = %e, "failed to clean up partial environment");
    }
}
