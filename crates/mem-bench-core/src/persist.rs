//! Timestamped JSON artifacts.
//!
//! Artifact names embed a second-resolution UTC timestamp so a results
//! directory sorts chronologically. Files are created with `create_new`; when
//! the timestamped name is taken, a numeric suffix is appended, so an existing
//! artifact is never overwritten.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{BenchError, Result};

/// Timestamp embedded in artifact file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Persist `data` under `directory` as `<prefix>_<timestamp>.json`.
pub fn persist<T: Serialize + ?Sized>(data: &T, directory: &Path, prefix: &str) -> Result<PathBuf> {
    persist_at(data, directory, prefix, Utc::now())
}

/// [`persist`] with an explicit timestamp.
pub fn persist_at<T: Serialize + ?Sized>(
    data: &T,
    directory: &Path,
    prefix: &str,
    timestamp: DateTime<Utc>,
) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let body = to_pretty_json(data)?;
    let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();

    let mut attempt: u32 = 0;
    loop {
        let file_name = if attempt == 0 {
            format!("{prefix}_{stamp}.json")
        } else {
            format!("{prefix}_{stamp}_{attempt}.json")
        };
        let path = directory.join(file_name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                fill_or_discard(file, &path, |file| file.write_all(body.as_bytes()))?;
                tracing::info!(path = %path.display(), "artifact written");
                return Ok(path);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => return Err(err.into()),
        }
    }
}

/// Write `body` next to `artifact`, sharing its stem: `<stem>.<extension>`.
///
/// Same `create_new` rule as [`persist_at`]; a taken name gets `_<n>`
/// appended to the stem.
pub fn persist_beside(artifact: &Path, extension: &str, body: &str) -> Result<PathBuf> {
    let stem = artifact
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BenchError::MissingArtifact(artifact.to_path_buf()))?;
    let directory = artifact.parent().unwrap_or_else(|| Path::new("."));

    let mut attempt: u32 = 0;
    loop {
        let file_name = if attempt == 0 {
            format!("{stem}.{extension}")
        } else {
            format!("{stem}_{attempt}.{extension}")
        };
        let path = directory.join(file_name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                fill_or_discard(file, &path, |file| file.write_all(body.as_bytes()))?;
                tracing::info!(path = %path.display(), "companion written");
                return Ok(path);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => return Err(err.into()),
        }
    }
}

/// Write and sync a freshly created file. On any failure the file is
/// removed, so a truncated body never sits under an artifact name.
fn fill_or_discard<F>(mut file: File, path: &Path, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let result = write(&mut file).and_then(|()| file.sync_all());
    drop(file);
    if let Err(err) = result {
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove partial artifact");
        }
        return Err(err);
    }
    Ok(())
}

/// Read a JSON artifact, reporting absence as [`BenchError::MissingArtifact`].
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(BenchError::MissingArtifact(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };
    Ok(serde_json::from_str(&contents)?)
}

/// Pretty-printed JSON with a trailing newline.
pub fn to_pretty_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    let mut body = serde_json::to_string_pretty(data)?;
    body.push('\n');
    Ok(body)
}
