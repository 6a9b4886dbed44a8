// src/core/paths.rs

//! `PATH` updates for the current process and for later workflow steps.

use crate::constants::{GITHUB_PATH, PATH_VAR};
use std::{
    env,
    ffi::{OsStr, OsString},
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;
use uuid::Uuid;

/// Why `PATH` could not be extended.
#[derive(Error, Debug)]
pub enum PathError {
    /// `GITHUB_PATH` is not set.
    #[error("Missing environment variable '{0}'")]
    MissingVariable(String),
    /// Appending to the `GITHUB_PATH` file failed.
    #[error("Could not write to '{path}': {source}")]
    Io {
        /// The `GITHUB_PATH` file.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The directory contains the platform's path separator.
    #[error("Directory '{0}' cannot be placed on PATH.")]
    InvalidEntry(String),
}

/// Registers `dirs` for later workflow steps through `GITHUB_PATH`.
///
/// Returns the current `PATH` extended with `dirs`. The process environment is not
/// modified; hand the value to `SpawnOptions::env` to use it for children.
pub fn add_path(dirs: &[PathBuf]) -> Result<OsString, PathError> {
    let file = env::var_os(GITHUB_PATH)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PathError::MissingVariable(GITHUB_PATH.to_string()))?;
    add_path_to(Path::new(&file), dirs, env::var_os(PATH_VAR).as_deref())
}

/// Appends one line per directory to `file` and returns `current` with `dirs` appended.
pub fn add_path_to(
    file: &Path,
    dirs: &[PathBuf],
    current: Option<&OsStr>,
) -> Result<OsString, PathError> {
    let mut lines = String::new();
    for dir in dirs {
        lines.push_str(&dir.to_string_lossy());
        lines.push('\n');
    }

    let io_err = |source| PathError::Io {
        path: file.display().to_string(),
        source,
    };
    let mut handle = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .map_err(io_err)?;
    handle.write_all(lines.as_bytes()).map_err(io_err)?;

    let existing = current.map(env::split_paths).into_iter().flatten();
    env::join_paths(existing.chain(dirs.iter().cloned()))
        .map_err(|e| PathError::InvalidEntry(e.to_string()))
}

/// A fresh, not yet existing path inside the system temp directory.
pub fn random_path() -> PathBuf {
    env::temp_dir().join(Uuid::new_v4().to_string())
}

/// Creates a directory at a [`random_path`] and returns it.
pub fn random_dir() -> Result<PathBuf, PathError> {
    let path = random_path();
    fs::create_dir_all(&path).map_err(|source| PathError::Io {
        path: path.display().to_string(),
        source,
    })?;
    log::debug!("Created temporary directory '{}'", path.display());
    Ok(path)
}
