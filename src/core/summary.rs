// src/core/summary.rs

//! Markdown step summary and the fail-fast exit built on top of it.

use crate::{constants::GITHUB_STEP_SUMMARY, core::text::trim_indent};
use colored::Colorize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Why the step summary could not be written.
#[derive(Error, Debug)]
pub enum SummaryError {
    /// `GITHUB_STEP_SUMMARY` is not set.
    #[error("Missing environment variable '{0}'")]
    MissingVariable(String),
    /// Appending to the summary file failed.
    #[error("Could not write step summary '{path}': {source}")]
    Io {
        /// The summary file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Replaces the step summary file at `path` with `content`, de-indented.
pub fn write_summary_to(path: &Path, content: &str) -> Result<(), SummaryError> {
    fs::write(path, trim_indent(content)).map_err(|source| SummaryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Sets the step summary through the file named by `GITHUB_STEP_SUMMARY`.
pub fn write_summary(content: &str) -> Result<(), SummaryError> {
    let path = std::env::var_os(GITHUB_STEP_SUMMARY)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SummaryError::MissingVariable(GITHUB_STEP_SUMMARY.to_string()))?;
    write_summary_to(Path::new(&path), content)
}

fn failure_message(message: &str) -> String {
    format!("❌ Error: {}", trim_indent(message))
}

/// Writes the failure to the step summary and stderr, then exits with code 1.
pub fn fail(message: &str) -> ! {
    let result = failure_message(message);
    if let Err(e) = write_summary(&result) {
        log::warn!("Could not record failure in step summary: {}", e);
    }
    eprintln!("{}", result.red());
    std::process::exit(1);
}
