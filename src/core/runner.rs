// src/core/runner.rs

//! Entry point for actions: runs an async body once and turns its error into a failed step.

use crate::constants::RUNNER_DEBUG;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::{
    future::Future,
    process::ExitCode,
    sync::atomic::{AtomicBool, Ordering},
};

static HAS_RUN: AtomicBool = AtomicBool::new(false);
static FAILED: AtomicBool = AtomicBool::new(false);

/// Runs `action` to completion on a fresh multi-threaded runtime.
///
/// An error is reported through [`set_failed`] and yields a failing exit code, as does a
/// successful action that called [`set_failed`] itself.
///
/// ```no_run
/// use std::process::ExitCode;
///
/// fn main() -> anyhow::Result<ExitCode> {
///     cash::core::runner::run(|| async {
///         cash::core::commands::debug("starting")?;
///         Ok::<_, anyhow::Error>(())
///     })
/// }
/// ```
///
/// # Errors
/// Fails when called more than once per process or when the runtime cannot start.
pub fn run<F, Fut>(action: F) -> Result<ExitCode>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if HAS_RUN.swap(true, Ordering::SeqCst) {
        bail!("This function is only meant to be run once");
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    Ok(settle(runtime.block_on(action())))
}

fn settle(result: Result<()>) -> ExitCode {
    if let Err(e) = result {
        set_failed(&describe(&e, is_debug()));
    }
    if failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// The error message, or the whole cause chain in debug mode.
fn describe(error: &anyhow::Error, debug: bool) -> String {
    if debug {
        format!("{error:?}")
    } else {
        error.to_string()
    }
}

/// Prints `message` to stderr and marks the step as failed without exiting.
pub fn set_failed(message: &str) {
    FAILED.store(true, Ordering::SeqCst);
    eprintln!("{}", message.red());
}

/// True once [`set_failed`] has been called in this process.
pub fn failed() -> bool {
    FAILED.load(Ordering::SeqCst)
}

/// True when the runner enabled step debug logging (`RUNNER_DEBUG=1`).
pub fn is_debug() -> bool {
    std::env::var(RUNNER_DEBUG).is_ok_and(|v| v == "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_once_and_reports_failure() {
        let first = run(|| async {
            tokio::task::yield_now().await;
            Err::<(), _>(anyhow::anyhow!("deploy failed"))
        });
        assert!(first.is_ok());
        assert!(failed());

        let second = run(|| async { Ok::<_, anyhow::Error>(()) });
        assert_eq!(
            second.unwrap_err().to_string(),
            "This function is only meant to be run once"
        );
    }

    #[test]
    fn test_describe_includes_chain_only_in_debug() {
        let error = anyhow::anyhow!("disk full").context("Could not save report");
        assert_eq!(describe(&error, false), "Could not save report");
        let verbose = describe(&error, true);
        assert!(verbose.contains("Could not save report"));
        assert!(verbose.contains("disk full"));
    }
}
