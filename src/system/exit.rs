// src/system/exit.rs

//! One-shot, multi-reader exit notification and the exit-code policy applied to it.

use crate::system::process::ProcessError;
use std::{io, process::ExitStatus, sync::Arc};
use tokio::sync::watch;

/// What the waiter task observed when the child finished.
pub(crate) type ExitOutcome = Result<i32, Arc<io::Error>>;

/// Converts an OS exit status into the code reported to callers.
/// A process terminated by a signal has no code and reports 0.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(0)
}

/// Decides whether an exit code settles successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitPolicy {
    /// Treat every exit code as success.
    pub ignore_exit_code: bool,
}

impl ExitPolicy {
    /// A policy that tolerates non-zero codes when `ignore_exit_code` is set.
    pub fn new(ignore_exit_code: bool) -> Self {
        Self { ignore_exit_code }
    }

    /// Codes above zero fail unless the policy tolerates them.
    pub fn settle(self, code: i32) -> Result<i32, ProcessError> {
        if code > 0 && !self.ignore_exit_code {
            return Err(ProcessError::NonZeroExit(code));
        }
        Ok(code)
    }
}

/// Publishing side, owned by the task that waits on the child.
#[derive(Debug)]
pub(crate) struct ExitNotifier {
    tx: watch::Sender<Option<ExitOutcome>>,
}

/// Receiving side. Cheap to clone; every clone observes the same single outcome.
#[derive(Debug, Clone)]
pub(crate) struct ExitSignal {
    rx: watch::Receiver<Option<ExitOutcome>>,
}

pub(crate) fn exit_channel() -> (ExitNotifier, ExitSignal) {
    let (tx, rx) = watch::channel(None);
    (ExitNotifier { tx }, ExitSignal { rx })
}

impl ExitNotifier {
    pub(crate) fn notify(self, outcome: ExitOutcome) {
        // send_replace stores the value even when every receiver is gone.
        self.tx.send_replace(Some(outcome));
    }
}

impl ExitSignal {
    /// Suspends until the child has exited and returns its code.
    pub(crate) async fn wait(&self) -> Result<i32, ProcessError> {
        let mut rx = self.rx.clone();
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ProcessError::WaiterGone)?
            .clone();
        match outcome {
            Some(Ok(code)) => Ok(code),
            Some(Err(e)) => Err(ProcessError::Wait(e)),
            None => Err(ProcessError::WaiterGone),
        }
    }

    /// The code, if the child has already exited.
    pub(crate) fn code(&self) -> Option<i32> {
        match &*self.rx.borrow() {
            Some(Ok(code)) => Some(*code),
            _ => None,
        }
    }
}
