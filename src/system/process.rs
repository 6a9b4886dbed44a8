// src/system/process.rs

//! A spawned child: output pumps, the exit waiter, and settlement into a
//! [`FinishedProcess`].

use crate::{
    constants::{EXIT_DRAIN_GRACE, PIPE_READ_BUFFER_SIZE},
    models::FinishedProcess,
    system::{
        channel::OutputChannel,
        decoder::Utf8Decoder,
        exit::{self, ExitPolicy, ExitSignal},
        input::InputChannel,
    },
};
use std::{
    future::{Future, IntoFuture},
    io,
    pin::Pin,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Child,
    task::JoinHandle,
};

/// Failures of a running process and its channels. Cloned to every awaiter.
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    /// The exit code was positive and the exit policy does not ignore it.
    #[error("Process exited with non-zero code {0}.")]
    NonZeroExit(i32),
    /// Stdin was not piped, or it has been closed.
    #[error("Process does not have an input stream.")]
    NoInputStream,
    /// Reading a pipe failed. The channel is closed with this error.
    #[error("Reading process output failed: {0}")]
    Source(Arc<io::Error>),
    /// Waiting on the child failed.
    #[error("Waiting for the process failed: {0}")]
    Wait(Arc<io::Error>),
    /// The waiter task ended without publishing an outcome.
    #[error("The process waiter stopped before reporting an exit status.")]
    WaiterGone,
}

impl ProcessError {
    /// The exit code carried by a `NonZeroExit` error.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit(code) => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Stdout,
    Stderr,
}

/// Plain-text accumulators filled as chunks arrive, independent of any channel consumer.
#[derive(Debug, Default)]
struct Captured {
    stdout: String,
    stderr: String,
    stdall: String,
}

impl Captured {
    fn record(&mut self, kind: SourceKind, chunk: &str) {
        match kind {
            SourceKind::Stdout => self.stdout.push_str(chunk),
            SourceKind::Stderr => self.stderr.push_str(chunk),
        }
        self.stdall.push_str(chunk);
    }
}

type SharedCapture = Arc<Mutex<Captured>>;

/// A live child process and its I/O channels.
///
/// Await it (or call [`RunningProcess::wait`]) for the [`FinishedProcess`]. Output can be
/// consumed concurrently through [`stdout`](Self::stdout), [`stderr`](Self::stderr) and
/// [`stdall`](Self::stdall) without affecting the final result.
#[derive(Debug)]
pub struct RunningProcess {
    interpreter: String,
    pid: Option<u32>,
    policy: ExitPolicy,
    stdout: Option<OutputChannel>,
    stderr: Option<OutputChannel>,
    stdall: Option<OutputChannel>,
    stdin: Option<InputChannel>,
    captured: SharedCapture,
    exit: ExitSignal,
}

impl RunningProcess {
    /// Takes ownership of a freshly spawned child and starts draining its pipes.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new(mut child: Child, interpreter: String, policy: ExitPolicy) -> Self {
        let (notifier, exit) = exit::exit_channel();
        let pid = child.id();

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdin = child.stdin.take().map(InputChannel::new);

        let stdout = stdout_pipe
            .as_ref()
            .and_then(|_| OutputChannel::new(1, exit.clone(), policy));
        let stderr = stderr_pipe
            .as_ref()
            .and_then(|_| OutputChannel::new(1, exit.clone(), policy));
        let source_count =
            usize::from(stdout_pipe.is_some()) + usize::from(stderr_pipe.is_some());
        let stdall = OutputChannel::new(source_count, exit.clone(), policy);

        let captured = SharedCapture::default();
        let mut pumps = Vec::with_capacity(2);
        if let Some(pipe) = stdout_pipe {
            let targets = [stdout.clone(), stdall.clone()].into_iter().flatten().collect();
            pumps.push(spawn_pump(pipe, SourceKind::Stdout, targets, captured.clone()));
        }
        if let Some(pipe) = stderr_pipe {
            let targets = [stderr.clone(), stdall.clone()].into_iter().flatten().collect();
            pumps.push(spawn_pump(pipe, SourceKind::Stderr, targets, captured.clone()));
        }

        // The waiter owns the child and settles on its exit. Pipes get a short grace
        // period to drain; a descendant that keeps them open only delays the channels.
        tokio::spawn(async move {
            let status = child.wait().await;
            let drained = tokio::time::timeout(EXIT_DRAIN_GRACE, async {
                for pump in &mut pumps {
                    if let Err(e) = pump.await {
                        log::warn!("Output pump for process {:?} panicked: {}", pid, e);
                    }
                }
            })
            .await;
            if drained.is_err() {
                log::debug!("Process {:?} exited with its pipes still open", pid);
            }
            let outcome = status.map(exit::exit_code).map_err(Arc::new);
            log::debug!("Process {:?} settled with {:?}", pid, outcome);
            notifier.notify(outcome);
        });

        Self {
            interpreter,
            pid,
            policy,
            stdout,
            stderr,
            stdall,
            stdin,
            captured,
            exit,
        }
    }

    /// OS process id. Callers that need a timeout terminate the child through it.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Name of the interpreter running the script.
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Stdout-only channel. `None` when stdout is not piped.
    pub fn stdout(&self) -> Option<&OutputChannel> {
        self.stdout.as_ref()
    }

    /// Stderr-only channel. `None` when stderr is not piped.
    pub fn stderr(&self) -> Option<&OutputChannel> {
        self.stderr.as_ref()
    }

    /// Stdout and stderr merged in arrival order. `None` when neither is piped.
    pub fn stdall(&self) -> Option<&OutputChannel> {
        self.stdall.as_ref()
    }

    /// The child's stdin. `None` when stdin is not piped.
    pub fn stdin(&self) -> Option<&InputChannel> {
        self.stdin.as_ref()
    }

    /// Sends `input` to the child's stdin.
    ///
    /// A failed write (e.g. the child already closed its stdin) is logged and ignored.
    ///
    /// # Errors
    /// `NoInputStream` when the process was spawned without a piped stdin.
    pub async fn write(&self, input: &str) -> Result<(), ProcessError> {
        let stdin = self.stdin.as_ref().ok_or(ProcessError::NoInputStream)?;
        if let Err(e) = stdin.write(input).await {
            log::debug!("Ignoring failed write to stdin of {:?}: {}", self.pid, e);
        }
        Ok(())
    }

    /// Closes the child's stdin so it reads end of file.
    pub async fn close_stdin(&self) -> Result<(), ProcessError> {
        let stdin = self.stdin.as_ref().ok_or(ProcessError::NoInputStream)?;
        if let Err(e) = stdin.close().await {
            log::debug!("Ignoring failed close of stdin of {:?}: {}", self.pid, e);
        }
        Ok(())
    }

    /// The exit code if the process has already settled, without waiting.
    pub fn try_code(&self) -> Option<i32> {
        self.exit.code()
    }

    /// Waits for the child to exit and returns its output.
    ///
    /// # Errors
    /// `NonZeroExit(code)` for a positive exit code unless the session ignores exit codes.
    pub async fn wait(&self) -> Result<FinishedProcess, ProcessError> {
        let code = self.exit.wait().await?;
        let code = self.policy.settle(code)?;
        let captured = self.captured.lock().unwrap_or_else(|e| e.into_inner());
        Ok(FinishedProcess {
            interpreter: self.interpreter.clone(),
            stdall: captured.stdall.clone(),
            stderr: captured.stderr.clone(),
            stdout: captured.stdout.clone(),
            code,
        })
    }
}

impl IntoFuture for RunningProcess {
    type Output = Result<FinishedProcess, ProcessError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

// --- Pipe pumps ---

/// Drains one pipe, feeding every target channel and the process accumulators exactly once
/// per chunk.
fn spawn_pump<R>(
    reader: R,
    kind: SourceKind,
    targets: Vec<OutputChannel>,
    captured: SharedCapture,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(pump(reader, kind, targets, captured))
}

async fn pump<R>(mut reader: R, kind: SourceKind, targets: Vec<OutputChannel>, captured: SharedCapture)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; PIPE_READ_BUFFER_SIZE];
    let mut decoder = Utf8Decoder::default();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                dispatch(&decoder.finish(), kind, &targets, &captured);
                for target in &targets {
                    target.end_source();
                }
                log::trace!("{:?} reached end of file", kind);
                return;
            }
            Ok(n) => {
                let chunk = decoder.decode(buf.get(..n).unwrap_or_default());
                dispatch(&chunk, kind, &targets, &captured);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Reading {:?} failed: {}", kind, e);
                let error = ProcessError::Source(Arc::new(e));
                for target in &targets {
                    target.fail(error.clone());
                }
                return;
            }
        }
    }
}

fn dispatch(chunk: &str, kind: SourceKind, targets: &[OutputChannel], captured: &SharedCapture) {
    if chunk.is_empty() {
        return;
    }
    // Held across the pushes so `stdall` gets the same order here and in its channel.
    let mut captured = captured.lock().unwrap_or_else(|e| e.into_inner());
    captured.record(kind, chunk);
    for target in targets {
        target.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::exit::exit_channel;

    /// A reader that yields some bytes and then fails.
    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            if self.sent {
                return std::task::Poll::Ready(Err(io::Error::other("boom")));
            }
            self.sent = true;
            buf.put_slice(b"before failure");
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn test_captured_records_both_sources_in_arrival_order() {
        let mut captured = Captured::default();
        captured.record(SourceKind::Stdout, "a");
        captured.record(SourceKind::Stderr, "b");
        captured.record(SourceKind::Stdout, "c");
        assert_eq!(captured.stdout, "ac");
        assert_eq!(captured.stderr, "b");
        assert_eq!(captured.stdall, "abc");
    }

    #[tokio::test]
    async fn test_pump_feeds_channels_and_accumulators() {
        let (notifier, signal) = exit_channel();
        let only = OutputChannel::new(1, signal.clone(), ExitPolicy::default()).unwrap();
        let both = OutputChannel::new(2, signal, ExitPolicy::default()).unwrap();
        let captured = SharedCapture::default();

        pump(&b"hello"[..], SourceKind::Stdout, vec![only.clone(), both.clone()], captured.clone()).await;
        pump(&b"oops"[..], SourceKind::Stderr, vec![both.clone()], captured.clone()).await;
        notifier.notify(Ok(0));

        assert_eq!(only.text().await.unwrap(), "hello");
        assert_eq!(both.text().await.unwrap(), "hellooops");
        let captured = captured.lock().unwrap();
        assert_eq!(captured.stdout, "hello");
        assert_eq!(captured.stderr, "oops");
    }

    #[tokio::test]
    async fn test_pump_error_fails_channels() {
        let (_notifier, signal) = exit_channel();
        let channel = OutputChannel::new(1, signal, ExitPolicy::default()).unwrap();
        let captured = SharedCapture::default();

        pump(FailingReader { sent: false }, SourceKind::Stdout, vec![channel.clone()], captured).await;

        assert_eq!(channel.snapshot(), "before failure");
        assert!(matches!(channel.text().await, Err(ProcessError::Source(_))));
    }

    #[test]
    fn test_exit_code_accessor() {
        assert_eq!(ProcessError::NonZeroExit(3).exit_code(), Some(3));
        assert_eq!(ProcessError::NoInputStream.exit_code(), None);
    }
}
