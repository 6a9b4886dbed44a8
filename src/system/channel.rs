// src/system/channel.rs

//! # Multiplexed Output Channel
//!
//! Fans one or two child pipes into a single ordered sequence of text chunks. Each
//! channel is one broadcaster feeding two independent views:
//!
//! ```text
//!   stdout pump ──┐                    ┌──▶ listeners (streaming mode, no replay)
//!                 ├──▶ OutputChannel ──┤
//!   stderr pump ──┘                    └──▶ accumulator + closed flag (await mode)
//! ```
//!
//! Every chunk is appended to the accumulator and forwarded to every attached listener
//! under the same lock, so the two views never disagree about what was delivered.
//! The channel closes only once **every** source has ended. A source error closes it
//! immediately and is reported to both views.

use crate::system::{
    exit::{ExitPolicy, ExitSignal},
    process::ProcessError,
};
use futures_core::Stream;
use std::{
    future::{Future, IntoFuture},
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll},
};
use tokio::sync::{mpsc, watch};

/// Lifecycle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No source has ended yet.
    Open,
    /// Some, but not all, sources have ended.
    Closing,
    /// All sources ended, or one failed. Terminal.
    Closed,
}

type Listener = mpsc::UnboundedSender<Result<String, ProcessError>>;

#[derive(Debug)]
struct Inner {
    state: ChannelState,
    sources: usize,
    ended_sources: usize,
    text: String,
    listeners: Vec<Listener>,
    failure: Option<ProcessError>,
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
    closed: watch::Sender<bool>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every mutation leaves `Inner` consistent; poisoning is ignored.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One logical output stream of a running process (stdout, stderr, or both combined).
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct OutputChannel {
    shared: Arc<Shared>,
    exit: ExitSignal,
    policy: ExitPolicy,
}

impl OutputChannel {
    /// Creates a channel fed by `sources` pipes. Returns `None` for zero sources: a
    /// process without captured output simply has no channel.
    pub(crate) fn new(sources: usize, exit: ExitSignal, policy: ExitPolicy) -> Option<Self> {
        if sources == 0 {
            return None;
        }
        let (closed, _) = watch::channel(false);
        Some(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: ChannelState::Open,
                    sources,
                    ended_sources: 0,
                    text: String::new(),
                    listeners: Vec::new(),
                    failure: None,
                }),
                closed,
            }),
            exit,
            policy,
        })
    }

    // --- Source side (driven by the pipe pumps) ---

    /// Appends a chunk and forwards it to every attached listener.
    pub(crate) fn push(&self, chunk: &str) {
        let mut inner = self.shared.lock();
        if inner.state == ChannelState::Closed || chunk.is_empty() {
            return;
        }
        inner.text.push_str(chunk);
        // A listener whose stream was dropped detaches itself here.
        inner
            .listeners
            .retain(|listener| listener.send(Ok(chunk.to_string())).is_ok());
    }

    /// Records that one source reached end of file.
    pub(crate) fn end_source(&self) {
        let mut inner = self.shared.lock();
        if inner.state == ChannelState::Closed {
            return;
        }
        inner.ended_sources += 1;
        if inner.ended_sources >= inner.sources {
            self.close(&mut inner);
        } else {
            inner.state = ChannelState::Closing;
        }
    }

    /// Closes the channel because a source failed.
    pub(crate) fn fail(&self, error: ProcessError) {
        let mut inner = self.shared.lock();
        if inner.state == ChannelState::Closed {
            return;
        }
        log::debug!("Output channel failed: {}", error);
        for listener in inner.listeners.drain(..) {
            let _ = listener.send(Err(error.clone()));
        }
        inner.failure = Some(error);
        self.close(&mut inner);
    }

    fn close(&self, inner: &mut Inner) {
        inner.state = ChannelState::Closed;
        // Dropping the senders ends every stream.
        inner.listeners.clear();
        self.shared.closed.send_replace(true);
    }

    // --- Consumer side ---

    /// Where the channel is in its lifecycle right now.
    pub fn state(&self) -> ChannelState {
        self.shared.lock().state
    }

    /// Text delivered so far. Grows until the channel closes.
    pub fn snapshot(&self) -> String {
        self.shared.lock().text.clone()
    }

    /// Attaches a streaming listener. It receives every chunk pushed from now on and
    /// ends when the channel closes. Chunks delivered before attaching are not replayed;
    /// use [`OutputChannel::text`] for the complete output.
    pub fn subscribe(&self) -> OutputStream {
        self.attach(false)
    }

    /// Like [`OutputChannel::subscribe`], but the stream first yields everything delivered
    /// so far as a single chunk. Nothing is lost or duplicated between the two parts.
    pub fn follow(&self) -> OutputStream {
        self.attach(true)
    }

    fn attach(&self, with_backlog: bool) -> OutputStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.shared.lock();
        if with_backlog && !inner.text.is_empty() {
            let _ = tx.send(Ok(inner.text.clone()));
        }
        match inner.state {
            ChannelState::Closed => {
                if let Some(error) = &inner.failure {
                    let _ = tx.send(Err(error.clone()));
                }
            }
            ChannelState::Open | ChannelState::Closing => inner.listeners.push(tx),
        }
        OutputStream { rx }
    }

    /// Waits for the channel to close and the process to exit, then returns every chunk
    /// concatenated.
    ///
    /// Fails with the source error if a pipe failed, or with `NonZeroExit` when the
    /// process exits with a positive code and the session does not ignore exit codes.
    pub async fn text(&self) -> Result<String, ProcessError> {
        let mut closed = self.shared.closed.subscribe();
        // The sender lives in `self.shared`, so this cannot observe a dropped sender.
        closed
            .wait_for(|closed| *closed)
            .await
            .map_err(|_| ProcessError::WaiterGone)?;

        let (text, failure) = {
            let inner = self.shared.lock();
            (inner.text.clone(), inner.failure.clone())
        };
        if let Some(error) = failure {
            return Err(error);
        }

        let code = self.exit.wait().await?;
        self.policy.settle(code)?;
        Ok(text)
    }
}

impl IntoFuture for OutputChannel {
    type Output = Result<String, ProcessError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.text().await })
    }
}

/// Streaming view of an [`OutputChannel`]. Yields each chunk as it arrives.
#[derive(Debug)]
pub struct OutputStream {
    rx: mpsc::UnboundedReceiver<Result<String, ProcessError>>,
}

impl OutputStream {
    /// The next chunk, or `None` once the channel has closed.
    pub async fn next_chunk(&mut self) -> Option<Result<String, ProcessError>> {
        self.rx.recv().await
    }
}

impl Stream for OutputStream {
    type Item = Result<String, ProcessError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
