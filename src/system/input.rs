// src/system/input.rs

//! The child's stdin.

use std::{fmt, io, sync::Arc};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Writable end wired to a child's stdin.
///
/// Writers take turns: each write holds the lock from readiness to completion, so chunks
/// from concurrent writers never interleave.
#[derive(Clone)]
pub struct InputChannel {
    sink: Arc<Mutex<Option<Sink>>>,
}

impl fmt::Debug for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputChannel").finish_non_exhaustive()
    }
}

impl InputChannel {
    pub(crate) fn new(sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Some(Box::new(sink)))),
        }
    }

    /// Writes the UTF-8 bytes of `input` and flushes them.
    ///
    /// # Errors
    /// `BrokenPipe` if the input was already closed, or whatever the pipe reports.
    pub async fn write(&self, input: &str) -> io::Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "input stream closed"))?;
        sink.write_all(input.as_bytes()).await?;
        sink.flush().await
    }

    /// Shuts the pipe down so the child reads end of file. Closing twice is a no-op.
    pub async fn close(&self) -> io::Result<()> {
        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            sink.shutdown().await?;
        }
        Ok(())
    }

    /// True once [`close`](Self::close) has run.
    pub async fn is_closed(&self) -> bool {
        self.sink.lock().await.is_none()
    }
}
