//! Transport session: a framed duplex byte stream to one device.
//!
//! [`CliSession`] is the seam between the transport and everything above
//! it. A session owns its byte stream exclusively and strictly serializes
//! exchanges — `&mut self` on every operation means at most one command can
//! be in flight at a time, which matters because the shell has no
//! request/response correlation.

use std::future::Future;
use std::time::Duration;

use bytes::BytesMut;
use log::{debug, warn};
use russh::ChannelStream;
use russh::client::Msg;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::channel::{CompiledPrompt, PatternBuffer};
use crate::error::{ChannelError, TransportError};
use crate::transport::{SshConfig, SshTransport};

/// Capability interface for an interactive CLI session.
pub trait CliSession: Send {
    /// Write one line, appending the session's newline convention.
    fn write_line(&mut self, line: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Accumulate output until the trailing region matches `prompt`.
    ///
    /// On timeout this fails with [`ChannelError::PatternTimeout`]; partial
    /// output already read stays buffered and is attributed to the next
    /// read, so no bytes are lost.
    fn read_until(
        &mut self,
        prompt: &CompiledPrompt,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, ChannelError>> + Send;

    /// Read and discard whatever arrives inside `window`, then clear the
    /// buffer. Used to drop residual banner text; running out the window
    /// is the expected outcome, not an error.
    fn drain(&mut self, window: Duration) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Close the session. Idempotent and safe to call after a failed open.
    fn close(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    fn is_open(&self) -> bool;
}

/// CLI session over any duplex byte stream.
///
/// The SSH transport wraps this around its channel stream; tests wrap it
/// around an in-memory duplex pipe.
pub struct StreamSession<T> {
    stream: T,
    buffer: PatternBuffer,
    newline: String,
    open: bool,
}

impl<T> StreamSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: T, newline: impl Into<String>, search_depth: usize) -> Self {
        Self {
            stream,
            buffer: PatternBuffer::new(search_depth),
            newline: newline.into(),
            open: true,
        }
    }

    /// Bytes currently buffered but not yet consumed by a read.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl<T> CliSession for StreamSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::Closed);
        }
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(self.newline.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_until(
        &mut self,
        prompt: &CompiledPrompt,
        timeout: Duration,
    ) -> Result<String, ChannelError> {
        if !self.open {
            return Err(ChannelError::Closed);
        }
        let deadline = Instant::now() + timeout;
        let mut chunk = BytesMut::with_capacity(4096);

        loop {
            if let Some(end) = self.buffer.find_prompt_end(prompt) {
                let data = self.buffer.drain_through(end);
                return Ok(String::from_utf8_lossy(&data).into_owned());
            }

            let remaining = deadline
                .checked_duration_since(Instant::now())
                .filter(|d| !d.is_zero())
                .ok_or(ChannelError::PatternTimeout(timeout))?;

            chunk.clear();
            let n = tokio::time::timeout(remaining, self.stream.read_buf(&mut chunk))
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))??;

            if n == 0 {
                self.open = false;
                return Err(ChannelError::Closed);
            }
            self.buffer.extend(&chunk);
        }
    }

    async fn drain(&mut self, window: Duration) -> Result<(), ChannelError> {
        if !self.open {
            return Ok(());
        }
        let deadline = Instant::now() + window;
        let mut chunk = BytesMut::with_capacity(1024);

        loop {
            let Some(remaining) = deadline
                .checked_duration_since(Instant::now())
                .filter(|d| !d.is_zero())
            else {
                break;
            };

            chunk.clear();
            match tokio::time::timeout(remaining, self.stream.read_buf(&mut chunk)).await {
                Err(_) => break,
                Ok(Ok(0)) => {
                    self.open = false;
                    return Err(ChannelError::Closed);
                }
                Ok(Ok(n)) => debug!("drained {n} residual byte(s)"),
                Ok(Err(e)) => return Err(e.into()),
            }
        }

        self.buffer.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        if let Err(e) = self.stream.shutdown().await {
            debug!("stream shutdown failed: {e}");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// An interactive shell session on one remote device over SSH.
///
/// Owns the connection exclusively: dropping or closing the session tears
/// down the underlying transport.
pub struct SshSession {
    transport: SshTransport,
    inner: StreamSession<ChannelStream<Msg>>,
}

impl SshSession {
    /// Connect, authenticate, and open a PTY shell on the remote device.
    pub async fn open(
        config: SshConfig,
        newline: impl Into<String>,
        search_depth: usize,
    ) -> Result<Self, TransportError> {
        let transport = SshTransport::connect(config).await?;
        let stream = transport.open_shell().await?;
        debug!("shell open on {}", transport.config().socket_addr());
        Ok(Self {
            transport,
            inner: StreamSession::new(stream, newline, search_depth),
        })
    }

    /// Remote address this session is connected to.
    pub fn remote(&self) -> String {
        self.transport.config().socket_addr()
    }
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("remote", &self.remote())
            .field("open", &self.inner.is_open())
            .finish_non_exhaustive()
    }
}

impl CliSession for SshSession {
    async fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.inner.write_line(line).await
    }

    async fn read_until(
        &mut self,
        prompt: &CompiledPrompt,
        timeout: Duration,
    ) -> Result<String, ChannelError> {
        self.inner.read_until(prompt, timeout).await
    }

    async fn drain(&mut self, window: Duration) -> Result<(), ChannelError> {
        self.inner.drain(window).await
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if !self.inner.is_open() {
            return Ok(());
        }
        self.inner.close().await?;
        if let Err(e) = self.transport.close().await {
            warn!("disconnect failed: {e}");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}
