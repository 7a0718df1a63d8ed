use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;

use crate::codec::{LineCodec, LineConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete lines to any `AsyncWrite` stream.
///
/// Every line is flushed as soon as it is written; nothing is held back
/// between calls.
pub struct LineWriter<T> {
    inner: T,
    buf: BytesMut,
    codec: LineCodec,
    config: LineConfig,
}

impl<T: AsyncWrite + Unpin> LineWriter<T> {
    /// Create a new line writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LineConfig::default())
    }

    /// Create a new line writer with explicit configuration.
    pub fn with_config(inner: T, config: LineConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            codec: LineCodec::with_config(&config),
            config,
        }
    }

    /// Write `line` followed by a terminator, then flush.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.buf.clear();
        self.codec.encode(line, &mut self.buf)?;
        self.inner
            .write_all(&self.buf)
            .await
            .map_err(FrameError::Io)?;
        self.flush().await
    }

    /// Flush the underlying stream.
    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await.map_err(FrameError::Io)
    }

    /// Shut down the write half so the peer observes end of stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(FrameError::Io)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current line writer configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }
}
