use std::io::ErrorKind;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;

use crate::codec::{LineCodec, LineConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete lines from any `AsyncRead` stream.
///
/// Handles partial reads internally; callers always get whole lines.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    codec: LineCodec,
    eof: bool,
}

impl<T: AsyncRead + Unpin> LineReader<T> {
    /// Create a new line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LineConfig::default())
    }

    /// Create a new line reader with explicit configuration.
    pub fn with_config(inner: T, config: LineConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            codec: LineCodec::with_config(&config),
            eof: false,
        }
    }

    /// Read the next line.
    ///
    /// The terminator is not part of the returned line, and neither is one `\r`
    /// directly before it: `"text\r\n"` reads as `"text"`, so a message that
    /// itself ends in `\r` loses that byte. Other `\r` bytes are kept.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream and every
    /// buffered line has been handed out. Cancel safe: bytes received before
    /// the future is dropped stay buffered for the next call.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.codec.decode(&mut self.buf)? {
                return Ok(Some(line));
            }
            if self.eof {
                return self.codec.decode_eof(&mut self.buf);
            }

            self.buf.reserve(READ_CHUNK_SIZE);
            match self.inner.read_buf(&mut self.buf).await {
                Ok(0) => self.eof = true,
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Take every complete line that is already buffered, without reading.
    pub fn take_buffered_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(Some(line)) = self.codec.decode(&mut self.buf) {
            lines.push(line);
        }
        lines
    }

    /// Whether the peer has closed its side of the stream.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
