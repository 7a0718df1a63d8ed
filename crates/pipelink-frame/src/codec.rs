use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};

/// Default maximum line length: 1 MiB.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Line terminator written after every message.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Configuration for line framing.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Maximum length of one line in bytes, terminator excluded. Default: 1 MiB.
    pub max_line_length: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Append `line` plus a terminator to `dst`.
///
/// Wire format: UTF-8 text followed by `\n`. The text is written as-is; a
/// caller that embeds `\n` sends several lines.
pub fn encode_line(line: &str, dst: &mut BytesMut) {
    dst.reserve(line.len() + 1);
    dst.put_slice(line.as_bytes());
    dst.put_u8(LINE_TERMINATOR);
}

/// Decode one line from the front of `src`.
///
/// Returns `Ok(None)` if no terminator has arrived yet. On success the line
/// and its terminator are consumed; a trailing `\r` is stripped.
pub fn decode_line(src: &mut BytesMut, max_line_length: usize) -> Result<Option<String>> {
    decode_line_from(src, 0, max_line_length)
}

fn decode_line_from(
    src: &mut BytesMut,
    scan_from: usize,
    max_line_length: usize,
) -> Result<Option<String>> {
    let Some(offset) = src[scan_from..].iter().position(|b| *b == LINE_TERMINATOR) else {
        if src.len() > max_line_length {
            return Err(FrameError::LineTooLong {
                size: src.len(),
                max: max_line_length,
            });
        }
        return Ok(None);
    };

    let end = scan_from + offset;
    if end > max_line_length {
        return Err(FrameError::LineTooLong {
            size: end,
            max: max_line_length,
        });
    }

    let mut line = src.split_to(end);
    src.advance(1);
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    Ok(Some(String::from_utf8(line.to_vec())?))
}

/// Newline-delimited text codec.
///
/// Remembers how far it has scanned so a long line arriving in many small
/// reads is not rescanned from the start each time.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_line_length: usize,
    scanned: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_config(&LineConfig::default())
    }

    pub fn with_config(config: &LineConfig) -> Self {
        Self {
            max_line_length: config.max_line_length,
            scanned: 0,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let scan_from = self.scanned.min(src.len());
        match decode_line_from(src, scan_from, self.max_line_length) {
            Ok(Some(line)) => {
                self.scanned = 0;
                Ok(Some(line))
            }
            Ok(None) => {
                self.scanned = src.len();
                Ok(None)
            }
            Err(err) => {
                self.scanned = 0;
                Err(err)
            }
        }
    }

    /// At end of stream an unterminated tail still counts as a final line.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        self.scanned = 0;
        let mut tail = src.split();
        if tail.last() == Some(&b'\r') {
            tail.truncate(tail.len() - 1);
        }
        Ok(Some(String::from_utf8(tail.to_vec())?))
    }
}

impl Encoder<&str> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, line: &str, dst: &mut BytesMut) -> Result<()> {
        if line.len() > self.max_line_length {
            return Err(FrameError::LineTooLong {
                size: line.len(),
                max: self.max_line_length,
            });
        }
        encode_line(line, dst);
        Ok(())
    }
}
