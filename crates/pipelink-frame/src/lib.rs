//! Newline-delimited text framing for pipelink channels.
//!
//! Every message is one UTF-8 line terminated by `\n`. Readers hand back whole
//! lines and report end of stream as `None`, so a peer hanging up is an
//! ordinary outcome rather than an error.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_line, encode_line, LineCodec, LineConfig, DEFAULT_MAX_LINE_LENGTH, LINE_TERMINATOR,
};
pub use error::{FrameError, Result};
pub use reader::LineReader;
pub use writer::LineWriter;
