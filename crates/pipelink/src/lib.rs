//! Local line-oriented IPC over named channels.
//!
//! pipelink runs servers that accept clients on a named local channel, one at
//! a time, and forward every line a client writes to a logger sink. Three
//! acceptance policies are provided: one-time, sustained and fixed-connections.
//!
//! # Crate Structure
//!
//! - [`transport`]: Channel names, exclusive binding and Unix socket endpoints
//! - [`frame`]: Newline-delimited UTF-8 line framing
//! - [`peer`]: Pipe servers, policies, clients and logger sinks (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use pipelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pipelink_frame::*;
}

/// Re-export server and client types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use pipelink_peer::*;
}
