//! Line-oriented pipe servers and clients.
//!
//! A server owns one named channel and forwards every line a client writes to
//! a [`LogSink`], together with its own status lines. How many clients it
//! serves before stopping is set by its [`ServerPolicy`]. A [`PipeClient`]
//! connects to a channel and writes lines to it.
//!
//! ```no_run
//! # async fn demo() -> pipelink_peer::Result<()> {
//! use std::time::Duration;
//! use pipelink_peer::{PipeClient, PipeServerBuilder, TracingSink};
//!
//! let server = PipeServerBuilder::new()
//!     .build_one_time(TracingSink::new(), "telemetry", Some(Duration::from_secs(5)))?;
//!
//! let mut client = PipeClient::connect("telemetry", TracingSink::new(), None).await?;
//! client.send_message("hello").await?;
//! client.dispose();
//!
//! server.stopped().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod server;
pub mod sink;

pub use client::{PipeClient, CONNECT_POLL_INTERVAL, DEFAULT_CONNECT_TIMEOUT};
pub use error::{PeerError, Result};
pub use server::{
    PipeServer, PipeServerBuilder, ServerPolicy, ServerState, WaitOutcome,
    DEFAULT_CONNECTION_LIMIT, DEFAULT_RETRY_LIMIT, SETTLE_DELAY,
};
pub use sink::{BufferSink, LogSink, NoopSink, SharedSink, TracingSink};
