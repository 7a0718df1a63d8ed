//! Pipe servers.
//!
//! A server is started by [`PipeServerBuilder`] and runs its accept/read loop
//! on one background task. The caller keeps a [`PipeServer`] handle that can
//! only observe the loop and ask it to stop.

mod builder;
mod engine;
mod fixed;
mod one_time;
mod sustained;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use self::builder::PipeServerBuilder;
pub use self::engine::{WaitOutcome, SETTLE_DELAY};

use crate::sink::SharedSink;

/// Default consecutive-timeout budget for sustained servers.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Default number of connections a fixed-connections server accepts.
pub const DEFAULT_CONNECTION_LIMIT: u32 = 3;

/// Connection acceptance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPolicy {
    /// Serve one client, then stop.
    OneTime,
    /// Serve clients one after another until `retry_limit` consecutive
    /// accept timeouts occur.
    Sustained { retry_limit: u32 },
    /// Serve exactly `connection_limit` clients, one after another.
    FixedConnections { connection_limit: u32 },
}

impl fmt::Display for ServerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerPolicy::OneTime => f.write_str("one-time"),
            ServerPolicy::Sustained { retry_limit } => {
                write!(f, "sustained (retry limit {retry_limit})")
            }
            ServerPolicy::FixedConnections { connection_limit } => {
                write!(f, "fixed-connections (limit {connection_limit})")
            }
        }
    }
}

/// Where a server's background loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    /// Endpoint bound, loop not yet waiting.
    Created = 0,
    /// Waiting for a client.
    Listening = 1,
    /// A client is connected and its lines are being read.
    Connected = 2,
    /// The client is gone and the endpoint is being replaced.
    Draining = 3,
    /// Terminal.
    Stopped = 4,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ServerState::Created,
            1 => ServerState::Listening,
            2 => ServerState::Connected,
            3 => ServerState::Draining,
            _ => ServerState::Stopped,
        }
    }
}

/// Shared state cell; once `Stopped` it never changes again.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ServerState::Created as u8))
    }

    pub(crate) fn get(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ServerState) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != ServerState::Stopped as u8).then_some(state as u8)
            });
    }

    /// Move to `Stopped`; returns `true` for the call that made the move.
    pub(crate) fn stop(&self) -> bool {
        self.0.swap(ServerState::Stopped as u8, Ordering::AcqRel) != ServerState::Stopped as u8
    }
}

/// Handle to a running pipe server.
///
/// Dropping the handle disposes the server.
pub struct PipeServer {
    channel: String,
    policy: ServerPolicy,
    accept_timeout: Option<Duration>,
    sink: SharedSink,
    state: Arc<StateCell>,
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl PipeServer {
    /// Channel name the server is bound to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn policy(&self) -> ServerPolicy {
        self.policy
    }

    /// Accept timeout per connection attempt; `None` waits forever.
    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    /// Whether the server has neither stopped on its own nor been disposed.
    pub fn is_active(&self) -> bool {
        self.state() != ServerState::Stopped
    }

    /// Stop the server.
    ///
    /// Idempotent and non-blocking: the state becomes `Stopped` immediately
    /// and the background loop winds down on its own. Use
    /// [`stopped`](Self::stopped) to wait for the endpoint to be released.
    pub fn dispose(&self) {
        if self.state.stop() {
            self.sink
                .log(&format!("Pipeline server '{}' disposed", self.channel));
        }
        self.cancel.cancel();
    }

    /// Resolves once the background loop has exited and released the channel.
    pub async fn stopped(&self) {
        self.finished.cancelled().await
    }
}

impl Drop for PipeServer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for PipeServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeServer")
            .field("channel", &self.channel)
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish()
    }
}
