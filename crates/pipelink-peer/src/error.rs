use std::time::Duration;

/// Errors that can occur in pipe server and client operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error (binding, connecting, accepting).
    #[error("transport error: {0}")]
    Transport(#[from] pipelink_transport::TransportError),

    /// Line framing error.
    #[error("frame error: {0}")]
    Frame(#[from] pipelink_frame::FrameError),

    /// No server accepted the client before the connect timeout.
    #[error("timed out connecting to channel '{channel}' after {timeout:?}")]
    ConnectTimeout { channel: String, timeout: Duration },

    /// Writing a message to the server failed.
    #[error("failed to send message: {0}")]
    Send(#[source] pipelink_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, PeerError>;
