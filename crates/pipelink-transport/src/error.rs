use std::io::ErrorKind;
use std::path::PathBuf;

/// Errors that can occur in pipelink transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The channel name cannot be mapped to a socket path.
    #[error("invalid channel name {name:?}: {reason}")]
    InvalidChannelName { name: String, reason: &'static str },

    /// Another server currently owns the channel.
    #[error("channel '{name}' is already bound by another server")]
    ChannelInUse { name: String },

    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The connection was queued but the endpoint closed it without
    /// accepting it.
    #[error("server at {path} dropped the connection before accepting it")]
    NotAccepted { path: PathBuf },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The endpoint is not in a state that can accept a client.
    #[error("endpoint is not listening")]
    NotListening,
}

impl TransportError {
    /// Whether a failed connect means "no server is accepting right now".
    ///
    /// Clients keep polling on these until their connect timeout expires.
    pub fn is_not_listening(&self) -> bool {
        match self {
            TransportError::NotAccepted { .. } => true,
            TransportError::Connect { source, .. } => matches!(
                source.kind(),
                ErrorKind::NotFound | ErrorKind::ConnectionRefused
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn connect_error(kind: ErrorKind) -> TransportError {
        TransportError::Connect {
            path: PathBuf::from("/tmp/missing.sock"),
            source: std::io::Error::from(kind),
        }
    }

    #[test]
    fn missing_or_refused_socket_is_not_listening() {
        assert!(connect_error(ErrorKind::NotFound).is_not_listening());
        assert!(connect_error(ErrorKind::ConnectionRefused).is_not_listening());
    }

    #[test]
    fn dropped_queued_connection_is_not_listening() {
        let err = TransportError::NotAccepted {
            path: PathBuf::from("/tmp/busy.sock"),
        };
        assert!(err.is_not_listening());
    }

    #[test]
    fn other_failures_are_not_retried() {
        assert!(!connect_error(ErrorKind::PermissionDenied).is_not_listening());
        assert!(!TransportError::NotListening.is_not_listening());
    }
}
