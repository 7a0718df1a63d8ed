use std::io::ErrorKind;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::channel::Channel;
use crate::error::{Result, TransportError};
use crate::lock::ChannelLock;
use crate::traits::IpcStream;
use crate::uds::UnixDomainSocket;

/// Byte an endpoint writes to a client right after accepting it.
pub const ACCEPT_ACK: u8 = 0x06;

/// A single-instance server endpoint for one channel.
///
/// The endpoint owns the channel lock for its whole life. Accepting a client
/// closes the listening socket, so at most one client is connected at a time
/// and later clients see the channel as "not listening" until the endpoint is
/// replaced with a fresh one.
#[derive(Debug)]
pub struct ServerEndpoint {
    channel: Channel,
    state: EndpointState,
    _lock: ChannelLock,
}

#[derive(Debug)]
enum EndpointState {
    Listening(UnixDomainSocket),
    Connected(IpcStream),
    Disconnected,
}

impl ServerEndpoint {
    /// Create a fresh, unconnected endpoint bound to `channel`.
    ///
    /// Fails with [`TransportError::ChannelInUse`] when another server owns the
    /// name. Must be called from within a Tokio runtime.
    pub fn create(channel: &Channel) -> Result<Self> {
        let lock = ChannelLock::acquire(channel)?;
        let socket = UnixDomainSocket::bind_with_mode(channel.socket_path(), channel.socket_mode())?;
        info!(channel = %channel, "server endpoint created");
        Ok(Self {
            channel: channel.clone(),
            state: EndpointState::Listening(socket),
            _lock: lock,
        })
    }

    /// Wait for a client, acknowledge it with [`ACCEPT_ACK`], and move to the
    /// connected state.
    ///
    /// A client that leaves before the acknowledgement is written is skipped
    /// and the endpoint keeps listening. Cancel safe: if the future is dropped
    /// before a client is acknowledged the endpoint is still listening and can
    /// be awaited again.
    pub async fn accept(&mut self) -> Result<()> {
        let EndpointState::Listening(socket) = &self.state else {
            return Err(TransportError::NotListening);
        };
        let stream = loop {
            let mut stream = socket.accept().await?;
            match stream.write_all(&[ACCEPT_ACK]).await {
                Ok(()) => break stream,
                Err(err) => {
                    debug!(channel = %self.channel, error = %err, "client left before it was acknowledged");
                }
            }
        };

        if let Some((uid, gid, pid)) = stream.peer_credentials() {
            debug!(channel = %self.channel, uid, gid, ?pid, "client credentials");
        }

        // Dropping the listener removes the socket file.
        self.state = EndpointState::Connected(stream);
        Ok(())
    }

    /// Whether a client is currently connected.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, EndpointState::Connected(_))
    }

    /// Whether the endpoint is still waiting for its client.
    pub fn is_listening(&self) -> bool {
        matches!(self.state, EndpointState::Listening(_))
    }

    /// The connected stream, if any.
    pub fn stream_mut(&mut self) -> Option<&mut IpcStream> {
        match &mut self.state {
            EndpointState::Connected(stream) => Some(stream),
            _ => None,
        }
    }

    /// Drop the connected client, if there is one.
    ///
    /// The endpoint does not listen again afterwards; it has to be replaced.
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            debug!(channel = %self.channel, "disconnecting client");
            self.state = EndpointState::Disconnected;
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

/// Connect to the endpoint serving `channel` and wait until it has accepted
/// this client.
///
/// The kernel may queue a connection that the endpoint never accepts, because
/// it took another client and closed its listener. Such a connection ends
/// without an acknowledgement and fails with [`TransportError::NotAccepted`],
/// which counts as "not listening".
pub async fn connect(channel: &Channel) -> Result<IpcStream> {
    let path = channel.socket_path();
    let mut stream = UnixDomainSocket::connect(path).await?;

    let mut ack = [0u8; 1];
    match stream.read_exact(&mut ack).await {
        Ok(_) if ack[0] == ACCEPT_ACK => Ok(stream),
        Ok(_) => Err(TransportError::Io(std::io::Error::new(
            ErrorKind::InvalidData,
            format!("unexpected accept acknowledgement {:#04x}", ack[0]),
        ))),
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
            ) =>
        {
            debug!(channel = %channel, error = %err, "queued connection was dropped");
            Err(TransportError::NotAccepted {
                path: path.to_path_buf(),
            })
        }
        Err(err) => Err(TransportError::Io(err)),
    }
}
