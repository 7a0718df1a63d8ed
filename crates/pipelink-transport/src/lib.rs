//! Named local channels over Unix domain sockets.
//!
//! This is the lowest layer of pipelink. A channel name resolves to a socket
//! path inside a runtime directory; a [`ServerEndpoint`] owns that name
//! exclusively and behaves like a single-instance named pipe: it listens until
//! one client connects, then serves only that client.
//!
//! Everything above builds on the [`IpcStream`] type provided here.

pub mod channel;
pub mod endpoint;
pub mod error;
pub mod lock;
pub mod traits;
pub mod uds;

pub use channel::{Channel, ChannelConfig, MAX_CHANNEL_NAME_LEN, RUNTIME_DIR_ENV};
pub use endpoint::{connect, ServerEndpoint, ACCEPT_ACK};
pub use error::{Result, TransportError};
pub use lock::ChannelLock;
pub use traits::IpcStream;
pub use uds::UnixDomainSocket;
