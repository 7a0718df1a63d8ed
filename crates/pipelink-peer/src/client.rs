use std::sync::Arc;
use std::time::Duration;

use pipelink_frame::{LineConfig, LineWriter};
use pipelink_transport::{Channel, ChannelConfig, IpcStream};
use tracing::debug;

use crate::error::{PeerError, Result};
use crate::sink::{LogSink, SharedSink};

/// Default time a client waits for a server to accept it.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How often a connecting client re-checks a channel that is not accepting.
pub const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Sends lines to a pipe server.
///
/// A client only exists once it is connected. Dropping it (or calling
/// [`dispose`](Self::dispose)) closes the connection, which the server sees as
/// an orderly disconnect.
pub struct PipeClient {
    channel: String,
    sink: SharedSink,
    writer: Option<LineWriter<IpcStream>>,
}

impl PipeClient {
    /// Connect to `name`, resolving it with [`ChannelConfig::from_env`].
    ///
    /// Waits until a server accepts or `timeout` elapses; `None` waits forever.
    pub async fn connect(
        name: &str,
        sink: impl LogSink + 'static,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        Self::connect_with_config(
            name,
            sink,
            timeout,
            &ChannelConfig::from_env(),
            LineConfig::default(),
        )
        .await
    }

    /// Connect with explicit channel and line configuration.
    pub async fn connect_with_config(
        name: &str,
        sink: impl LogSink + 'static,
        timeout: Option<Duration>,
        channel_config: &ChannelConfig,
        line_config: LineConfig,
    ) -> Result<Self> {
        let sink: SharedSink = Arc::new(sink);
        sink.log("Client connecting...");

        let stream = match Self::open(name, timeout, channel_config).await {
            Ok(stream) => stream,
            Err(err) => {
                sink.log(&format!("Error: {err}"));
                return Err(err);
            }
        };

        sink.log("Client connected.");
        Ok(Self {
            channel: name.to_string(),
            sink,
            writer: Some(LineWriter::with_config(stream, line_config)),
        })
    }

    async fn open(
        name: &str,
        timeout: Option<Duration>,
        channel_config: &ChannelConfig,
    ) -> Result<IpcStream> {
        let channel = Channel::with_config(name, channel_config)?;
        let attempt = connect_when_listening(&channel);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| PeerError::ConnectTimeout {
                    channel: name.to_string(),
                    timeout: limit,
                })?,
            None => attempt.await,
        }
    }

    /// Channel name this client connected to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the connection is still held (not yet disposed).
    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    /// Write `message` as one line and flush it.
    ///
    /// After [`dispose`](Self::dispose) this logs and does nothing. Write
    /// failures are logged and returned; the client can still be disposed.
    pub async fn send_message(&mut self, message: &str) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            self.sink.log("Client not connected!");
            return Ok(());
        };

        self.sink.log("Sending message via pipeline...");
        if let Err(err) = writer.write_line(message).await {
            self.sink.log(&format!("Error: {err}"));
            return Err(PeerError::Send(err));
        }
        Ok(())
    }

    /// Release the connection. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(writer) = self.writer.take() {
            debug!(channel = %self.channel, "closing pipe client");
            drop(writer.into_inner());
        }
    }
}

impl Drop for PipeClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for PipeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeClient")
            .field("channel", &self.channel)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Keep trying until a server has accepted this client on `channel`.
///
/// A missing or refusing socket means the server is not up yet or is between
/// clients. A queued connection that the server dropped for another client is
/// retried the same way. Any other failure is returned immediately.
async fn connect_when_listening(channel: &Channel) -> Result<IpcStream> {
    loop {
        match pipelink_transport::connect(channel).await {
            Ok(stream) => return Ok(stream),
            Err(err) if err.is_not_listening() => {
                tokio::time::sleep(CONNECT_POLL_INTERVAL).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pipelink_transport::ServerEndpoint;

    use super::*;
    use crate::sink::BufferSink;

    fn test_config(tag: &str) -> ChannelConfig {
        ChannelConfig::default().with_runtime_dir(std::env::temp_dir().join(format!(
            "pipelink-client-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        )))
    }

    #[tokio::test]
    async fn connect_times_out_without_server() {
        let config = test_config("timeout");
        let sink = BufferSink::new();

        let result = PipeClient::connect_with_config(
            "absent",
            sink.clone(),
            Some(Duration::from_millis(100)),
            &config,
            LineConfig::default(),
        )
        .await;

        assert!(matches!(result, Err(PeerError::ConnectTimeout { .. })));
        assert_eq!(sink.lines()[0], "Client connecting...");
        assert!(sink.lines()[1].starts_with("Error: "));
    }

    #[tokio::test]
    async fn invalid_channel_name_fails_fast() {
        let sink = BufferSink::new();
        let result = PipeClient::connect_with_config(
            "../escape",
            sink.clone(),
            None,
            &test_config("invalid"),
            LineConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(PeerError::Transport(_))));
        assert!(sink.lines().iter().any(|l| l.starts_with("Error: ")));
    }

    #[tokio::test]
    async fn connect_waits_for_a_late_server() {
        let config = test_config("late");
        let channel = Channel::with_config("late", &config).unwrap();

        let server = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let mut endpoint = ServerEndpoint::create(&channel).expect("endpoint should bind");
            endpoint.accept().await.expect("accept should succeed");
            endpoint
        });

        let client = PipeClient::connect_with_config(
            "late",
            BufferSink::new(),
            Some(Duration::from_secs(5)),
            &config,
            LineConfig::default(),
        )
        .await
        .expect("client should connect once the server binds");
        assert!(client.is_connected());
        assert_eq!(client.channel(), "late");

        drop(server.await.unwrap());
        let _ = std::fs::remove_dir_all(&config.runtime_dir);
    }

    #[tokio::test]
    async fn send_after_dispose_is_logged_noop() {
        let config = test_config("dispose");
        let channel = Channel::with_config("dispose", &config).unwrap();
        let mut endpoint = ServerEndpoint::create(&channel).expect("endpoint should bind");

        let sink = BufferSink::new();
        let (accepted, client) = tokio::join!(
            endpoint.accept(),
            PipeClient::connect_with_config(
                "dispose",
                sink.clone(),
                Some(Duration::from_secs(5)),
                &config,
                LineConfig::default(),
            )
        );
        accepted.expect("accept should succeed");
        let mut client = client.expect("client should connect");

        client.dispose();
        client.dispose();
        assert!(!client.is_connected());

        client
            .send_message("after dispose")
            .await
            .expect("send after dispose must not fail");
        assert!(sink.contains("Client not connected!"));

        drop(endpoint);
        let _ = std::fs::remove_dir_all(&config.runtime_dir);
    }
}
