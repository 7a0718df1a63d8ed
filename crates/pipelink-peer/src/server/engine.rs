use std::sync::Arc;
use std::time::Duration;

use pipelink_frame::{LineConfig, LineReader};
use pipelink_transport::{Channel, IpcStream, ServerEndpoint, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{ServerState, StateCell};
use crate::sink::SharedSink;

/// Pause between closing an endpoint and binding its replacement.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// How a wait for a client ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Connected,
    TimedOut,
    /// The server was disposed while waiting.
    Cancelled,
}

impl WaitOutcome {
    pub fn is_connected(self) -> bool {
        self == WaitOutcome::Connected
    }
}

/// Building blocks shared by every policy loop.
///
/// One engine belongs to one server instance; its cancellation token is the
/// server's lifetime signal.
#[derive(Clone)]
pub(crate) struct ServerEngine {
    sink: SharedSink,
    channel: Channel,
    line_config: LineConfig,
    state: Arc<StateCell>,
    cancel: CancellationToken,
}

impl ServerEngine {
    pub(crate) fn new(
        sink: SharedSink,
        channel: Channel,
        line_config: LineConfig,
        state: Arc<StateCell>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sink,
            channel,
            line_config,
            state,
            cancel,
        }
    }

    pub(crate) fn log(&self, line: &str) {
        self.sink.log(line);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Bind a fresh endpoint for this server's channel.
    ///
    /// Failures are logged and returned; callers must not retry silently.
    pub(crate) fn create_endpoint(&self) -> Result<ServerEndpoint, TransportError> {
        match ServerEndpoint::create(&self.channel) {
            Ok(endpoint) => {
                self.log(&format!("Pipeline server '{}' initialized", self.channel));
                Ok(endpoint)
            }
            Err(err) => {
                error!(channel = %self.channel, error = %err, "failed to create endpoint");
                self.log(&format!("ERROR: {err}"));
                Err(err)
            }
        }
    }

    /// Wait for a client, racing the optional timeout and the server's
    /// cancellation.
    ///
    /// A timeout leaves the endpoint listening so it can be awaited again.
    pub(crate) async fn await_connection(
        &self,
        endpoint: &mut ServerEndpoint,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, TransportError> {
        let accept = async {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, endpoint.accept()).await {
                    Ok(accepted) => accepted.map(|()| WaitOutcome::Connected),
                    Err(_) => Ok(WaitOutcome::TimedOut),
                },
                None => endpoint.accept().await.map(|()| WaitOutcome::Connected),
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Ok(WaitOutcome::Cancelled),
            outcome = accept => outcome,
        }
    }

    /// Forward every line from the connected client to the sink until it
    /// disconnects or the server is cancelled.
    ///
    /// Read failures end the connection; they never escape this loop.
    pub(crate) async fn read_until_disconnect(&self, endpoint: &mut ServerEndpoint) {
        let Some(stream) = endpoint.stream_mut() else {
            return;
        };
        let mut reader = LineReader::with_config(stream, self.line_config.clone());

        loop {
            // The sink may be slow; a dispose during `log` is only seen here.
            if self.is_cancelled() {
                self.forward_buffered(&mut reader);
                return;
            }

            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    self.forward_buffered(&mut reader);
                    return;
                }
                next = reader.read_line() => next,
            };

            match next {
                Ok(Some(line)) => self.sink.log(&line),
                Ok(None) => {
                    self.log("Client has disconnected.");
                    return;
                }
                Err(err) => {
                    warn!(channel = %self.channel, error = %err, "dropping connection after read failure");
                    self.log(&format!("Connection error: {err}"));
                    return;
                }
            }
        }
    }

    fn forward_buffered(&self, reader: &mut LineReader<&mut IpcStream>) {
        let lines = reader.take_buffered_lines();
        if !lines.is_empty() {
            debug!(channel = %self.channel, count = lines.len(), "forwarding buffered lines on cancel");
        }
        for line in lines {
            self.sink.log(&line);
        }
    }

    /// Close `endpoint`, wait for the settle delay, then bind a replacement.
    ///
    /// The old endpoint must no longer be read from.
    pub(crate) async fn reset_connection(
        &self,
        mut endpoint: ServerEndpoint,
    ) -> Result<ServerEndpoint, TransportError> {
        endpoint.disconnect();
        drop(endpoint);
        tokio::time::sleep(SETTLE_DELAY).await;
        self.create_endpoint()
    }

    /// One listening cycle: wait for a client and, if one arrives, read it
    /// until it goes away.
    pub(crate) async fn serve_connection(
        &self,
        endpoint: &mut ServerEndpoint,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, TransportError> {
        self.state.set(ServerState::Listening);
        self.log("Waiting for client connection...");

        let outcome = self.await_connection(endpoint, timeout).await?;
        match outcome {
            WaitOutcome::Connected => {
                self.log("A client has connected.");
                self.state.set(ServerState::Connected);
                self.read_until_disconnect(endpoint).await;
                self.state.set(ServerState::Draining);
            }
            WaitOutcome::TimedOut => self.log("Timeout waiting for client."),
            WaitOutcome::Cancelled => {}
        }
        Ok(outcome)
    }

    /// Mark the server stopped after its loop has returned.
    pub(crate) fn finish(&self) {
        self.state.stop();
        debug!(channel = %self.channel, "server loop finished");
        self.log(&format!("Pipeline server '{}' closed", self.channel));
    }
}
