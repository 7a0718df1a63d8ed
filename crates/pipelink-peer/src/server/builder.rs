use std::sync::Arc;
use std::time::Duration;

use pipelink_frame::LineConfig;
use pipelink_transport::{Channel, ChannelConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::engine::ServerEngine;
use super::{fixed, one_time, sustained, PipeServer, ServerPolicy, StateCell};
use crate::error::Result;
use crate::sink::{LogSink, SharedSink};

/// Starts pipe servers.
///
/// Every `build_*` call binds the channel synchronously, so a name that is
/// invalid or already taken fails right here, and then launches the policy
/// loop on a background Tokio task. All of them must be called from within a
/// Tokio runtime.
#[derive(Debug, Clone)]
pub struct PipeServerBuilder {
    channel_config: ChannelConfig,
    line_config: LineConfig,
}

impl Default for PipeServerBuilder {
    fn default() -> Self {
        Self {
            channel_config: ChannelConfig::from_env(),
            line_config: LineConfig::default(),
        }
    }
}

impl PipeServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override where channel sockets are created.
    pub fn with_channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Override line framing limits for received messages.
    pub fn with_line_config(mut self, config: LineConfig) -> Self {
        self.line_config = config;
        self
    }

    /// Accept one client and process its messages until it disconnects.
    ///
    /// If nobody connects within `timeout` the server logs the timeout and
    /// stops. `None` waits forever.
    pub fn build_one_time(
        &self,
        sink: impl LogSink + 'static,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<PipeServer> {
        self.build(sink, name, ServerPolicy::OneTime, timeout)
    }

    /// Accept clients one after another until `retry_limit` consecutive
    /// connection attempts time out.
    pub fn build_sustained(
        &self,
        sink: impl LogSink + 'static,
        name: &str,
        timeout: Option<Duration>,
        retry_limit: u32,
    ) -> Result<PipeServer> {
        self.build(sink, name, ServerPolicy::Sustained { retry_limit }, timeout)
    }

    /// Accept exactly `connection_limit` clients one after another.
    pub fn build_fixed_connections(
        &self,
        sink: impl LogSink + 'static,
        name: &str,
        timeout: Option<Duration>,
        connection_limit: u32,
    ) -> Result<PipeServer> {
        self.build(
            sink,
            name,
            ServerPolicy::FixedConnections { connection_limit },
            timeout,
        )
    }

    /// Start a server with an explicit policy.
    pub fn build(
        &self,
        sink: impl LogSink + 'static,
        name: &str,
        policy: ServerPolicy,
        timeout: Option<Duration>,
    ) -> Result<PipeServer> {
        let sink: SharedSink = Arc::new(sink);
        let channel = Channel::with_config(name, &self.channel_config).inspect_err(|err| {
            sink.log(&format!("ERROR: {err}"));
        })?;

        let state = Arc::new(StateCell::new());
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let engine = ServerEngine::new(
            sink.clone(),
            channel,
            self.line_config.clone(),
            state.clone(),
            cancel.clone(),
        );

        let endpoint = engine.create_endpoint()?;
        info!(channel = name, %policy, ?timeout, "starting pipe server");

        let finished_guard = finished.clone().drop_guard();
        tokio::spawn(async move {
            let _finished = finished_guard;
            match policy {
                ServerPolicy::OneTime => one_time::run(&engine, endpoint, timeout).await,
                ServerPolicy::Sustained { retry_limit } => {
                    sustained::run(&engine, endpoint, timeout, retry_limit).await
                }
                ServerPolicy::FixedConnections { connection_limit } => {
                    fixed::run(&engine, endpoint, timeout, connection_limit).await
                }
            }
            engine.finish();
        });

        Ok(PipeServer {
            channel: name.to_string(),
            policy,
            accept_timeout: timeout,
            sink,
            state,
            cancel,
            finished,
        })
    }
}
