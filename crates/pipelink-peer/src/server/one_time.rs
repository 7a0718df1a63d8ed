use std::time::Duration;

use pipelink_transport::ServerEndpoint;

use super::engine::ServerEngine;

/// Serve a single client, then stop whatever happened.
pub(crate) async fn run(
    engine: &ServerEngine,
    mut endpoint: ServerEndpoint,
    timeout: Option<Duration>,
) {
    if let Err(err) = engine.serve_connection(&mut endpoint, timeout).await {
        engine.log(&format!("Server error: {err}"));
    }
}
