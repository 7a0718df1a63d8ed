use std::time::Duration;

use pipelink_transport::ServerEndpoint;
use tracing::debug;

use super::engine::{ServerEngine, WaitOutcome};

/// Serve `connection_limit` clients one after another, then stop.
///
/// Only successful connections use up the budget; timeouts just wait again.
pub(crate) async fn run(
    engine: &ServerEngine,
    mut endpoint: ServerEndpoint,
    timeout: Option<Duration>,
    connection_limit: u32,
) {
    let mut remaining = connection_limit;

    while remaining > 0 && !engine.is_cancelled() {
        match engine.serve_connection(&mut endpoint, timeout).await {
            Ok(WaitOutcome::Connected) => {
                remaining -= 1;
                debug!(channel = %engine.channel(), remaining, "connection served");
                if remaining == 0 {
                    engine.log("Connection limit reached, stopping server.");
                    break;
                }
            }
            Ok(WaitOutcome::TimedOut) => continue,
            Ok(WaitOutcome::Cancelled) => break,
            Err(err) => engine.log(&format!("Server error: {err}")),
        }

        if engine.is_cancelled() {
            break;
        }
        endpoint = match engine.reset_connection(endpoint).await {
            Ok(fresh) => fresh,
            Err(_) => break,
        };
    }
}
