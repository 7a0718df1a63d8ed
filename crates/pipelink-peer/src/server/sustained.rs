use std::time::Duration;

use pipelink_transport::ServerEndpoint;
use tracing::debug;

use super::engine::{ServerEngine, WaitOutcome};

/// Serve clients one after another.
///
/// `retry_limit` bounds consecutive accept timeouts (and accept failures);
/// every successful connection restores the full budget.
pub(crate) async fn run(
    engine: &ServerEngine,
    mut endpoint: ServerEndpoint,
    timeout: Option<Duration>,
    retry_limit: u32,
) {
    let mut retries_left = retry_limit;

    while !engine.is_cancelled() {
        match engine.serve_connection(&mut endpoint, timeout).await {
            Ok(WaitOutcome::Connected) => retries_left = retry_limit,
            Ok(WaitOutcome::TimedOut) => {
                retries_left = retries_left.saturating_sub(1);
                debug!(channel = %engine.channel(), retries_left, "accept timed out");
                if retries_left == 0 {
                    engine.log("Retry limit reached, stopping server.");
                    break;
                }
                // Nothing connected, so the endpoint is still listening.
                continue;
            }
            Ok(WaitOutcome::Cancelled) => break,
            Err(err) => {
                engine.log(&format!("Server error: {err}"));
                retries_left = retries_left.saturating_sub(1);
                if retries_left == 0 {
                    engine.log("Retry limit reached, stopping server.");
                    break;
                }
            }
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
