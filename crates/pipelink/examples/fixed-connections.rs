//! Fixed-connections server fed by a handful of sequential clients.
//!
//! Run with:
//!   cargo run --example fixed-connections --features peer
//!
//! Or start the server alone and connect from another terminal:
//!   cargo run --features cli -- serve demo --policy fixed --connection-limit 3
//!   cargo run --features cli -- send demo -m "hello"

use std::time::Duration;

use pipelink::peer::{BufferSink, PipeClient, PipeServerBuilder};
use pipelink::transport::ChannelConfig;

const CLIENTS: u32 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime_dir = std::env::temp_dir().join(format!("pipelink-demo-{}", std::process::id()));
    let config = ChannelConfig::default().with_runtime_dir(&runtime_dir);

    let server_log = BufferSink::new();
    let server = PipeServerBuilder::new()
        .with_channel_config(config.clone())
        .build_fixed_connections(
            server_log.clone(),
            "demo",
            Some(Duration::from_secs(5)),
            CLIENTS,
        )?;
    eprintln!("Serving {} ({})", server.channel(), server.policy());

    for i in 1..=CLIENTS {
        let mut client = PipeClient::connect_with_config(
            "demo",
            |line: &str| eprintln!("client: {line}"),
            Some(Duration::from_secs(5)),
            &config,
            Default::default(),
        )
        .await?;
        client.send_message(&format!("message from client {i}")).await?;
        client.dispose();

        // Let the server reset before the next client dials in.
        while server_log
            .lines()
            .iter()
            .filter(|l| *l == "Client has disconnected.")
            .count()
            < i as usize
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    server.stopped().await;
    print!("{}", server_log.contents());

    let _ = std::fs::remove_dir_all(&runtime_dir);
    Ok(())
}
