use std::io::BufRead;

use pipelink_frame::LineConfig;
use pipelink_peer::{PipeClient, TracingSink};

use crate::cmd::{channel_config, parse_timeout, runtime, SendArgs};
use crate::exit::{io_error, peer_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let messages = resolve_messages(&args, std::io::stdin().lock())?;
    let config = channel_config(args.runtime_dir.as_ref());

    runtime()?.block_on(async {
        let mut client = PipeClient::connect_with_config(
            &args.name,
            TracingSink::labeled(&args.name),
            timeout,
            &config,
            LineConfig::default(),
        )
        .await
        .map_err(|err| peer_error("connect failed", err))?;

        for message in &messages {
            if let Err(err) = client.send_message(message).await {
                client.dispose();
                return Err(peer_error("send failed", err));
            }
        }
        client.dispose();
        Ok(SUCCESS)
    })
}

/// `--message` values, or every line of `input` when none were given.
fn resolve_messages(args: &SendArgs, input: impl BufRead) -> CliResult<Vec<String>> {
    if !args.messages.is_empty() {
        return Ok(args.messages.clone());
    }
    input
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| io_error("failed reading stdin", err))
}
