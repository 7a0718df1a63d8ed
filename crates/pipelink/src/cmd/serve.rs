use pipelink_peer::{PipeServer, PipeServerBuilder};
use tracing::{info, warn};

use crate::cmd::{channel_config, parse_timeout, runtime, ServeArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{stdout_sink, OutputFormat};
use crate::procinfo::ConnectionRecord;

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let policy = args.server_policy();
    let builder = PipeServerBuilder::new()
        .with_channel_config(channel_config(args.runtime_dir.as_ref()));

    runtime()?.block_on(async {
        let server = builder
            .build(stdout_sink(&args.name, format), &args.name, policy, timeout)
            .map_err(|err| peer_error("serve failed", err))?;

        if let Some(path) = &args.info_file {
            let record = ConnectionRecord::current(server.channel(), &policy.to_string());
            if let Err(err) = record.write(path) {
                server.dispose();
                server.stopped().await;
                return Err(err);
            }
        }

        wait_for_exit(&server).await;

        if let Some(path) = &args.info_file {
            ConnectionRecord::remove(path);
        }
        Ok(SUCCESS)
    })
}

/// Block until the server stops on its own or the process is interrupted.
async fn wait_for_exit(server: &PipeServer) {
    tokio::select! {
        () = server.stopped() => {}
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!(channel = server.channel(), "interrupt received, disposing server"),
                Err(err) => warn!(error = %err, "signal handler failed, disposing server"),
            }
            server.dispose();
            server.stopped().await;
        }
    }
}
