use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use pipelink_peer::{ServerPolicy, DEFAULT_CONNECTION_LIMIT, DEFAULT_RETRY_LIMIT};
use pipelink_transport::ChannelConfig;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a pipe server and print every line it logs.
    Serve(ServeArgs),
    /// Connect to a pipe server and send lines.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Serve a single client, then exit.
    OneTime,
    /// Keep serving until --retry-limit consecutive accept timeouts.
    Sustained,
    /// Serve exactly --connection-limit clients.
    Fixed,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Channel name to bind.
    pub name: String,
    /// Connection acceptance policy.
    #[arg(long, value_enum, default_value = "one-time")]
    pub policy: PolicyArg,
    /// Time to wait for each client (e.g. 5s, 500ms, infinite).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Consecutive accept timeouts tolerated by the sustained policy.
    #[arg(long, default_value_t = DEFAULT_RETRY_LIMIT)]
    pub retry_limit: u32,
    /// Number of clients served by the fixed policy.
    #[arg(long, default_value_t = DEFAULT_CONNECTION_LIMIT)]
    pub connection_limit: u32,
    /// Write a JSON record of this server process to PATH while it runs.
    #[arg(long, value_name = "PATH")]
    pub info_file: Option<PathBuf>,
    /// Directory holding channel sockets.
    #[arg(long, value_name = "DIR", env = "PIPELINK_RUNTIME_DIR")]
    pub runtime_dir: Option<PathBuf>,
}

impl ServeArgs {
    pub fn server_policy(&self) -> ServerPolicy {
        match self.policy {
            PolicyArg::OneTime => ServerPolicy::OneTime,
            PolicyArg::Sustained => ServerPolicy::Sustained {
                retry_limit: self.retry_limit,
            },
            PolicyArg::Fixed => ServerPolicy::FixedConnections {
                connection_limit: self.connection_limit,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Channel name to connect to.
    pub name: String,
    /// Message to send; repeat for several. Reads stdin lines when omitted.
    #[arg(long = "message", short = 'm', value_name = "TEXT")]
    pub messages: Vec<String>,
    /// Time to wait for the server to accept (e.g. 5s, 500ms, infinite).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Directory holding channel sockets.
    #[arg(long, value_name = "DIR", env = "PIPELINK_RUNTIME_DIR")]
    pub runtime_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn channel_config(runtime_dir: Option<&PathBuf>) -> ChannelConfig {
    match runtime_dir {
        Some(dir) => ChannelConfig::default().with_runtime_dir(dir),
        None => ChannelConfig::from_env(),
    }
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
}

/// Parse `5s`, `500ms`, a bare number of seconds, or `infinite` (no limit).
pub(crate) fn parse_timeout(input: &str) -> CliResult<Option<Duration>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }
    if input.eq_ignore_ascii_case("infinite") {
        return Ok(None);
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Some(Duration::from_millis(value))),
        _ => Ok(Some(Duration::from_secs(value))),
    }
}
