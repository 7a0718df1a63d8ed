use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct LineOutput<'a> {
    channel: &'a str,
    line: &'a str,
    timestamp: String,
}

/// Render one line logged by the server on `channel`.
pub fn render_line(channel: &str, line: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let out = LineOutput {
                channel,
                line,
                timestamp: now_unix_seconds(),
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "TIME", "LINE"])
                .add_row(vec![channel.to_string(), now_unix_seconds(), line.to_string()]);
            table.to_string()
        }
        OutputFormat::Pretty => format!("[{channel}] {line}"),
        OutputFormat::Raw => line.to_string(),
    }
}

pub fn print_line(channel: &str, line: &str, format: OutputFormat) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{}", render_line(channel, line, format));
    let _ = out.flush();
}

/// Sink printing every line to stdout in `format`.
pub fn stdout_sink(channel: &str, format: OutputFormat) -> impl Fn(&str) + Send + Sync + 'static {
    let channel = channel.to_string();
    move |line: &str| print_line(&channel, line, format)
}

pub fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
