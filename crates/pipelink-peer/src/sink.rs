//! Logger sinks.
//!
//! Servers and clients report status lines and received messages to a
//! [`LogSink`]. Sinks are called synchronously from whichever task produced
//! the line; a sink shared by several servers sees their lines interleaved.

use std::sync::{Arc, Mutex, MutexGuard};

/// Accepts one line of text.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Shared handle to a sink, as stored by servers and clients.
pub type SharedSink = Arc<dyn LogSink>;

/// Discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _line: &str) {}
}

/// Collects lines in a shared buffer.
///
/// Clones share the same buffer, so one clone can be handed to a server while
/// another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected lines.
    pub fn lines(&self) -> Vec<String> {
        self.guard().clone()
    }

    /// All collected lines, each followed by `\n`.
    pub fn contents(&self) -> String {
        self.guard().iter().fold(String::new(), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
    }

    /// Whether any collected line equals `line`.
    pub fn contains(&self, line: &str) -> bool {
        self.guard().iter().any(|l| l == line)
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for BufferSink {
    fn log(&self, line: &str) {
        self.guard().push(line.to_string());
    }
}

/// Forwards lines to `tracing` at info level.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    label: Option<String>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with `label` (e.g. the channel name).
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        match &self.label {
            Some(label) => tracing::info!(label = %label, "{line}"),
            None => tracing::info!("{line}"),
        }
    }
}
