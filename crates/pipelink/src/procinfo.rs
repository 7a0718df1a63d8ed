//! Connection record written by `serve --info-file`.
//!
//! External tooling reads it to find (and, if needed, signal) the process that
//! owns a channel.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::exit::{io_error, CliError, CliResult, INTERNAL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub pid: u32,
    /// Unix seconds.
    pub started_at: u64,
    pub channel: String,
    pub policy: String,
}

impl ConnectionRecord {
    pub fn current(channel: &str, policy: &str) -> Self {
        Self {
            pid: std::process::id(),
            started_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            channel: channel.to_string(),
            policy: policy.to_string(),
        }
    }

    /// Write the record, replacing any previous file atomically.
    pub fn write(&self, path: &Path) -> CliResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|err| CliError::new(INTERNAL, format!("encode info file: {err}")))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)
            .map_err(|err| io_error(&format!("failed writing {}", tmp.display()), err))?;
        fs::rename(&tmp, path)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))
    }

    /// Remove the record; a missing file is not an error.
    pub fn remove(path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "failed to remove info file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> ConnectionRecord {
        serde_json::from_slice(&fs::read(path).expect("info file should exist"))
            .expect("info file should be valid json")
    }

    #[test]
    fn write_read_remove() {
        let dir = std::env::temp_dir().join(format!(
            "pipelink-procinfo-{}-{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("server.json");

        let record = ConnectionRecord::current("telemetry", "one-time");
        record.write(&path).expect("write should succeed");
        assert_eq!(read(&path), record);
        assert_eq!(record.pid, std::process::id());

        ConnectionRecord::remove(&path);
        assert!(!path.exists());
        ConnectionRecord::remove(&path);

        let _ = fs::remove_dir_all(&dir);
    }
}
