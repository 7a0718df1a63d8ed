use std::path::{Path, PathBuf};

use crate::error::{Result, TransportError};

/// Environment variable overriding the directory that holds channel sockets.
pub const RUNTIME_DIR_ENV: &str = "PIPELINK_RUNTIME_DIR";

/// Maximum channel name length in bytes.
pub const MAX_CHANNEL_NAME_LEN: usize = 64;

/// Where channel sockets and lock files live.
///
/// A server and its clients must resolve channel names with the same
/// `runtime_dir`, otherwise they will not find each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Directory holding `<name>.sock` and `<name>.lock`.
    pub runtime_dir: PathBuf,
    /// Permission mode applied to created sockets. Default: `0o600`.
    pub socket_mode: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            runtime_dir: std::env::temp_dir().join("pipelink"),
            socket_mode: 0o600,
        }
    }
}

impl ChannelConfig {
    /// Default configuration, with `runtime_dir` taken from
    /// `PIPELINK_RUNTIME_DIR` when set.
    pub fn from_env() -> Self {
        match std::env::var_os(RUNTIME_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self {
                runtime_dir: PathBuf::from(dir),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    /// Use an explicit runtime directory.
    pub fn with_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = dir.into();
        self
    }
}

/// A validated channel name resolved to its rendezvous paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    name: String,
    socket_path: PathBuf,
    lock_path: PathBuf,
    socket_mode: u32,
}

impl Channel {
    /// Resolve `name` using [`ChannelConfig::from_env`].
    pub fn new(name: &str) -> Result<Self> {
        Self::with_config(name, &ChannelConfig::from_env())
    }

    /// Resolve `name` inside an explicit configuration.
    pub fn with_config(name: &str, config: &ChannelConfig) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            socket_path: config.runtime_dir.join(format!("{name}.sock")),
            lock_path: config.runtime_dir.join(format!("{name}.lock")),
            socket_mode: config.socket_mode,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn socket_mode(&self) -> u32 {
        self.socket_mode
    }

    /// Directory shared by the socket and lock paths.
    pub fn runtime_dir(&self) -> Option<&Path> {
        self.socket_path.parent()
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| TransportError::InvalidChannelName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > MAX_CHANNEL_NAME_LEN {
        return Err(invalid("name exceeds 64 bytes"));
    }
    if name.starts_with('.') {
        return Err(invalid("name must not start with '.'"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_socket_and_lock_paths() {
        let config = ChannelConfig::default().with_runtime_dir("/tmp/pipelink-test");
        let channel = Channel::with_config("build.events", &config).unwrap();

        assert_eq!(channel.name(), "build.events");
        assert_eq!(
            channel.socket_path(),
            Path::new("/tmp/pipelink-test/build.events.sock")
        );
        assert_eq!(
            channel.lock_path(),
            Path::new("/tmp/pipelink-test/build.events.lock")
        );
        assert_eq!(channel.socket_mode(), 0o600);
        assert_eq!(channel.runtime_dir(), Some(Path::new("/tmp/pipelink-test")));
    }

    #[test]
    fn rejects_unsafe_names() {
        let config = ChannelConfig::default();
        for name in ["", ".hidden", "a/b", "..", "with space", "nul\0byte"] {
            let result = Channel::with_config(name, &config);
            assert!(
                matches!(result, Err(TransportError::InvalidChannelName { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "x".repeat(MAX_CHANNEL_NAME_LEN + 1);
        let result = Channel::with_config(&name, &ChannelConfig::default());
        assert!(matches!(
            result,
            Err(TransportError::InvalidChannelName { .. })
        ));
    }

    #[test]
    fn display_is_the_bare_name() {
        let channel = Channel::with_config("status", &ChannelConfig::default()).unwrap();
        assert_eq!(channel.to_string(), "status");
    }
}
