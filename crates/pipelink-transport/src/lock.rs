use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::channel::Channel;
use crate::error::{Result, TransportError};

/// Exclusive ownership of a channel name.
///
/// Backed by a non-blocking `flock` on `<name>.lock`. The lock is tied to the
/// open file description, so it is released when this value is dropped, and
/// two owners inside the same process conflict just like two processes do.
/// The lock file itself is left on disk.
#[derive(Debug)]
pub struct ChannelLock {
    _file: File,
    path: PathBuf,
}

impl ChannelLock {
    /// Take the lock for `channel`, failing with [`TransportError::ChannelInUse`]
    /// if any other owner holds it.
    pub fn acquire(channel: &Channel) -> Result<Self> {
        let path = channel.lock_path().to_path_buf();
        let bind_err = |source| TransportError::Bind {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(bind_err)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(bind_err)?;

        // SAFETY: `file` owns an open descriptor for the duration of the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::WouldBlock {
                return Err(TransportError::ChannelInUse {
                    name: channel.name().to_string(),
                });
            }
            return Err(bind_err(err));
        }

        debug!(?path, "acquired channel lock");
        Ok(Self { _file: file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ChannelLock {
    fn drop(&mut self) {
        debug!(path = ?self.path, "releasing channel lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelConfig;

    fn test_channel(tag: &str) -> Channel {
        let dir = std::env::temp_dir().join(format!(
            "pipelink-lock-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        Channel::with_config("locked", &ChannelConfig::default().with_runtime_dir(dir))
            .expect("channel name should be valid")
    }

    #[test]
    fn second_owner_is_rejected() {
        let channel = test_channel("twice");
        let first = ChannelLock::acquire(&channel).expect("first lock should succeed");
        assert!(first.path().exists());

        let second = ChannelLock::acquire(&channel);
        assert!(matches!(second, Err(TransportError::ChannelInUse { .. })));

        drop(first);
        if let Some(dir) = channel.runtime_dir() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn lock_is_released_on_drop() {
        let channel = test_channel("release");
        let first = ChannelLock::acquire(&channel).expect("first lock should succeed");
        drop(first);

        let again = ChannelLock::acquire(&channel);
        assert!(again.is_ok(), "lock should be reusable after drop");

        drop(again);
        if let Some(dir) = channel.runtime_dir() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
