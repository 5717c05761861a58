//! Opt-in advisory lock around one invocation
//!
//! The lock is a file created with `create_new` next to the queue. It is
//! removed when the guard drops. A lock older than the stale threshold is
//! assumed to belong to a crashed run and is taken over.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::utils::error::StorageError;

#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl StateLock {
    /// Acquire the lock or fail with `StorageError::Locked`
    pub fn acquire(path: impl Into<PathBuf>, stale_after: Duration) -> Result<Self, StorageError> {
        let path = path.into();

        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if is_stale(&path, stale_after) {
                    tracing::warn!(path = %path.display(), "Removing stale state lock");
                    std::fs::remove_file(&path).map_err(|e| StorageError::write(&path, e))?;
                    Self::create(&path).map_err(|e| match e.kind() {
                        std::io::ErrorKind::AlreadyExists => StorageError::Locked { path: path.clone() },
                        _ => StorageError::write(&path, e),
                    })
                } else {
                    Err(StorageError::Locked { path })
                }
            }
            Err(e) => Err(StorageError::write(&path, e)),
        }
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        writeln!(file, "pid={} at={}", std::process::id(), chrono::Utc::now().to_rfc3339())?;
        tracing::debug!(path = %path.display(), "State lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age >= stale_after)
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to release state lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_is_locked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.txt.lock");

        let first = StateLock::acquire(&path, Duration::from_secs(3600)).unwrap();
        let second = StateLock::acquire(&path, Duration::from_secs(3600));
        assert!(matches!(second, Err(StorageError::Locked { .. })));

        drop(first);
        assert!(!path.exists());
        assert!(StateLock::acquire(&path, Duration::from_secs(3600)).is_ok());
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.txt.lock");
        std::fs::write(&path, "pid=1").unwrap();

        let lock = StateLock::acquire(&path, Duration::ZERO).unwrap();
        assert_eq!(lock.path(), path.as_path());
    }
}
