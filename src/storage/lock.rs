//! Advisory locking on a sidecar `.lock` file.
//!
//! Readers take a shared lock and writers an exclusive one. Acquisition polls
//! `try_lock_*` until the configured bound elapses instead of blocking
//! forever, so a wedged holder surfaces as [`StoreError::LockTimeout`].

use crate::core::{Result, StoreError};
use log::debug;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "shared"),
            LockMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// Held advisory lock. Dropping the guard releases it.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl FileLock {
    pub fn acquire(
        path: &Path,
        mode: LockMode,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StoreError::io("Failed to open lock file", path, e))?;

        let started = Instant::now();
        loop {
            // Explicit trait calls: std::fs::File has inherent methods of the same names.
            let attempt = match mode {
                LockMode::Shared => fs2::FileExt::try_lock_shared(&file),
                LockMode::Exclusive => fs2::FileExt::try_lock_exclusive(&file),
            };

            match attempt {
                Ok(()) => {
                    debug!(
                        "acquired {} lock on '{}' after {} ms",
                        mode,
                        path.display(),
                        started.elapsed().as_millis()
                    );
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                        mode,
                    });
                }
                Err(err) if is_contended(&err) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(StoreError::LockTimeout {
                            path: path.to_path_buf(),
                            mode,
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    thread::sleep(poll_interval.min(timeout - waited));
                }
                Err(err) => {
                    return Err(StoreError::io(
                        &format!("Failed to take {} lock on", mode),
                        path,
                        err,
                    ));
                }
            }
        }
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        debug!("released {} lock on '{}'", self.mode, self.path.display());
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHORT: Duration = Duration::from_millis(60);
    const POLL: Duration = Duration::from_millis(5);

    #[test]
    fn test_shared_locks_coexist() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.lock");
        let first = FileLock::acquire(&path, LockMode::Shared, SHORT, POLL).unwrap();
        let second = FileLock::acquire(&path, LockMode::Shared, SHORT, POLL).unwrap();
        assert_eq!(first.mode(), LockMode::Shared);
        assert_eq!(second.path(), path.as_path());
    }

    #[test]
    fn test_exclusive_lock_times_out_while_held() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.lock");
        let _held = FileLock::acquire(&path, LockMode::Exclusive, SHORT, POLL).unwrap();

        let err = FileLock::acquire(&path, LockMode::Shared, SHORT, POLL).unwrap_err();
        match err {
            StoreError::LockTimeout { mode, waited_ms, .. } => {
                assert_eq!(mode, LockMode::Shared);
                assert!(waited_ms >= SHORT.as_millis() as u64);
            }
            other => panic!("expected lock timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_drop_releases_lock() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.lock");
        {
            let _held = FileLock::acquire(&path, LockMode::Exclusive, SHORT, POLL).unwrap();
        }
        assert!(FileLock::acquire(&path, LockMode::Exclusive, SHORT, POLL).is_ok());
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent").join("store.lock");
        let err = FileLock::acquire(&path, LockMode::Shared, SHORT, POLL).unwrap_err();
        assert!(matches!(err, StoreError::IoError(_)));
    }
}
