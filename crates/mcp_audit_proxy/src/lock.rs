//! Advisory file locking with bounded exponential-backoff retry so
//! multiple proxy instances (one per proxied server) can safely append
//! to the same host's message store without starving each other.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;

use crate::error::ProxyError;

/// Holds an exclusive lock on a file for as long as it lives; the lock
/// is released automatically when the guard is dropped.
pub struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Attempts to acquire an exclusive lock on `path`, retrying with
/// exponential backoff (50ms, 100ms, 200ms, 400ms, 800ms, ...) up to
/// `max_retries` times before giving up.
pub fn acquire_lock(path: &Path, max_retries: u32) -> Result<FileLock, ProxyError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| ProxyError::StoreOpen {
            path: path.to_path_buf(),
            source,
        })?;

    for attempt in 0..=max_retries {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(FileLock { file }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if attempt < max_retries {
                    let wait_ms = 50u64 * (1u64 << attempt.min(10));
                    std::thread::sleep(Duration::from_millis(wait_ms));
                }
            }
            Err(source) => {
                return Err(ProxyError::StoreOpen {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    Err(ProxyError::LockTimeout {
        path: path.to_path_buf(),
        retries: max_retries,
    })
}

/// Derives a lock file path alongside the data file it protects.
pub fn lock_path_for(data_path: &Path) -> PathBuf {
    let mut lock_path = data_path.as_os_str().to_owned();
    lock_path.push(".lock");
    PathBuf::from(lock_path)
}
