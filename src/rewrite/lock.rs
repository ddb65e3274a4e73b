//! Exclusive-run guard over the worker sentinel file.
//!
//! Two runs sharing a worker directory must never overlap: the mapping
//! state, branch markers, and the engine scratch are all single-writer.
//! The guard takes an OS-level advisory exclusive lock on the sentinel and
//! holds it for the whole run; release happens on drop, on every exit path,
//! and the kernel drops the lock if the process dies.
//!
//! When the sentinel is held elsewhere the guard retries on a fixed
//! interval and prints one "waiting" line per attempt so an operator can
//! see liveness. Disabling the guard is an explicit configuration opt-out,
//! in which case concurrency correctness is the operator's problem.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fs2::FileExt;

/// Wait between contended acquisition attempts.
const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// RAII guard for the exclusive-run lock.
///
/// Holds the sentinel file open and locked until dropped. The disabled
/// variant (locking off) holds nothing.
#[derive(Debug)]
pub struct RunLock {
    file: Option<File>,
}

impl RunLock {
    /// Acquires the exclusive lock on `path`, waiting as long as needed.
    ///
    /// With `enabled == false` this returns a no-op guard immediately.
    ///
    /// # Errors
    /// Fails if the sentinel cannot be created or a non-contention lock
    /// error occurs.
    pub fn acquire(path: &Path, enabled: bool) -> Result<Self, LockError> {
        if !enabled {
            return Ok(Self { file: None });
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError {
                path: path.to_path_buf(),
                source,
            })?;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file: Some(file) }),
                Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                    eprintln!(
                        "waiting for {} (held by another run)",
                        path.display()
                    );
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(source) => {
                    return Err(LockError {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }

    /// Returns true if this guard actually holds a lock.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            // Closing the fd would release the flock anyway.
            let _ = FileExt::unlock(file);
        }
    }
}

/// Sentinel creation or locking failed for a non-contention reason.
#[derive(Debug)]
pub struct LockError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot lock {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
