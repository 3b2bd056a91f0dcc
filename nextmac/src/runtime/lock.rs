//! Allocator lock to serialize concurrent allocator invocations.
//!
//! Uses flock on a file next to the persisted pool files so that boot
//! scripts provisioning interfaces in parallel never interleave their
//! read-modify-write cycles on the whitelist or the registry.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nextmac_shared::errors::{MacError, MacResult};

/// Interval between non-blocking lock attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// A lock guard that holds an exclusive lock on the allocator state.
///
/// The lock is automatically released when this guard is dropped,
/// or when the process exits/crashes.
#[derive(Debug)]
pub struct AllocatorLock {
    file: File,
    path: PathBuf,
}

impl AllocatorLock {
    /// Acquire the exclusive lock at `lock_path`, waiting at most `timeout`.
    ///
    /// # Returns
    /// * `Ok(AllocatorLock)` - Lock held until the guard is dropped
    /// * `Err(MacError::Busy)` - Another allocator kept the lock past `timeout`
    /// * `Err(MacError::Storage)` - The lock file could not be opened or locked
    pub fn acquire(lock_path: &Path, timeout: Duration) -> MacResult<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MacError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| {
                MacError::Storage(format!(
                    "failed to open lock file {}: {}",
                    lock_path.display(),
                    e
                ))
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            match try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(MacError::Busy(format!(
                            "another allocator holds {} (waited {:?})",
                            lock_path.display(),
                            timeout
                        )));
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => {
                    return Err(MacError::Storage(format!(
                        "failed to acquire lock {}: {}",
                        lock_path.display(),
                        err
                    )));
                }
            }
        }

        tracing::debug!(lock_path = %lock_path.display(), "Acquired allocator lock");

        Ok(AllocatorLock {
            file,
            path: lock_path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
compile_error!("nextmac only supports unix targets");

impl Drop for AllocatorLock {
    fn drop(&mut self) {
        // The OS also releases the lock when the file is closed
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }

        tracing::debug!(lock_path = %self.path.display(), "Released allocator lock");
    }
}
