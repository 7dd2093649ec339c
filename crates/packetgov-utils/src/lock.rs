//! Advisory file locking with crash recovery.
//!
//! Writers serialize on a sidecar lockfile (`<target>.lock`) created with
//! exclusive semantics. Contending processes poll at a bounded interval
//! until a deadline; lockfiles older than `stale_after` are reclaimed so a
//! crashed holder cannot wedge the kernel forever. The lock is advisory and
//! coordinates packetgov processes; it is not a security boundary.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::process;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::paths::ensure_dir_all;

/// Options controlling lock acquisition.
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Total acquisition budget before failing with `LockError::Timeout`.
    pub timeout: Duration,
    /// Poll interval while the lock is contended.
    pub poll_interval: Duration,
    /// Lockfiles older than this are treated as abandoned and reclaimed.
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            stale_after: Duration::from_secs(300),
        }
    }
}

/// Lock information stored in the sidecar lockfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that created the lock
    pub pid: u32,
    /// Seconds since UNIX epoch when the lock was created
    pub created_at: u64,
    /// Path the lock protects
    pub target: String,
}

/// Errors related to file locking operations.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("timeout waiting for lock: {lock_path} (held by PID {holder_pid})")]
    Timeout { lock_path: String, holder_pid: u32 },

    #[error("IO error during lock operation: {0}")]
    Io(#[from] io::Error),
}

/// Exclusive advisory lock over a target path. Released on drop.
pub struct FileLock {
    lock_path: Utf8PathBuf,
    released: bool,
}

impl FileLock {
    /// Acquire the lock for `target`, blocking up to `options.timeout`.
    pub fn acquire(target: &Utf8Path, options: LockOptions) -> Result<Self, LockError> {
        let lock_path = Utf8PathBuf::from(format!("{target}.lock"));
        if let Some(parent) = lock_path.parent() {
            ensure_dir_all(parent)?;
        }

        let deadline = Instant::now() + options.timeout;
        let poll = options.poll_interval.max(Duration::from_millis(10));

        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let info = LockInfo {
                        pid: process::id(),
                        created_at: unix_now(),
                        target: target.to_string(),
                    };
                    let payload = serde_json::to_string(&info)
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                    file.write_all(payload.as_bytes())?;
                    file.write_all(b"\n")?;
                    file.flush()?;
                    return Ok(Self {
                        lock_path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // Best-effort stale lock cleanup for crashed writers.
                    match lock_age_secs(&lock_path) {
                        Ok(Some(age)) if age > options.stale_after.as_secs() => {
                            let _ = fs::remove_file(&lock_path);
                            continue;
                        }
                        Ok(None) => continue, // holder released between checks
                        _ => {}
                    }

                    if Instant::now() >= deadline {
                        let holder_pid = read_lock_info(&lock_path)
                            .ok()
                            .flatten()
                            .map_or(0, |info| info.pid);
                        return Err(LockError::Timeout {
                            lock_path: lock_path.to_string(),
                            holder_pid,
                        });
                    }
                    thread::sleep(poll);
                }
                Err(e) => return Err(LockError::Io(e)),
            }
        }
    }

    /// Explicitly release the lock, surfacing IO failures.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        match fs::remove_file(&self.lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::Io(e)),
        }
    }

    /// Path of the sidecar lockfile.
    #[must_use]
    pub fn lock_path(&self) -> &Utf8Path {
        &self.lock_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

/// Read the lockfile payload, if the lock still exists and parses.
pub fn read_lock_info(lock_path: &Utf8Path) -> Result<Option<LockInfo>, LockError> {
    match fs::read_to_string(lock_path) {
        Ok(content) => Ok(serde_json::from_str(&content).ok()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LockError::Io(e)),
    }
}

fn lock_age_secs(lock_path: &Utf8Path) -> io::Result<Option<u64>> {
    match fs::metadata(lock_path) {
        Ok(meta) => {
            let modified = meta.modified()?;
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or_default();
            Ok(Some(age.as_secs()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
