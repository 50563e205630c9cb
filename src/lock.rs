//! # Singleton guard.
//!
//! [`SingletonLock`] makes sure only one supervisor runs per machine. The
//! marker is a plain file created with `create_new` (atomic create-if-absent)
//! that holds the owner's PID.
//!
//! ```text
//! acquire(path)
//!   ├─ create_new ok          ─► write PID, Ok(lock)
//!   └─ AlreadyExists
//!        ├─ PID alive / unreadable ─► Err(AlreadyRunning)   (marker untouched)
//!        └─ PID dead               ─► remove stale marker, create_new once more
//!
//! drop(lock) / lock.release() ─► remove marker
//! ```
//!
//! Dropping the lock runs on normal return and on the signal-driven shutdown
//! path, since the supervisor returns from `run` after SIGINT/SIGTERM.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::error::LockError;

/// Default marker location.
pub const DEFAULT_LOCK_PATH: &str = "/tmp/sysmonitor.lock";

/// Exclusive ownership of the marker file; removes it on drop.
#[derive(Debug)]
pub struct SingletonLock {
    path: PathBuf,
    released: bool,
}

impl SingletonLock {
    /// Creates the marker at `path` or fails with [`LockError::AlreadyRunning`].
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        match Self::create(&path) {
            Err(LockError::AlreadyRunning { pid: Some(pid), .. }) if !process_alive(pid) => {
                warn!(path = %path.display(), pid, "removing stale lock file");
                remove_marker(&path)?;
                Self::create(&path)
            }
            other => other,
        }
    }

    /// Marker path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the marker now, reporting I/O errors.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        remove_marker(&self.path)
    }

    fn create(path: &Path) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LockError::AlreadyRunning {
                    path: path.to_path_buf(),
                    pid: read_owner(path),
                });
            }
            Err(e) => return Err(io_err(e)),
        };

        // Own the marker before writing so a failed write still cleans up.
        let lock = Self {
            path: path.to_path_buf(),
            released: false,
        };
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;
        info!(path = %path.display(), "lock file created");
        Ok(lock)
    }
}

impl Drop for SingletonLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match remove_marker(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "lock file removed"),
            Err(e) => warn!(error = %e, "failed to remove lock file"),
        }
    }
}

fn remove_marker(path: &Path) -> Result<(), LockError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_owner(path: &Path) -> Option<i32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// `kill(pid, 0)`: `EPERM` still means the process exists.
fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_and_keeps_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sysmonitor.lock");

        let first = SingletonLock::acquire(&path).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let err = SingletonLock::acquire(&path).unwrap_err();
        match err {
            LockError::AlreadyRunning { pid, .. } => {
                assert_eq!(pid, Some(std::process::id() as i32));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        drop(first);
        assert!(!path.exists());
    }

    #[test]
    fn release_removes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sysmonitor.lock");

        let lock = SingletonLock::acquire(&path).unwrap();
        assert_eq!(lock.path(), path.as_path());
        lock.release().unwrap();
        assert!(!path.exists());

        let again = SingletonLock::acquire(&path).unwrap();
        drop(again);
    }

    #[test]
    fn marker_without_pid_is_treated_as_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sysmonitor.lock");
        fs::write(&path, "").unwrap();

        let err = SingletonLock::acquire(&path).unwrap_err();
        assert!(matches!(err, LockError::AlreadyRunning { pid: None, .. }));
        assert!(path.exists());
    }

    #[test]
    fn stale_marker_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sysmonitor.lock");
        // Above the kernel's pid_max ceiling, so no process can own it.
        fs::write(&path, "4194305\n").unwrap();

        let lock = SingletonLock::acquire(&path).unwrap();
        let owner = fs::read_to_string(&path).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
        drop(lock);
    }

    #[test]
    fn releasing_a_missing_marker_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sysmonitor.lock");
        let lock = SingletonLock::acquire(&path).unwrap();
        fs::remove_file(&path).unwrap();
        lock.release().unwrap();
    }
}
