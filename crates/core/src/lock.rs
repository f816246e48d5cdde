//! Store-level writer lock
//!
//! One advisory lock file per store root serializes mutating operations;
//! readers take the same lock shared. The kernel drops the `flock` when the
//! holder exits, so a crashed writer never leaves the store locked.
//!
//! The lock file is never unlinked. Removing it on release would let a
//! waiter lock the old inode while a newcomer locks a fresh one.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Name of the lock file inside the store root
pub const LOCK_FILE: &str = ".lock";

/// Held store lock, released on drop
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    mode: LockMode,
    file: File,
}

/// Whether the lock excludes everyone or only writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Lock file content
#[derive(Debug, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub acquired_at_ms: u64,
}

impl StoreLock {
    /// Acquire the exclusive lock for the store at `root` (non-blocking)
    ///
    /// Returns `StoreLocked` if another process holds it.
    pub fn acquire(root: &Path) -> Result<Self> {
        Self::acquire_mode(root, LockMode::Exclusive)
    }

    /// Acquire a shared (reader) lock for the store at `root` (non-blocking)
    ///
    /// Any number of readers may hold it together; it conflicts only with
    /// an exclusive writer.
    pub fn acquire_shared(root: &Path) -> Result<Self> {
        Self::acquire_mode(root, LockMode::Shared)
    }

    fn acquire_mode(root: &Path, mode: LockMode) -> Result<Self> {
        let lock_path = root.join(LOCK_FILE);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::io(&lock_path, e))?;

        if !try_flock(&file, mode).map_err(|e| Error::io(&lock_path, e))? {
            if let Ok(holder) = read_holder(&mut file) {
                tracing::warn!(pid = holder.pid, "store lock held by another process");
            }
            return Err(Error::StoreLocked {
                root: root.to_path_buf(),
            });
        }

        if mode == LockMode::Exclusive {
            write_holder(&mut file).map_err(|e| Error::io(&lock_path, e))?;
        }
        tracing::debug!(path = %lock_path.display(), ?mode, "acquired store lock");

        Ok(Self {
            path: lock_path,
            mode,
            file,
        })
    }

    /// Mode this lock was taken in
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read who holds the lock at `root`, if anyone wrote a holder record
    pub fn holder(root: &Path) -> Option<LockHolder> {
        let mut file = File::open(root.join(LOCK_FILE)).ok()?;
        read_holder(&mut file).ok()
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if self.mode == LockMode::Exclusive {
            let _ = self.file.set_len(0);
        }
    }
}

fn write_holder(file: &mut File) -> std::io::Result<()> {
    let holder = LockHolder {
        pid: std::process::id(),
        acquired_at_ms: current_timestamp_ms(),
    };
    let serialized = serde_json::to_string(&holder)?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()
}

fn read_holder(file: &mut File) -> std::io::Result<LockHolder> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Try to acquire the file lock (non-blocking)
#[cfg(unix)]
fn try_flock(file: &File, mode: LockMode) -> std::io::Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    let arg = match mode {
        LockMode::Shared => FlockArg::LockSharedNonblock,
        LockMode::Exclusive => FlockArg::LockExclusiveNonblock,
    };
    match flock(file.as_raw_fd(), arg) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(std::io::Error::from(e)),
    }
}

#[cfg(not(unix))]
fn try_flock(_file: &File, _mode: LockMode) -> std::io::Result<bool> {
    Ok(true)
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    #[cfg(unix)]
    fn test_lock_is_exclusive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let lock1 = StoreLock::acquire(root);
        assert!(lock1.is_ok());

        // flock is per open file description, so a second open in the same
        // process still conflicts
        let lock2 = StoreLock::acquire(root);
        assert!(matches!(lock2, Err(Error::StoreLocked { .. })));

        drop(lock1);

        let lock3 = StoreLock::acquire(root);
        assert!(lock3.is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn test_shared_locks_coexist() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let reader1 = StoreLock::acquire_shared(root).unwrap();
        let reader2 = StoreLock::acquire_shared(root).unwrap();
        assert_eq!(reader1.mode(), LockMode::Shared);

        // Writers wait for every reader
        assert!(matches!(
            StoreLock::acquire(root),
            Err(Error::StoreLocked { .. })
        ));

        drop(reader1);
        drop(reader2);
        assert!(StoreLock::acquire(root).is_ok());
    }

    #[test]
    fn test_lock_file_kept_but_cleared_on_drop() {
        let temp_dir = TempDir::new().unwrap();

        let lock = StoreLock::acquire(temp_dir.path()).unwrap();
        let lock_path = lock.path().to_path_buf();
        assert!(StoreLock::holder(temp_dir.path()).is_some());

        drop(lock);
        assert!(lock_path.exists());
        assert!(StoreLock::holder(temp_dir.path()).is_none());
    }

    #[test]
    fn test_lock_records_holder() {
        let temp_dir = TempDir::new().unwrap();

        let _lock = StoreLock::acquire(temp_dir.path()).unwrap();
        let holder = StoreLock::holder(temp_dir.path()).unwrap();

        assert_eq!(holder.pid, std::process::id());
        assert!(holder.acquired_at_ms > 0);
    }
}
