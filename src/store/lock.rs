//! Advisory File Locks
//!
//! RAII guards over `fs2` advisory locks on the store's sidecar lock file.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::Result;

/// Kind of advisory lock to take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers at once; excludes writers
    Shared,
    /// A single writer; excludes everyone else
    Exclusive,
}

/// A held advisory lock, released on drop
///
/// Each guard opens its own handle on the lock file. flock-style locks belong
/// to the open file description, so two guards in the same process contend
/// exactly like guards in different processes.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl FileLock {
    /// Block until the lock is granted
    pub fn acquire(path: &Path, mode: LockMode) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        match mode {
            LockMode::Shared => FileExt::lock_shared(&file)?,
            LockMode::Exclusive => FileExt::lock_exclusive(&file)?,
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode,
        })
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
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release lock on {}: {}", self.path.display(), e);
        }
    }
}
