//! Single-writer lock for batch runs.
//!
//! Two batch runs over the same working tree would race on the hash store,
//! the manifest and git. A batch run holds an exclusive advisory lock on
//! `.iconsync.lock` for its whole duration; a second run blocks until the
//! first releases it.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOCK_FILENAME: &str = ".iconsync.lock";

#[derive(Error, Debug)]
#[error("cannot lock {path}: {source}")]
pub struct LockError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Held for the duration of a batch run; released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Block until the lock in `dir` is ours.
    pub fn acquire(dir: &Path) -> Result<Self, LockError> {
        let path = dir.join(LOCK_FILENAME);
        let err = |source| LockError {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(err)?;

        if file.try_lock_exclusive().is_err() {
            tracing::info!(path = %path.display(), "waiting for another run to finish");
            file.lock_exclusive().map_err(err)?;
        }
        tracing::debug!(path = %path.display(), "lock acquired");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
