//! Segment Locker
//!
//! Exclusive, non-blocking advisory locks on segment file handles so at most
//! one writer appends to a given log file. The lock lives as long as the
//! handle; `Segment` releases it on close and on drop.

use std::fs::File;
use std::io;
use std::path::Path;

use fs2::FileExt;

use crate::error::{LogError, Result};

/// Acquires and releases advisory locks on open file handles
pub struct Locker;

impl Locker {
    /// Take an exclusive lock on `file` without waiting
    ///
    /// Fails with `LockHeld` if another handle already owns the lock.
    pub fn acquire(file: &File, path: &Path) -> Result<()> {
        match file.try_lock_exclusive() {
            Ok(()) => Ok(()),
            Err(e) if is_contended(&e) => {
                tracing::warn!(segment = %path.display(), "segment lock is held by another writer");
                Err(LogError::LockHeld {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => Err(LogError::Io(e)),
        }
    }

    /// Release the lock on `file`
    ///
    /// Releasing a handle that holds no lock is not an error.
    pub fn release(file: &File) -> Result<()> {
        file.unlock()?;
        Ok(())
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || (err.raw_os_error().is_some()
            && err.raw_os_error() == fs2::lock_contended_error().raw_os_error())
}
