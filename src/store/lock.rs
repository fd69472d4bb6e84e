use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MigrateError, Result};

/// Exclusive advisory lock held for the length of a migration batch.
/// Dropping the guard also releases it.
#[derive(Debug)]
pub struct MigrationLock {
    file: File,
    path: PathBuf,
}

impl MigrationLock {
    /// Take the lock at `path`; a second holder gets `Locked` immediately.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(MigrateError::Locked(path.display().to_string()));
        }
        debug!(path = %path.display(), "migration lock acquired");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(self) -> Result<()> {
        FileExt::unlock(&self.file)?;
        debug!(path = %self.path.display(), "migration lock released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_holder_is_refused_until_release() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("migrate.lock");

        let lock = MigrationLock::acquire(&lock_path).unwrap();
        assert_eq!(lock.path(), lock_path);
        let err = MigrationLock::acquire(&lock_path).unwrap_err();
        assert!(matches!(err, MigrateError::Locked(ref held) if held.contains("migrate.lock")));

        lock.release().unwrap();
        MigrationLock::acquire(&lock_path).unwrap().release().unwrap();
    }
}
