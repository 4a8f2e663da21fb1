//! Per-checkout advisory locks.
//!
//! Two groundwork runs that share a cache directory may both decide to
//! clone `react@18.3.1` at the same moment. Each clone or update therefore
//! runs while holding an exclusive OS file lock on
//! `<cache_dir>/.locks/<key>.lock`; the second run blocks until the first
//! has finished and then sees a complete checkout.
//!
//! Locks are released when the [`CacheLock`] is dropped. Lock files are
//! left in place (removing them would race with a waiting process).

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::utils::safe_dir_name;

/// An exclusive lock on one checkout key, held until dropped.
pub struct CacheLock {
    _file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Block until the exclusive lock for `key` is held.
    ///
    /// The key may contain characters that are not valid in file names
    /// (`@scope/pkg@1.0.0`); it is sanitized the same way checkout
    /// directories are.
    pub async fn acquire(cache_dir: &Path, key: &str) -> Result<Self> {
        let locks_dir = cache_dir.join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                anyhow::anyhow!(
                    "Permission denied: cannot create locks directory at {}",
                    locks_dir.display()
                )
            } else {
                anyhow::anyhow!("Failed to create directory {}: {}", locks_dir.display(), e)
            }
        })?;

        let lock_path = locks_dir.join(format!("{}.lock", safe_dir_name(key)));
        let lock_path_clone = lock_path.clone();
        let key = key.to_string();

        // Blocking lock on a blocking thread, not the runtime
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&lock_path_clone)
                .with_context(|| {
                    format!("Failed to open lock file: {}", lock_path_clone.display())
                })?;

            file.lock_exclusive().with_context(|| format!("Failed to acquire lock for: {key}"))?;
            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        tracing::trace!(target: "cache", "Acquired lock {}", lock_path.display());
        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self._file) {
            tracing::warn!(target: "cache", "Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
