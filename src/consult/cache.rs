//! Content-addressed guidance cache.
//!
//! One file per key under `<cache_dir>/consultations/`, named by the key and
//! holding the raw guidance text. The key hashes the story id, framework
//! name, checked-out commit and the story's descriptive text, so any change
//! to those inputs simply misses; stale files are never consulted again.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::constants::CONSULTATIONS_DIR_NAME;
use crate::models::UnitOfWork;
use crate::utils::{atomic_write, remove_dir_all};

/// Guidance files keyed by consultation identity.
#[derive(Debug, Clone)]
pub struct GuidanceCache {
    dir: PathBuf,
}

impl GuidanceCache {
    /// Cache rooted at `<cache_dir>/consultations`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join(CONSULTATIONS_DIR_NAME),
        }
    }

    /// Key for consulting `framework` at `commit` about `story`.
    pub fn key(story: &UnitOfWork, framework: &str, commit: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [story.id.as_str(), framework, commit, &story.descriptive_text()] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Cached guidance for `key`, if present and readable.
    pub fn get(&self, key: &str) -> Option<String> {
        let path = self.dir.join(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(target: "consult", "Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store `guidance` under `key`.
    pub fn put(&self, key: &str, guidance: &str) -> Result<()> {
        let path = self.dir.join(key);
        atomic_write(&path, guidance.as_bytes())
            .with_context(|| format!("Failed to cache guidance at {}", path.display()))
    }

    /// Number of cached guidance files.
    pub fn len(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .filter(|e| e.path().is_file())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Whether the cache holds no guidance.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached guidance file.
    pub fn clear(&self) -> Result<()> {
        remove_dir_all(&self.dir)
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
