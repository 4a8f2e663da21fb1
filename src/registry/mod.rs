//! The resource registry: the single persisted record of cache state.
//!
//! The registry lives in `<cache_dir>/registry.json` and holds three
//! independent maps:
//!
//! - `repos`: `name@version` → [`CachedRepoMeta`], the authoritative record
//!   of what is checked out on disk
//! - `resolved`: package name → repository URL, reused for 30 days
//! - `unresolvable`: package name → last failed lookup, skipped for 7 days
//!
//! Both memo maps expire lazily: a read that finds an expired entry deletes
//! it and reports absence. [`ResourceRegistry::prune_expired`] sweeps them
//! eagerly.
//!
//! `total_size` is a running sum of every `repos[*].size` and is kept in
//! step by [`ResourceRegistry::update_repo`] and
//! [`ResourceRegistry::remove_repo`].
//!
//! # Concurrency
//!
//! The registry is a plain value; callers own it for the length of a run
//! and serialize their mutations (the resolver applies all writes after its
//! worker pool has joined). Saving is atomic so concurrent runs sharing a
//! cache directory never see a torn file; the last writer wins.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{REGISTRY_FILE_NAME, RESOLVED_URL_TTL_DAYS, UNRESOLVABLE_TTL_DAYS};
use crate::core::GroundworkError;
use crate::utils::atomic_write;

/// What the registry knows about one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRepoMeta {
    /// Repository URL the checkout was cloned from
    pub url: String,
    /// Tag the checkout is pinned to, `None` for the default branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Package version the checkout belongs to
    pub version: String,
    /// Commit currently checked out
    #[serde(default)]
    pub commit: String,
    /// Last clone or update
    pub last_sync: DateTime<Utc>,
    /// On-disk size in bytes
    #[serde(default)]
    pub size: u64,
}

/// A memoized package → repository URL lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedUrl {
    /// Normalized repository URL
    pub url: String,
    /// When the lookup happened
    pub resolved_at: DateTime<Utc>,
}

/// Entry counts removed by [`ResourceRegistry::prune_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Expired URL memos removed
    pub resolved: usize,
    /// Expired unresolvable markers removed
    pub unresolvable: usize,
}

/// Summary used by `groundwork cache status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Number of recorded checkouts
    pub repos: usize,
    /// Number of URL memos (including not-yet-swept expired ones)
    pub resolved: usize,
    /// Number of unresolvable markers (including not-yet-swept expired ones)
    pub unresolvable: usize,
    /// Sum of all checkout sizes in bytes
    pub total_size: u64,
}

/// Persisted cache state. See the module documentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceRegistry {
    #[serde(default)]
    repos: BTreeMap<String, CachedRepoMeta>,
    #[serde(default)]
    resolved: BTreeMap<String, ResolvedUrl>,
    #[serde(default)]
    unresolvable: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    total_size: u64,
    #[serde(skip)]
    path: PathBuf,
}

impl ResourceRegistry {
    /// Load the registry from `cache_dir`, or start an empty one.
    ///
    /// A missing, empty or unparseable file yields an empty registry; a
    /// corrupted registry only costs a re-resolution, so it is logged and
    /// replaced on the next save. Failing to *read* an existing file is an
    /// error.
    pub fn load(cache_dir: &Path) -> Result<Self> {
        let path = cache_dir.join(REGISTRY_FILE_NAME);
        let empty = || Self {
            path: path.clone(),
            ..Self::default()
        };

        if !path.exists() {
            tracing::debug!(target: "registry", "No registry at {}, starting empty", path.display());
            return Ok(empty());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read registry: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(empty());
        }

        let mut registry: Self = match serde_json::from_str(&content) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!(
                    target: "registry",
                    "Registry {} is corrupted ({}); treating it as empty",
                    path.display(),
                    e
                );
                return Ok(empty());
            }
        };
        registry.path = path;

        let actual: u64 = registry.repos.values().map(|meta| meta.size).sum();
        if actual != registry.total_size {
            tracing::debug!(
                target: "registry",
                "Recorded total size {} disagrees with entries ({}); using entries",
                registry.total_size,
                actual
            );
            registry.total_size = actual;
        }

        Ok(registry)
    }

    /// Atomically write the registry back to its file.
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_vec_pretty(self)?;
        atomic_write(&self.path, &content)
            .map_err(|e| GroundworkError::RegistryWriteFailed {
                path: self.path.display().to_string(),
                reason: format!("{e:#}"),
            })
            .with_context(|| {
                format!(
                    "Cannot write registry: {}\n\n\
                    Possible causes:\n\
                    - Permission denied on the cache directory\n\
                    - Disk is full or read-only",
                    self.path.display()
                )
            })?;
        tracing::debug!(target: "registry", "Saved registry to {}", self.path.display());
        Ok(())
    }

    /// Location of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ---- resolved URL memo -------------------------------------------------

    /// Memoized repository URL for `name`, if younger than 30 days.
    pub fn get_resolved_url(&mut self, name: &str) -> Option<String> {
        self.get_resolved_url_at(name, Utc::now())
    }

    /// [`Self::get_resolved_url`] against an explicit clock.
    pub fn get_resolved_url_at(&mut self, name: &str, now: DateTime<Utc>) -> Option<String> {
        let entry = self.resolved.get(name)?;
        if is_expired(entry.resolved_at, now, RESOLVED_URL_TTL_DAYS) {
            tracing::trace!(target: "registry", "URL memo for '{}' expired", name);
            self.resolved.remove(name);
            return None;
        }
        Some(entry.url.clone())
    }

    /// Remember `url` for `name`. Clears any unresolvable marker.
    pub fn set_resolved_url(&mut self, name: &str, url: &str) {
        self.set_resolved_url_at(name, url, Utc::now());
    }

    /// [`Self::set_resolved_url`] against an explicit clock.
    pub fn set_resolved_url_at(&mut self, name: &str, url: &str, now: DateTime<Utc>) {
        self.unresolvable.remove(name);
        self.resolved.insert(
            name.to_string(),
            ResolvedUrl {
                url: url.to_string(),
                resolved_at: now,
            },
        );
    }

    // ---- unresolvable memo -------------------------------------------------

    /// Whether `name` failed to resolve within the last 7 days.
    pub fn is_unresolvable(&mut self, name: &str) -> bool {
        self.is_unresolvable_at(name, Utc::now())
    }

    /// [`Self::is_unresolvable`] against an explicit clock.
    pub fn is_unresolvable_at(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        let Some(checked) = self.unresolvable.get(name) else {
            return false;
        };
        if is_expired(*checked, now, UNRESOLVABLE_TTL_DAYS) {
            tracing::trace!(target: "registry", "Unresolvable marker for '{}' expired", name);
            self.unresolvable.remove(name);
            return false;
        }
        true
    }

    /// Record that `name` could not be resolved.
    pub fn mark_unresolvable(&mut self, name: &str) {
        self.mark_unresolvable_at(name, Utc::now());
    }

    /// [`Self::mark_unresolvable`] against an explicit clock.
    pub fn mark_unresolvable_at(&mut self, name: &str, now: DateTime<Utc>) {
        self.unresolvable.insert(name.to_string(), now);
    }

    // ---- checkouts ---------------------------------------------------------

    /// Metadata for the checkout of `key` (`name@version`).
    pub fn get_repo(&self, key: &str) -> Option<&CachedRepoMeta> {
        self.repos.get(key)
    }

    /// All recorded checkouts, ordered by key.
    pub fn repos(&self) -> impl Iterator<Item = (&String, &CachedRepoMeta)> {
        self.repos.iter()
    }

    /// Insert or replace the checkout record for `key`.
    ///
    /// The superseded entry's size is subtracted before the new size is
    /// added, keeping [`Self::total_size`] equal to the sum of all entries.
    pub fn update_repo(&mut self, key: &str, meta: CachedRepoMeta) {
        let new_size = meta.size;
        if let Some(old) = self.repos.insert(key.to_string(), meta) {
            self.total_size = self.total_size.saturating_sub(old.size);
        }
        self.total_size += new_size;
    }

    /// Drop the checkout record for `key`, returning it.
    pub fn remove_repo(&mut self, key: &str) -> Option<CachedRepoMeta> {
        let old = self.repos.remove(key)?;
        self.total_size = self.total_size.saturating_sub(old.size);
        Some(old)
    }

    /// Sum of all recorded checkout sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    // ---- maintenance -------------------------------------------------------

    /// Remove every expired memo entry now instead of on next read.
    pub fn prune_expired(&mut self) -> PruneStats {
        self.prune_expired_at(Utc::now())
    }

    /// [`Self::prune_expired`] against an explicit clock.
    pub fn prune_expired_at(&mut self, now: DateTime<Utc>) -> PruneStats {
        let resolved_before = self.resolved.len();
        self.resolved
            .retain(|_, entry| !is_expired(entry.resolved_at, now, RESOLVED_URL_TTL_DAYS));
        let unresolvable_before = self.unresolvable.len();
        self.unresolvable.retain(|_, checked| !is_expired(*checked, now, UNRESOLVABLE_TTL_DAYS));

        PruneStats {
            resolved: resolved_before - self.resolved.len(),
            unresolvable: unresolvable_before - self.unresolvable.len(),
        }
    }

    /// Entry counts and total size.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            repos: self.repos.len(),
            resolved: self.resolved.len(),
            unresolvable: self.unresolvable.len(),
            total_size: self.total_size,
        }
    }
}

fn is_expired(stamp: DateTime<Utc>, now: DateTime<Utc>, ttl_days: i64) -> bool {
    now.signed_duration_since(stamp) >= Duration::days(ttl_days)
}
