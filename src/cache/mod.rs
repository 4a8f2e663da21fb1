//! Framework source cache: one local checkout per `name@version`.
//!
//! The [`ResourceManager`] turns resolved dependencies into checkouts on
//! disk and keeps the [`ResourceRegistry`] in step with what is actually
//! there.
//!
//! # Cache Directory Structure
//!
//! ```text
//! ~/.groundwork/cache/
//! ├── registry.json              # ResourceRegistry
//! ├── repos/
//! │   ├── react@18.3.1/          # checkout pinned to tag v18.3.1
//! │   └── @prisma__client@5.10.0/
//! ├── consultations/             # guidance cache (see crate::consult)
//! └── .locks/
//!     └── react@18.3.1.lock      # held while cloning or updating
//! ```
//!
//! # Sync decisions
//!
//! For each dependency, exactly one of:
//!
//! - **skip**: a checkout pinned to a tag already exists. Tagged content is
//!   immutable and is never re-synced.
//! - **update**: a default-branch checkout exists and the remote has moved.
//! - **create**: no checkout yet. When resolution found no tag, a late tag
//!   lookup runs against the remote before falling back to the default
//!   branch.
//!
//! Every created or updated checkout has its commit and size recorded in
//! the registry. Failures are per dependency: they are logged and reported
//! in the [`SyncReport`], never propagated.

pub mod lock;
pub mod sync;

pub use lock::CacheLock;
pub use sync::{GitSync, RepoSync};

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::constants::REPOS_DIR_NAME;
use crate::lockfile::split_name_version;
use crate::models::{CachedResource, Resource, ResolvedDependency};
use crate::registry::{CachedRepoMeta, ResourceRegistry};
use crate::utils::{dir_size, remove_dir_all, safe_dir_name};

/// What happened to one dependency during [`ResourceManager::sync_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Tag-pinned checkout already present, or default branch up to date
    Skipped,
    /// Default-branch checkout moved to the remote tip
    Updated,
    /// New checkout created
    Created,
    /// Sync failed; the message says why
    Failed(String),
}

/// Per-dependency sync result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// `name@version`
    pub key: String,
    /// What happened
    pub outcome: SyncOutcome,
}

/// Owns the checkout directory tree and the set of detected resources.
pub struct ResourceManager {
    cache_dir: PathBuf,
    repos_dir: PathBuf,
    sync: Arc<dyn RepoSync>,
    detected: BTreeMap<String, Resource>,
}

impl ResourceManager {
    /// Manager over `cache_dir` using `sync` for repository operations.
    pub fn new(cache_dir: impl Into<PathBuf>, sync: Arc<dyn RepoSync>) -> Self {
        let cache_dir = cache_dir.into();
        let repos_dir = cache_dir.join(REPOS_DIR_NAME);
        Self {
            cache_dir,
            repos_dir,
            sync,
            detected: BTreeMap::new(),
        }
    }

    /// Manager backed by the system `git`.
    pub fn with_git(cache_dir: impl Into<PathBuf>) -> Self {
        Self::new(cache_dir, Arc::new(GitSync))
    }

    /// Checkout directory for `key`.
    pub fn checkout_path(&self, key: &str) -> PathBuf {
        self.repos_dir.join(safe_dir_name(key))
    }

    /// Record dependencies as detected resources without syncing them.
    pub fn detect(&mut self, deps: &[ResolvedDependency]) {
        for dep in deps {
            let key = dep.key();
            let resource = Resource {
                name: dep.name.clone(),
                version: dep.version.clone(),
                url: dep.repo_url.clone(),
                ref_name: dep.tag.clone(),
                path: self.checkout_path(&key),
            };
            self.detected.insert(key, resource);
        }
    }

    /// Record every checkout the registry knows about as a detected resource.
    ///
    /// Used when consulting without re-resolving the project.
    pub fn detect_from_registry(&mut self, registry: &ResourceRegistry) {
        for (key, meta) in registry.repos() {
            let name = split_name_version(key)
                .map(|(name, _)| name)
                .unwrap_or_else(|| key.clone());
            let resource = Resource {
                name,
                version: meta.version.clone(),
                url: meta.url.clone(),
                ref_name: meta.tag.clone(),
                path: self.checkout_path(key),
            };
            self.detected.insert(key.clone(), resource);
        }
    }

    /// Create, update or skip a checkout for every dependency.
    ///
    /// Dependencies are processed one at a time, each under its
    /// [`CacheLock`]. Registry writes happen here; the caller saves.
    pub async fn sync_all(
        &mut self,
        deps: &[ResolvedDependency],
        registry: &mut ResourceRegistry,
    ) -> Vec<SyncReport> {
        self.detect(deps);

        let mut reports = Vec::with_capacity(deps.len());
        for dep in deps {
            let key = dep.key();
            let outcome = match self.sync_one(dep, registry).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(target: "cache", "Failed to sync {}: {:#}", key, e);
                    SyncOutcome::Failed(format!("{e:#}"))
                }
            };
            tracing::debug!(target: "cache", "{} -> {:?}", key, outcome);
            reports.push(SyncReport {
                key,
                outcome,
            });
        }
        reports
    }

    async fn sync_one(
        &self,
        dep: &ResolvedDependency,
        registry: &mut ResourceRegistry,
    ) -> Result<SyncOutcome> {
        let key = dep.key();
        let path = self.checkout_path(&key);
        let _lock = CacheLock::acquire(&self.cache_dir, &key).await?;

        let existing = registry.get_repo(&key).cloned();

        if path.is_dir() {
            let tag = existing.as_ref().map_or(dep.tag.clone(), |meta| meta.tag.clone());

            if tag.is_some() {
                if existing.is_none() {
                    // Checkout from an earlier run whose registry was lost
                    let commit = self.sync.current_commit(&path).await.unwrap_or_default();
                    self.record(registry, dep, tag, commit, &path)?;
                }
                return Ok(SyncOutcome::Skipped);
            }

            let stale = match self.sync.is_stale(&path).await {
                Ok(stale) => stale,
                Err(e) => {
                    tracing::debug!(target: "cache", "Staleness check for {} failed: {:#}", key, e);
                    false
                }
            };
            if !stale {
                if existing.is_none() {
                    let commit = self.sync.current_commit(&path).await.unwrap_or_default();
                    self.record(registry, dep, None, commit, &path)?;
                }
                return Ok(SyncOutcome::Skipped);
            }

            tracing::info!(target: "cache", "Updating {} from {}", key, dep.repo_url);
            let commit = self.sync.update(&path).await?;
            self.record(registry, dep, None, commit, &path)?;
            return Ok(SyncOutcome::Updated);
        }

        let tag = match &dep.tag {
            Some(tag) => Some(tag.clone()),
            None => match self.sync.find_tag(&dep.repo_url, &dep.name, &dep.version).await {
                Ok(tag) => tag,
                Err(e) => {
                    tracing::debug!(target: "cache", "Tag lookup for {} failed: {:#}", key, e);
                    None
                }
            },
        };

        tracing::info!(
            target: "cache",
            "Cloning {} from {} at {}",
            key,
            dep.repo_url,
            tag.as_deref().unwrap_or("default branch")
        );
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let commit = match self.sync.clone_repo(&dep.repo_url, tag.as_deref(), &path).await {
            Ok(commit) => commit,
            Err(e) => {
                // A failed clone can leave a partial directory behind
                remove_dir_all(&path)?;
                return Err(e);
            }
        };
        self.record(registry, dep, tag, commit, &path)?;
        Ok(SyncOutcome::Created)
    }

    fn record(
        &self,
        registry: &mut ResourceRegistry,
        dep: &ResolvedDependency,
        tag: Option<String>,
        commit: String,
        path: &Path,
    ) -> Result<()> {
        let size = dir_size(path)?;
        registry.update_repo(
            &dep.key(),
            CachedRepoMeta {
                url: dep.repo_url.clone(),
                tag,
                version: dep.version.clone(),
                commit,
                last_sync: Utc::now(),
                size,
            },
        );
        Ok(())
    }

    /// Detected resources whose checkout is present on disk right now,
    /// sorted by name (then version).
    ///
    /// Recomputed on every call; a detected resource that has not been
    /// synced yet never appears.
    pub fn get_cached_resources(&self, registry: &ResourceRegistry) -> Vec<CachedResource> {
        let mut cached: Vec<CachedResource> = self
            .detected
            .iter()
            .filter(|(_, resource)| resource.path.is_dir())
            .map(|(key, resource)| {
                let meta = registry.get_repo(key);
                CachedResource {
                    name: resource.name.clone(),
                    version: resource.version.clone(),
                    path: resource.path.clone(),
                    url: resource.url.clone(),
                    ref_name: meta.map_or(resource.ref_name.clone(), |m| m.tag.clone()),
                    commit: meta.map(|m| m.commit.clone()).unwrap_or_default(),
                }
            })
            .collect();
        cached.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        cached
    }

    /// Delete the checkout for `key` and its registry entry.
    ///
    /// Returns whether anything was removed.
    pub async fn remove(&mut self, key: &str, registry: &mut ResourceRegistry) -> Result<bool> {
        let path = self.checkout_path(key);
        let _lock = CacheLock::acquire(&self.cache_dir, key).await?;

        let existed = path.exists();
        remove_dir_all(&path)?;
        let recorded = registry.remove_repo(key).is_some();
        self.detected.remove(key);

        if existed || recorded {
            tracing::info!(target: "cache", "Removed {}", key);
        }
        Ok(existed || recorded)
    }

    /// Remove checkout directories that have no registry entry.
    ///
    /// Returns the removed paths.
    pub fn clean_orphans(&self, registry: &ResourceRegistry) -> Result<Vec<PathBuf>> {
        if !self.repos_dir.exists() {
            return Ok(Vec::new());
        }

        let known: HashSet<String> = registry.repos().map(|(key, _)| safe_dir_name(key)).collect();
        let mut removed = Vec::new();

        for entry in fs::read_dir(&self.repos_dir)
            .with_context(|| format!("Failed to read {}", self.repos_dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if known.contains(&name) {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            tracing::debug!(target: "cache", "Removed orphan {}", path.display());
            removed.push(path);
        }

        removed.sort();
        Ok(removed)
    }

    /// Root of the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records calls and materializes checkouts as plain directories.
    #[derive(Default)]
    struct FakeSync {
        calls: Mutex<Vec<String>>,
        tags: Vec<(String, String)>,
        stale: bool,
        fail_clone: bool,
    }

    impl FakeSync {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RepoSync for FakeSync {
        async fn find_tag(&self, _url: &str, name: &str, _version: &str) -> Result<Option<String>> {
            self.calls.lock().unwrap().push(format!("find_tag {name}"));
            Ok(self.tags.iter().find(|(n, _)| n == name).map(|(_, t)| t.clone()))
        }

        async fn clone_repo(&self, _url: &str, tag: Option<&str>, dest: &Path) -> Result<String> {
            self.calls.lock().unwrap().push(format!("clone {}", tag.unwrap_or("HEAD")));
            fs::create_dir_all(dest)?;
            if self.fail_clone {
                anyhow::bail!("remote hung up");
            }
            fs::write(dest.join("README.md"), "0123456789")?;
            Ok("c0ffee".to_string())
        }

        async fn is_stale(&self, _path: &Path) -> Result<bool> {
            self.calls.lock().unwrap().push("is_stale".to_string());
            Ok(self.stale)
        }

        async fn update(&self, _path: &Path) -> Result<String> {
            self.calls.lock().unwrap().push("update".to_string());
            Ok("beef".to_string())
        }

        async fn current_commit(&self, _path: &Path) -> Result<String> {
            Ok("c0ffee".to_string())
        }
    }

    fn dep(name: &str, version: &str, tag: Option<&str>) -> ResolvedDependency {
        ResolvedDependency {
            name: name.to_string(),
            version: version.to_string(),
            repo_url: format!("https://github.com/example/{name}"),
            tag: tag.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_records_commit_and_size() {
        let temp = TempDir::new().unwrap();
        let sync = Arc::new(FakeSync::default());
        let mut manager = ResourceManager::new(temp.path(), sync.clone());
        let mut registry = ResourceRegistry::default();

        let reports = manager.sync_all(&[dep("react", "18.3.1", Some("v18.3.1"))], &mut registry).await;
        assert_eq!(reports[0].outcome, SyncOutcome::Created);
        assert_eq!(sync.calls(), vec!["clone v18.3.1"]);

        let meta = registry.get_repo("react@18.3.1").unwrap();
        assert_eq!(meta.commit, "c0ffee");
        assert_eq!(meta.tag.as_deref(), Some("v18.3.1"));
        assert_eq!(meta.size, 10);
        assert_eq!(registry.total_size(), 10);
    }

    #[tokio::test]
    async fn test_tagged_checkout_is_never_resynced() {
        let temp = TempDir::new().unwrap();
        let sync = Arc::new(FakeSync {
            stale: true,
            ..FakeSync::default()
        });
        let mut manager = ResourceManager::new(temp.path(), sync.clone());
        let mut registry = ResourceRegistry::default();
        let deps = [dep("react", "18.3.1", Some("v18.3.1"))];

        manager.sync_all(&deps, &mut registry).await;
        let reports = manager.sync_all(&deps, &mut registry).await;
        assert_eq!(reports[0].outcome, SyncOutcome::Skipped);
        assert_eq!(sync.calls(), vec!["clone v18.3.1"]);
    }

    #[tokio::test]
    async fn test_late_tag_lookup_then_default_branch() {
        let temp = TempDir::new().unwrap();
        let sync = Arc::new(FakeSync {
            tags: vec![("next".to_string(), "v14.1.0".to_string())],
            ..FakeSync::default()
        });
        let mut manager = ResourceManager::new(temp.path(), sync.clone());
        let mut registry = ResourceRegistry::default();

        manager
            .sync_all(&[dep("next", "14.1.0", None), dep("prisma", "5.10.0", None)], &mut registry)
            .await;
        assert_eq!(
            sync.calls(),
            vec!["find_tag next", "clone v14.1.0", "find_tag prisma", "clone HEAD"]
        );
        assert_eq!(registry.get_repo("next@14.1.0").unwrap().tag.as_deref(), Some("v14.1.0"));
        assert_eq!(registry.get_repo("prisma@5.10.0").unwrap().tag, None);
    }

    #[tokio::test]
    async fn test_stale_default_branch_is_updated() {
        let temp = TempDir::new().unwrap();
        let sync = Arc::new(FakeSync {
            stale: true,
            ..FakeSync::default()
        });
        let mut manager = ResourceManager::new(temp.path(), sync.clone());
        let mut registry = ResourceRegistry::default();
        let deps = [dep("prisma", "5.10.0", None)];

        manager.sync_all(&deps, &mut registry).await;
        let reports = manager.sync_all(&deps, &mut registry).await;
        assert_eq!(reports[0].outcome, SyncOutcome::Updated);
        assert_eq!(registry.get_repo("prisma@5.10.0").unwrap().commit, "beef");
        assert_eq!(registry.total_size(), 10);
    }

    #[tokio::test]
    async fn test_failed_clone_is_contained() {
        let temp = TempDir::new().unwrap();
        let sync = Arc::new(FakeSync {
            fail_clone: true,
            ..FakeSync::default()
        });
        let mut manager = ResourceManager::new(temp.path(), sync);
        let mut registry = ResourceRegistry::default();

        let reports = manager.sync_all(&[dep("ghost", "1.0.0", Some("v1.0.0"))], &mut registry).await;
        assert!(matches!(reports[0].outcome, SyncOutcome::Failed(_)));
        assert!(!manager.checkout_path("ghost@1.0.0").exists());
        assert!(registry.get_repo("ghost@1.0.0").is_none());
        assert!(manager.get_cached_resources(&registry).is_empty());
    }

    #[tokio::test]
    async fn test_cached_resources_only_on_disk_and_sorted() {
        let temp = TempDir::new().unwrap();
        let mut manager = ResourceManager::new(temp.path(), Arc::new(FakeSync::default()));
        let mut registry = ResourceRegistry::default();

        manager
            .sync_all(&[dep("react", "18.3.1", Some("v18.3.1")), dep("next", "14.1.0", Some("v14.1.0"))], &mut registry)
            .await;
        manager.detect(&[dep("prisma", "5.10.0", None)]);

        let cached = manager.get_cached_resources(&registry);
        let names: Vec<&str> = cached.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["next", "react"]);
        assert_eq!(cached[1].commit, "c0ffee");
        assert!(cached[1].path.ends_with("repos/react@18.3.1"));
    }

    #[tokio::test]
    async fn test_remove_and_clean_orphans() {
        let temp = TempDir::new().unwrap();
        let mut manager = ResourceManager::new(temp.path(), Arc::new(FakeSync::default()));
        let mut registry = ResourceRegistry::default();

        manager
            .sync_all(&[dep("react", "18.3.1", Some("v18.3.1")), dep("@scope/ui", "1.0.0", Some("v1.0.0"))], &mut registry)
            .await;
        fs::create_dir_all(temp.path().join("repos/leftover@0.0.1")).unwrap();

        let removed = manager.clean_orphans(&registry).unwrap();
        assert_eq!(removed, vec![temp.path().join("repos/leftover@0.0.1")]);
        assert!(manager.checkout_path("@scope/ui@1.0.0").exists());

        assert!(manager.remove("react@18.3.1", &mut registry).await.unwrap());
        assert!(!manager.checkout_path("react@18.3.1").exists());
        assert_eq!(registry.total_size(), 10);
        assert!(!manager.remove("react@18.3.1", &mut registry).await.unwrap());
    }

    #[tokio::test]
    async fn test_detect_from_registry() {
        let temp = TempDir::new().unwrap();
        let mut manager = ResourceManager::new(temp.path(), Arc::new(FakeSync::default()));
        let mut registry = ResourceRegistry::default();
        manager.sync_all(&[dep("@scope/ui", "1.0.0", Some("v1.0.0"))], &mut registry).await;

        let mut fresh = ResourceManager::new(temp.path(), Arc::new(FakeSync::default()));
        fresh.detect_from_registry(&registry);
        let cached = fresh.get_cached_resources(&registry);
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "@scope/ui");
        assert_eq!(cached[0].version, "1.0.0");
    }
}
