//! The repository-sync capability the cache manager drives.
//!
//! The manager decides *whether* a checkout must be created, updated or left
//! alone; a [`RepoSync`] implementation knows *how*. [`GitSync`] is the real
//! one. Tests substitute fakes so cache behavior can be exercised without a
//! network.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::git::{self, GitRepo};

/// Create and refresh local checkouts of remote repositories.
#[async_trait]
pub trait RepoSync: Send + Sync {
    /// Tag on `url` naming `version` of package `name`, if any.
    async fn find_tag(&self, url: &str, name: &str, version: &str) -> Result<Option<String>>;

    /// Create a checkout of `url` (at `tag` when given) in `dest`; returns
    /// the checked-out commit.
    async fn clone_repo(&self, url: &str, tag: Option<&str>, dest: &Path) -> Result<String>;

    /// Whether an untagged checkout lags behind its remote default branch.
    async fn is_stale(&self, path: &Path) -> Result<bool>;

    /// Bring an untagged checkout up to date; returns the new commit.
    async fn update(&self, path: &Path) -> Result<String>;

    /// Commit currently checked out in `path`.
    async fn current_commit(&self, path: &Path) -> Result<String>;
}

/// [`RepoSync`] backed by the system `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitSync;

#[async_trait]
impl RepoSync for GitSync {
    async fn find_tag(&self, url: &str, name: &str, version: &str) -> Result<Option<String>> {
        git::find_version_tag(url, name, version).await
    }

    async fn clone_repo(&self, url: &str, tag: Option<&str>, dest: &Path) -> Result<String> {
        GitRepo::clone_at(url, tag, dest).await?.current_commit().await
    }

    async fn is_stale(&self, path: &Path) -> Result<bool> {
        GitRepo::new(path).is_stale().await
    }

    async fn update(&self, path: &Path) -> Result<String> {
        GitRepo::new(path).update().await
    }

    async fn current_commit(&self, path: &Path) -> Result<String> {
        GitRepo::new(path).current_commit().await
    }
}
