//! Git operations for framework checkouts.
//!
//! groundwork shells out to the system `git` binary (the same approach as
//! Cargo's `git-fetch-with-cli`) so existing git configuration and proxies
//! keep working. Checkouts are shallow: only the source at one tag, or at the
//! tip of the default branch, is ever needed.
//!
//! # Checkout lifecycle
//!
//! - [`GitRepo::clone_at`] creates a depth-1 checkout, pinned to a tag when
//!   one is known
//! - [`GitRepo::is_stale`] compares the local `HEAD` with the remote default
//!   branch (only meaningful for untagged checkouts)
//! - [`GitRepo::update`] fast-forwards an untagged checkout to the remote tip
//! - [`find_version_tag`] lists remote tags and picks the one naming a
//!   package version, without cloning

pub mod command_builder;

pub use command_builder::{GitCommand, GitCommandOutput};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Handle on a local checkout.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Wrap an existing checkout directory.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Shallow-clone `url` into `target`, at `tag` when given.
    ///
    /// # Errors
    ///
    /// Returns [`GroundworkError::GitCloneFailed`] when git rejects the clone
    /// (unknown repository, missing tag, network failure).
    ///
    /// [`GroundworkError::GitCloneFailed`]: crate::core::GroundworkError::GitCloneFailed
    pub async fn clone_at(url: &str, tag: Option<&str>, target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref();
        GitCommand::clone_shallow(url, tag, target)
            .with_context(target.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
            .execute_success()
            .await?;
        Ok(Self::new(target))
    }

    /// Commit hash of `HEAD`.
    pub async fn current_commit(&self) -> Result<String> {
        GitCommand::current_commit().current_dir(&self.path).execute_stdout().await
    }

    /// Whether the remote default branch has moved past the local `HEAD`.
    pub async fn is_stale(&self) -> Result<bool> {
        let local = self.current_commit().await?;
        let remote = GitCommand::ls_remote_head().current_dir(&self.path).execute_stdout().await?;
        let remote = remote.split_whitespace().next().unwrap_or_default();
        Ok(!remote.is_empty() && remote != local)
    }

    /// Move the checkout to the remote default branch tip; returns the new
    /// commit.
    pub async fn update(&self) -> Result<String> {
        GitCommand::fetch_head().current_dir(&self.path).execute_success().await?;
        GitCommand::reset_to_fetch_head().current_dir(&self.path).execute_success().await?;
        self.current_commit().await
    }

    /// Whether the directory holds a git checkout.
    pub fn is_git_repo(&self) -> bool {
        self.path.join(".git").exists()
    }

    /// Checkout location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Find the remote tag that names `version` of package `name`.
///
/// Returns `Ok(None)` when the remote has no matching tag; errors only when
/// the remote cannot be listed at all.
pub async fn find_version_tag(url: &str, name: &str, version: &str) -> Result<Option<String>> {
    let output = GitCommand::ls_remote_tags(url).with_context(name).execute_stdout().await?;
    let tags: Vec<&str> = output
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .filter_map(|reference| reference.strip_prefix("refs/tags/"))
        .collect();
    Ok(match_version_tag(&tags, name, version))
}

/// Pick the tag naming `version`, trying the common conventions in order:
/// `v1.2.3`, `1.2.3`, `name@1.2.3`, `name-v1.2.3`, `name-1.2.3`,
/// `release-1.2.3`. Scoped names also try their leaf (`@scope/pkg` → `pkg`).
pub fn match_version_tag(tags: &[&str], name: &str, version: &str) -> Option<String> {
    let bare = version.trim_start_matches('v');
    if bare.is_empty() {
        return None;
    }

    let mut candidates = vec![format!("v{bare}"), bare.to_string()];
    let mut names = vec![name];
    if let Some(leaf) = name.rsplit('/').next()
        && leaf != name
    {
        names.push(leaf);
    }
    for n in names {
        candidates.push(format!("{n}@{bare}"));
        candidates.push(format!("{n}@v{bare}"));
        candidates.push(format!("{n}-v{bare}"));
        candidates.push(format!("{n}-{bare}"));
    }
    candidates.push(format!("release-{bare}"));

    candidates.into_iter().find(|candidate| tags.contains(&candidate.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_match_version_tag_conventions() {
        let tags = ["v18.2.0", "v18.3.1", "18.3.0"];
        assert_eq!(match_version_tag(&tags, "react", "18.3.1").as_deref(), Some("v18.3.1"));
        assert_eq!(match_version_tag(&tags, "react", "18.3.0").as_deref(), Some("18.3.0"));
        assert_eq!(match_version_tag(&tags, "react", "v18.2.0").as_deref(), Some("v18.2.0"));
        assert_eq!(match_version_tag(&tags, "react", "19.0.0"), None);
    }

    #[test]
    fn test_match_version_tag_monorepo() {
        let tags = ["@prisma/client@5.10.0", "next@14.1.0", "query-v5.0.0"];
        assert_eq!(
            match_version_tag(&tags, "@prisma/client", "5.10.0").as_deref(),
            Some("@prisma/client@5.10.0")
        );
        assert_eq!(match_version_tag(&tags, "next", "14.1.0").as_deref(), Some("next@14.1.0"));
        assert_eq!(
            match_version_tag(&tags, "@tanstack/query", "5.0.0").as_deref(),
            Some("query-v5.0.0")
        );
        assert_eq!(match_version_tag(&tags, "next", ""), None);
    }

    async fn git(dir: &Path, args: &[&str]) {
        GitCommand::new()
            .current_dir(dir)
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(args.iter().copied())
            .execute_success()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clone_tag_and_update_local_repo() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir(&origin).unwrap();
        git(&origin, &["init", "-q"]).await;
        std::fs::write(origin.join("README.md"), "v1").unwrap();
        git(&origin, &["add", "."]).await;
        git(&origin, &["commit", "-q", "-m", "one"]).await;
        git(&origin, &["tag", "v1.0.0"]).await;

        let url = format!("file://{}", origin.display());
        let tag = find_version_tag(&url, "demo", "1.0.0").await.unwrap();
        assert_eq!(tag.as_deref(), Some("v1.0.0"));

        let tagged = GitRepo::clone_at(&url, tag.as_deref(), temp.path().join("tagged")).await.unwrap();
        assert!(tagged.is_git_repo());
        assert_eq!(tagged.current_commit().await.unwrap().len(), 40);

        let head = GitRepo::clone_at(&url, None, temp.path().join("head")).await.unwrap();
        assert!(!head.is_stale().await.unwrap());

        std::fs::write(origin.join("README.md"), "v2").unwrap();
        git(&origin, &["commit", "-q", "-am", "two"]).await;
        assert!(head.is_stale().await.unwrap());

        let updated = head.update().await.unwrap();
        assert_eq!(updated, GitRepo::new(&origin).current_commit().await.unwrap());
        assert_eq!(std::fs::read_to_string(head.path().join("README.md")).unwrap(), "v2");
    }
}
