//! Local git repositories standing in for framework remotes.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A throwaway repository driven through the system `git`.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    /// Wrap `repo_path` (not created or initialized).
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Create `dir`, `git init` it, configure a committer and make a first
    /// commit containing `README.md`.
    pub fn init_origin(dir: impl Into<PathBuf>) -> Result<Self> {
        let git = Self::new(dir);
        std::fs::create_dir_all(&git.repo_path)
            .with_context(|| format!("Failed to create {}", git.repo_path.display()))?;
        git.run(&["init", "-q"], "Failed to initialize git repository")?;
        git.run(&["config", "user.email", "test@groundwork.example"], "Failed to set user.email")?;
        git.run(&["config", "user.name", "Test User"], "Failed to set user.name")?;
        git.commit_file("README.md", "initial\n", "initial")?;
        Ok(git)
    }

    /// Write `path` and commit it.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> Result<()> {
        let file = self.repo_path.join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file, content).with_context(|| format!("Failed to write {}", file.display()))?;
        self.run(&["add", "."], "Failed to add files to git")?;
        self.run(&["commit", "-q", "-m", message], "Failed to create git commit")?;
        Ok(())
    }

    /// Create a lightweight tag at `HEAD`.
    pub fn tag(&self, tag_name: &str) -> Result<()> {
        self.run(&["tag", tag_name], &format!("Failed to create tag: {tag_name}"))?;
        Ok(())
    }

    /// Commit hash of `HEAD`.
    pub fn head(&self) -> Result<String> {
        let output = self.run(&["rev-parse", "HEAD"], "Failed to read HEAD")?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// `file://` URL cloning this repository.
    pub fn url(&self) -> String {
        format!("file://{}", self.repo_path.display())
    }

    /// Repository location.
    pub fn path(&self) -> &Path {
        &self.repo_path
    }

    fn run(&self, args: &[&str], action: &str) -> Result<std::process::Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }
        Ok(output)
    }
}
