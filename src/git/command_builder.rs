//! Type-safe Git command builder for consistent command execution
//!
//! Every git invocation groundwork makes goes through [`GitCommand`], which
//! owns timeouts, non-interactive environment, logging and the mapping of
//! failures onto [`GroundworkError`].

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::{GIT_CLONE_TIMEOUT, GIT_FETCH_TIMEOUT};
use crate::core::GroundworkError;

const GIT: &str = "git";

/// Builder for a single git invocation.
///
/// New commands capture output, run with a 60 second timeout, and never
/// prompt for credentials (`GIT_TERMINAL_PROMPT=0`), so an unknown or
/// private repository fails fast instead of hanging a worker.
///
/// # Examples
///
/// ```rust,no_run
/// use groundwork::git::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let head = GitCommand::current_commit()
///     .current_dir("/path/to/checkout")
///     .with_context("react@18.3.1")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GitCommand {
    /// Command arguments passed to git
    args: Vec<String>,

    /// Repository directory, passed as `git -C <dir>`
    current_dir: Option<PathBuf>,

    /// Extra environment for the git process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait for completion (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Identifier included in log lines (usually the package key)
    context: Option<String>,

    /// For clone commands, the URL for error messages
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: Some(GIT_FETCH_TIMEOUT),
            context: None,
            clone_url: None,
        }
    }
}

impl GitCommand {
    /// Creates a new git command builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run git against the repository at `dir`.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Adds a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for this invocation only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Set a custom timeout for the command (None for no timeout)
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a context for logging (e.g. the package key)
    ///
    /// With context, log messages carry the identifier so concurrent
    /// operations can be told apart:
    /// ```text
    /// (react@18.3.1) Executing command: git clone --depth 1 ...
    /// ```
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The git subcommand, for error reporting. Skips `-c key=value` pairs.
    fn operation(&self) -> String {
        let mut args = self.args.iter();
        while let Some(arg) = args.next() {
            if arg == "-c" {
                args.next();
                continue;
            }
            return arg.clone();
        }
        "unknown".to_string()
    }

    fn log_prefix(&self) -> String {
        self.context.as_ref().map(|ctx| format!("({ctx}) ")).unwrap_or_default()
    }

    /// Execute the command and return its output.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let prefix = self.log_prefix();
        let mut cmd = Command::new(GIT);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        cmd.args(&full_args);

        tracing::debug!(target: "git", "{}Executing command: {} {}", prefix, GIT, full_args.join(" "));

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "{}Command timed out after {} seconds: git {}",
                        prefix,
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(GroundworkError::GitCommandError {
                        operation: self.operation(),
                        stderr: format!(
                            "Git command timed out after {} seconds. This may indicate:\n\
                            - Network connectivity issues\n\
                            - A very large repository\n\
                            Try running the command manually: git {}",
                            duration.as_secs(),
                            full_args.join(" ")
                        ),
                    }
                    .into());
                }
            },
            None => output_future.await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GroundworkError::GitNotFound.into());
            }
            Err(e) => {
                return Err(e).context(format!("Failed to execute git {}", full_args.join(" ")));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "{}Command failed with exit code {:?}: {}",
                prefix,
                output.status.code(),
                stderr.trim()
            );

            let operation = self.operation();
            let error = match self.clone_url {
                Some(url) => GroundworkError::GitCloneFailed {
                    url,
                    reason: stderr.trim().to_string(),
                },
                None => GroundworkError::GitCommandError {
                    operation,
                    stderr: if stderr.is_empty() {
                        stdout
                    } else {
                        stderr
                    },
                },
            };
            return Err(error.into());
        }

        if !stdout.is_empty() {
            tracing::trace!(target: "git", "{}{}", prefix, stdout.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "git::perf",
                "{}Git {} took {:.2}s",
                prefix,
                self.operation(),
                elapsed.as_secs_f64()
            );
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Execute the command and return only stdout as a trimmed string
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command and check for success
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Output from a git command
pub struct GitCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

// Convenience builders for the operations the cache needs

impl GitCommand {
    /// Shallow clone of `url` into `target`, optionally at `tag`.
    pub fn clone_shallow(url: &str, tag: Option<&str>, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new()
            .args(["-c", "advice.detachedHead=false", "clone", "--depth", "1"])
            .with_timeout(Some(GIT_CLONE_TIMEOUT));
        if let Some(tag) = tag {
            cmd = cmd.args(["--branch", tag, "--single-branch"]);
        }
        cmd = cmd.arg(url).arg(target.as_ref().display().to_string());
        cmd.clone_url = Some(url.to_string());
        cmd
    }

    /// List the tags of a remote without cloning it.
    pub fn ls_remote_tags(url: &str) -> Self {
        Self::new().args(["ls-remote", "--tags", "--refs", url])
    }

    /// Commit the remote's default branch points at.
    pub fn ls_remote_head() -> Self {
        Self::new().args(["ls-remote", "origin", "HEAD"])
    }

    /// Shallow fetch of the remote's default branch into `FETCH_HEAD`.
    pub fn fetch_head() -> Self {
        Self::new().args(["fetch", "--depth", "1", "origin", "HEAD"])
    }

    /// Move the working tree to `FETCH_HEAD`.
    pub fn reset_to_fetch_head() -> Self {
        Self::new().args(["reset", "--hard", "FETCH_HEAD"])
    }

    /// Get the current commit hash
    pub fn current_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }
}
