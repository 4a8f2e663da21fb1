//! Supervised consultation subprocess.
//!
//! Each consultation spawns the configured command in the framework's
//! checkout directory, in a process group of its own. Standard output and
//! standard error are read concurrently, line by line, each through its
//! own [`GuidanceScanner`]; either stream may carry the guidance.
//!
//! The wall-clock budget covers the whole run. When it expires the entire
//! process group receives `SIGKILL`, so helpers the command forked die with
//! it. On platforms without process groups only the direct child is killed.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::ConsultError;
use super::extract::GuidanceScanner;
use crate::constants::{DEFAULT_CONSULT_TIMEOUT_SECS, PIPE_DRAIN_GRACE};

/// How the prompt reaches the consulted process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptDelivery {
    /// Written to standard input, which is then closed
    #[default]
    Stdin,
    /// Appended as the final command-line argument
    Argument,
}

/// Runs one consultation command under a deadline.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    command: String,
    args: Vec<String>,
    delivery: PromptDelivery,
    timeout: Duration,
}

impl ProcessRunner {
    /// Runner for `command args...` with stdin delivery and the default budget.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            delivery: PromptDelivery::default(),
            timeout: Duration::from_secs(DEFAULT_CONSULT_TIMEOUT_SECS),
        }
    }

    /// Choose how the prompt is delivered.
    #[must_use]
    pub fn with_delivery(mut self, delivery: PromptDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Set the wall-clock budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run with `prompt` in `cwd`; returns the validated guidance.
    pub async fn run(&self, prompt: &str, cwd: &Path) -> Result<String, ConsultError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        if self.delivery == PromptDelivery::Argument {
            cmd.arg(prompt);
        }
        cmd.current_dir(cwd)
            .stdin(match self.delivery {
                PromptDelivery::Stdin => Stdio::piped(),
                PromptDelivery::Argument => Stdio::null(),
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            ConsultError::ProcessError(format!("failed to spawn '{}': {e}", self.command))
        })?;
        let pid = child.id();
        tracing::debug!(target: "consult", "Spawned '{}' (pid {:?}) in {}", self.command, pid, cwd.display());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConsultError::ProcessError("stdout pipe unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConsultError::ProcessError("stderr pipe unavailable".to_string()))?;
        let stdout_task = tokio::spawn(scan_stream(stdout));
        let stderr_task = tokio::spawn(scan_stream(stderr));

        let writer = match (self.delivery, child.stdin.take()) {
            (PromptDelivery::Stdin, Some(mut stdin)) => {
                let prompt = prompt.to_string();
                Some(tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                        // the process may exit without reading its input
                        tracing::debug!(target: "consult", "Prompt write failed: {}", e);
                    }
                    drop(stdin);
                }))
            }
            _ => None,
        };

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                kill_group(pid);
                abort_readers(&stdout_task, &stderr_task, writer.as_ref());
                return Err(ConsultError::ProcessError(format!("failed to wait for process: {e}")));
            }
            Err(_) => {
                tracing::warn!(
                    target: "consult",
                    "'{}' exceeded {:?}, killing process group",
                    self.command,
                    self.timeout
                );
                kill_group(pid);
                if let Err(e) = child.kill().await {
                    tracing::debug!(target: "consult", "Direct kill after group kill: {}", e);
                }
                abort_readers(&stdout_task, &stderr_task, writer.as_ref());
                return Err(ConsultError::Timeout {
                    budget: self.timeout,
                });
            }
        };
        tracing::debug!(target: "consult", "'{}' exited with {}", self.command, status);

        // Forked helpers can keep the pipes open past the leader's exit
        let stdout_scan = drain(stdout_task, pid).await;
        let stderr_scan = drain(stderr_task, pid).await;
        if let Some(writer) = writer {
            writer.abort();
        }

        let stdout_result = stdout_scan.finish();
        if stdout_result.is_ok() {
            return stdout_result;
        }
        let stderr_result = stderr_scan.finish();
        if stderr_result.is_ok() {
            return stderr_result;
        }
        if !status.success() {
            tracing::debug!(target: "consult", "No guidance and non-zero exit: {}", status);
        }

        // A bracket without citation is more informative than no bracket
        match (stdout_result, stderr_result) {
            (Err(ConsultError::NoCitation), _) | (_, Err(ConsultError::NoCitation)) => {
                Err(ConsultError::NoCitation)
            }
            _ => Err(ConsultError::NoMarkers),
        }
    }
}

async fn scan_stream<R: AsyncRead + Unpin>(reader: R) -> GuidanceScanner {
    let mut scanner = GuidanceScanner::new();
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => scanner.push_line(&line),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(target: "consult", "Output stream ended with error: {}", e);
                break;
            }
        }
    }
    scanner
}

/// Wait briefly for a reader to reach EOF. Past the grace period the
/// group is killed, which closes the pipe and ends the reader.
async fn drain(mut task: JoinHandle<GuidanceScanner>, pid: Option<u32>) -> GuidanceScanner {
    if let Ok(joined) = tokio::time::timeout(PIPE_DRAIN_GRACE, &mut task).await {
        return joined.unwrap_or_else(|e| {
            tracing::debug!(target: "consult", "Output reader failed: {}", e);
            GuidanceScanner::new()
        });
    }

    kill_group(pid);
    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut task).await {
        Ok(Ok(scanner)) => scanner,
        _ => {
            task.abort();
            GuidanceScanner::new()
        }
    }
}

fn abort_readers(
    stdout: &JoinHandle<GuidanceScanner>,
    stderr: &JoinHandle<GuidanceScanner>,
    writer: Option<&JoinHandle<()>>,
) {
    stdout.abort();
    stderr.abort();
    if let Some(writer) = writer {
        writer.abort();
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only delivers a signal; pgid is the group created at spawn
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(
            target: "consult",
            "killpg({}) failed: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::constants::{GUIDANCE_END_MARKER, GUIDANCE_START_MARKER};
    use std::time::Instant;
    use tempfile::TempDir;

    fn sh(script: &str) -> ProcessRunner {
        ProcessRunner::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_guidance_on_stdout_with_stdin_prompt() {
        let temp = TempDir::new().unwrap();
        let script = format!(
            "read line; echo noise; echo '{GUIDANCE_START_MARKER}'; echo \"got $line\"; echo 'source: README.md'; echo '{GUIDANCE_END_MARKER}'"
        );
        let guidance = sh(&script).run("hello prompt\n", temp.path()).await.unwrap();
        assert_eq!(guidance, "got hello prompt\nsource: README.md");
    }

    #[tokio::test]
    async fn test_guidance_on_stderr_with_argument_prompt() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "present").unwrap();
        let script = format!(
            "echo '{GUIDANCE_START_MARKER}' >&2; echo \"arg=$0 file=$(cat marker.txt)\" >&2; echo 'Source: marker.txt' >&2; echo '{GUIDANCE_END_MARKER}' >&2"
        );
        let guidance = sh(&script)
            .with_delivery(PromptDelivery::Argument)
            .run("the-prompt", temp.path())
            .await
            .unwrap();
        assert_eq!(guidance, "arg=the-prompt file=present\nSource: marker.txt");
    }

    #[tokio::test]
    async fn test_structural_failures() {
        let temp = TempDir::new().unwrap();
        let err = sh("echo 'no markers here'").run("", temp.path()).await.unwrap_err();
        assert_eq!(err, ConsultError::NoMarkers);

        let script = format!("echo '{GUIDANCE_START_MARKER}'; echo 'trust me'; echo '{GUIDANCE_END_MARKER}'; exit 3");
        let err = sh(&script).run("", temp.path()).await.unwrap_err();
        assert_eq!(err, ConsultError::NoCitation);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_process_error() {
        let temp = TempDir::new().unwrap();
        let runner = ProcessRunner::new("groundwork-definitely-missing-binary", Vec::new());
        let err = runner.run("", temp.path()).await.unwrap_err();
        assert!(matches!(err, ConsultError::ProcessError(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_timeout_kills_process_group() {
        let temp = TempDir::new().unwrap();
        let pid_file = temp.path().join("helper.pid");
        // background helper keeps the pipes open and would outlive a plain kill
        let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
        let runner = sh(&script).with_timeout(Duration::from_millis(500));

        let start = Instant::now();
        let err = runner.run("", temp.path()).await.unwrap_err();
        assert_eq!(
            err,
            ConsultError::Timeout {
                budget: Duration::from_millis(500)
            }
        );
        assert_eq!(err.to_string(), "consultation timed out after 500ms");
        assert!(start.elapsed() < Duration::from_secs(10));

        let helper: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
        let mut alive = true;
        for _ in 0..50 {
            alive = is_running(helper);
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!alive, "helper process {helper} survived the group kill");
    }

    /// Zombies awaiting reaping count as dead.
    fn is_running(pid: i32) -> bool {
        if cfg!(target_os = "linux") {
            return std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .map(|stat| !stat.contains(") Z "))
                .unwrap_or(false);
        }
        // SAFETY: signal 0 only probes for existence
        unsafe { libc::kill(pid, 0) == 0 }
    }
}
