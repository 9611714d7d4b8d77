//! Subprocess Execution
//!
//! Shared helpers for tools that shell out. Every invocation runs under the
//! session's wall-clock timeout; a timed-out process is killed and reported
//! as a tool execution error.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use agent_core::error::{AgentError, Result};

/// Captured output of a finished subprocess
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout when the command succeeded, stderr folded in otherwise
    pub fn combined(&self) -> String {
        if self.success {
            self.stdout.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            self.stderr.clone()
        }
    }
}

/// Run a program with explicit arguments (no shell interpretation)
pub async fn run_command(
    program: &str,
    args: &[&str],
    cwd: &Path,
    envs: &HashMap<String, String>,
    timeout: Duration,
) -> Result<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .envs(envs)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    run(cmd, program, timeout).await
}

/// Run a full command line through `sh -c`.
///
/// Only for tools whose contract is a raw command string (gcloud,
/// terraform); everything else uses `run_command`.
pub async fn run_shell(
    command_line: &str,
    cwd: &Path,
    envs: &HashMap<String, String>,
    timeout: Duration,
) -> Result<CommandOutput> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command_line)
        .current_dir(cwd)
        .envs(envs)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    run(cmd, command_line, timeout).await
}

async fn run(mut cmd: Command, label: &str, timeout: Duration) -> Result<CommandOutput> {
    tracing::debug!(command = %label, "spawning subprocess");
    let child = cmd
        .spawn()
        .map_err(|e| AgentError::ToolExecution(format!("failed to spawn '{}': {}", label, e)))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            AgentError::ToolExecution(format!(
                "command '{}' timed out after {}s",
                label,
                timeout.as_secs()
            ))
        })?
        .map_err(|e| AgentError::ToolExecution(format!("command '{}' failed: {}", label, e)))?;

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_captures_stdout() {
        let out = run_command(
            "echo",
            &["hello"],
            Path::new("/tmp"),
            &HashMap::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_shell_reports_failure_via_stderr() {
        let out = run_shell(
            "ls /definitely/not/a/real/path",
            Path::new("/tmp"),
            &HashMap::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(!out.success);
        assert!(!out.combined().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_kills_the_process() {
        let err = run_shell(
            "sleep 10",
            Path::new("/tmp"),
            &HashMap::new(),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
