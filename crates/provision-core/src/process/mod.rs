//! Child-process execution used by step bodies.

mod wait;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;

use crate::error::StepError;

pub use wait::{Poll, WaitPolicy, wait_until};

/// A shell command line plus where and how to run it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// Quote one argument for `sh`.
pub fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim().to_string();
        let err = self.stderr.trim();
        if !err.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(err);
        }
        text
    }
}

/// Runs command lines. Implementations may block until the child exits.
pub trait ProcessRunner: Debug + Send + Sync {
    fn run(&self, request: &CommandRequest) -> anyhow::Result<CommandOutput>;

    /// Run and turn a non-zero exit into a step failure.
    fn run_checked(&self, request: &CommandRequest) -> Result<CommandOutput, StepError> {
        let output = self.run(request)?;
        if !output.success() {
            return Err(StepError::Command {
                command: request.command.clone(),
                status: output.status,
                output: output.combined(),
            });
        }
        Ok(output)
    }
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    verbose: bool,
}

impl ShellRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProcessRunner for ShellRunner {
    fn run(&self, request: &CommandRequest) -> anyhow::Result<CommandOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&request.command).envs(&request.env);
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %request.command, dir = ?request.working_dir, "running command");
        let output = cmd
            .output()
            .with_context(|| format!("Failed to invoke `{}`", request.command))?;

        let result = CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if self.verbose {
            for line in result.combined().lines() {
                tracing::info!(target: "provision::process", "{line}");
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_runner_captures_output_and_status() {
        let runner = ShellRunner::default();
        let output = runner
            .run(&CommandRequest::new("echo hello; echo oops >&2; exit 3"))
            .unwrap();
        assert_eq!(output.status, 3);
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.combined(), "hello\noops");
    }

    #[test]
    fn shell_runner_passes_env_and_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = ShellRunner::default();
        let output = runner
            .run(
                &CommandRequest::new("echo \"$PROVISION_CONTEXT\"; pwd")
                    .in_dir(temp.path())
                    .with_env("PROVISION_CONTEXT", "server_master"),
            )
            .unwrap();
        let lines: Vec<&str> = output.stdout.lines().collect();
        assert_eq!(lines[0], "server_master");
        assert!(lines[1].ends_with(temp.path().file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn run_checked_reports_failed_command() {
        let runner = ShellRunner::default();
        let err = runner.run_checked(&CommandRequest::new("exit 2")).unwrap_err();
        assert!(matches!(err, StepError::Command { status: 2, .. }));
    }

    #[test]
    fn quote_leaves_plain_words_alone() {
        assert_eq!(quote("--host=db"), "--host=db");
        assert_eq!(quote("SHOW DATABASES"), "'SHOW DATABASES'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
    }
}
