//! External command execution.
//!
//! Every engine shells out through a [`CommandRunner`], which keeps the
//! adapters testable without the real tools installed.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::EngineError;

const STDERR_TAIL_CHARS: usize = 2000;

/// A fully specified command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Value following `flag` in the argument list.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Short form for log lines.
    pub fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion.
    ///
    /// A non-zero exit is returned as output, not as an error. Errors are
    /// reserved for spawn failures and timeouts.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, EngineError>;

    /// Runs the command and turns a non-zero exit into
    /// [`EngineError::NonZeroExit`].
    async fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput, EngineError> {
        let output = self.run(spec).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(EngineError::NonZeroExit {
                program: spec.program.clone(),
                code: output.code,
                stderr: tail(&output.stderr, STDERR_TAIL_CHARS),
            })
        }
    }
}

/// Runs commands as tokio child processes.
///
/// The child is killed when the timeout elapses.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, EngineError> {
        tracing::debug!(command = %spec.display(), "Spawning process");

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn {
                program: spec.program.clone(),
                source: e,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(spec.timeout, child.wait_with_output())
            .await
            .map_err(|_| EngineError::Timeout {
                program: spec.program.clone(),
                timeout: spec.timeout,
            })?
            .map_err(|e| EngineError::Spawn {
                program: spec.program.clone(),
                source: e,
            })?;

        let code = output.status.code();
        if code != Some(0) {
            tracing::warn!(program = %spec.program, ?code, "Process exited unsuccessfully");
        }

        Ok(CommandOutput {
            code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Last `max_chars` characters of `text`.
pub(crate) fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.trim_end().to_string();
    }
    text.chars()
        .skip(count - max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}
