//! External command execution
//!
//! Every OS command the service runs goes through [`CommandRunner`], which
//! bounds it with a timeout. The process-backed runner kills the child when
//! the timeout fires.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

/// A command line plus the time it is allowed to take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
        }
    }

    /// True if this is `program` invoked with exactly `args`
    pub fn is(&self, program: &str, args: &[&str]) -> bool {
        self.program == program && self.args.iter().map(String::as_str).eq(args.iter().copied())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into() }
    }
}

/// Command execution errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The program exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Runs external commands
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion or until its timeout elapses
    fn run(&self, command: CommandSpec) -> BoxFuture<'static, Result<CommandOutput, CommandError>>;
}

/// [`CommandRunner`] backed by real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: CommandSpec) -> BoxFuture<'static, Result<CommandOutput, CommandError>> {
        Box::pin(async move {
            let mut child = tokio::process::Command::new(&command.program);
            child
                .args(&command.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            log::debug!("Running command: {}", command);

            let output = match tokio::time::timeout(command.timeout, child.output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(source)) => {
                    return Err(CommandError::Spawn {
                        program: command.program,
                        source,
                    })
                }
                Err(_) => {
                    return Err(CommandError::Timeout {
                        program: command.program,
                        timeout: command.timeout,
                    })
                }
            };

            if !output.status.success() {
                return Err(CommandError::Failed {
                    program: command.program,
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        })
    }
}
