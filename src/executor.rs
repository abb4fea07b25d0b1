//! Command execution module for running the commands the user picks.
//!
//! Chosen shell commands run through `sh -c` with the terminal's standard
//! streams inherited, so interactive programs behave as if typed directly.
//! Helper programs (git, the editor) go through the same [`ProcessRunner`]
//! seam so tests never spawn real processes.

use anyhow::Result;
use std::process::{Command, ExitStatus, Output};
use thiserror::Error;
use tracing::{error, info};

/// A shell command that could not be run to a successful exit.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to start `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` exited with {}", describe_code(.code))]
    Failed { command: String, code: Option<i32> },

    #[error("could not write to the terminal: {0}")]
    Output(#[from] std::io::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

// =============================================================================
// Traits for Dependency Injection
// =============================================================================

/// Trait for running system processes.
///
/// This abstraction enables testing without spawning real processes.
pub trait ProcessRunner: Send + Sync {
    /// Executes a command and captures its output.
    fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Executes a command attached to the current terminal.
    fn run_interactive(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;

    /// Checks if a program exists in PATH.
    fn program_exists(&self, program: &str) -> bool;
}

// =============================================================================
// Default Implementations
// =============================================================================

/// Default process runner using std::process::Command.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd.output()?)
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd.status()?)
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

// =============================================================================
// Executor Implementation
// =============================================================================

/// Runs shell commands chosen from the suggestion menu.
///
/// # Example
///
/// ```ignore
/// let executor = Executor::new();
/// executor.execute_shell_command("ls -la", &mut std::io::stdout())?;
/// ```
pub struct Executor {
    runner: Box<dyn ProcessRunner>,
}

impl Executor {
    /// Creates an executor backed by real processes.
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemProcessRunner))
    }

    /// Creates an executor with an injected runner (for testing).
    pub fn with_runner(runner: Box<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Executes `command` through the shell, inheriting stdio. The
    /// announcement line goes to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Spawn`] if the shell cannot be started,
    /// [`ExecutionError::Failed`] if the command exits with a non-zero status
    /// and [`ExecutionError::Output`] if the announcement cannot be written.
    pub fn execute_shell_command<W: std::io::Write>(
        &self,
        command: &str,
        output: &mut W,
    ) -> Result<(), ExecutionError> {
        writeln!(output, "Executing command: {}", command)?;
        output.flush()?;
        info!("Executing shell command: {}", command);

        let status = self
            .runner
            .run_interactive("sh", &["-c", command])
            .map_err(|err| ExecutionError::Spawn {
                command: command.to_string(),
                reason: err.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            error!("Command failed with status: {}", status);
            Err(ExecutionError::Failed {
                command: command.to_string(),
                code: status.code(),
            })
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
