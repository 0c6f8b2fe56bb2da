//! External process execution.
//!
//! Sub-jobs, the enumeration scripts and the store's `mv` fallback all run as
//! shell command lines. The `ProcessRunner` trait is the seam; `ShellRunner`
//! is the production implementation.

use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Errors from running an external command.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with exit code {exit_code}: {stderr}")]
    Failed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Create a command failed error.
    pub fn failed(command: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::Failed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }
}

/// Result type for process execution.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Runs shell command lines synchronously.
pub trait ProcessRunner: Send + Sync {
    /// Run `command` in `cwd`, blocking until it exits.
    ///
    /// Returns captured stdout on success, an error on spawn failure or
    /// non-zero exit.
    fn run(&self, command: &str, cwd: &Path) -> ProcessResult<String>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Use a different POSIX shell binary.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> ProcessResult<String> {
        tracing::debug!("Running: {} (in {})", command, cwd.display());

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .output()
            .map_err(|source| ProcessError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessError::failed(
                command,
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Quote a word for safe inclusion in a `sh -c` command line.
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}
