//! Command runner for usage commands.
//!
//! Provides async subprocess execution with a bounded runtime.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{MeterError, Result};

/// Default timeout for usage commands.
pub const CLI_TIMEOUT: Duration = Duration::from_secs(30);

/// Output from a command.
#[derive(Debug)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CliOutput {
    /// Check if command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert a non-zero exit into a [`MeterError::ProcessFailure`].
    ///
    /// The message is the trimmed stderr, or a generic one naming the exit code.
    ///
    /// # Errors
    ///
    /// Returns the failure when the exit code is non-zero.
    pub fn into_stdout(self) -> Result<String> {
        if self.success() {
            return Ok(self.stdout.trim().to_string());
        }
        let stderr = self.stderr.trim();
        let message = if stderr.is_empty() {
            format!("Command failed with exit code {}.", self.exit_code)
        } else {
            stderr.to_string()
        };
        Err(MeterError::ProcessFailure(message))
    }
}

/// How a configured command string is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: String,
    pub args: Vec<String>,
}

impl Launch {
    /// Resolve a configured command and optional argument list.
    ///
    /// - An absolute path to an existing file runs directly with `args`.
    /// - Otherwise, with arguments, the command is looked up via `/usr/bin/env`.
    /// - Otherwise the command is a shell string run by `/bin/sh -lc`.
    #[must_use]
    pub fn resolve(command: &str, args: &[String]) -> Self {
        let trimmed = command.trim();

        if trimmed.starts_with('/') && Path::new(trimmed).is_file() {
            Self {
                program: trimmed.to_string(),
                args: args.to_vec(),
            }
        } else if !args.is_empty() {
            let mut env_args = Vec::with_capacity(args.len() + 1);
            env_args.push(trimmed.to_string());
            env_args.extend(args.iter().cloned());
            Self {
                program: "/usr/bin/env".to_string(),
                args: env_args,
            }
        } else {
            Self {
                program: "/bin/sh".to_string(),
                args: vec!["-lc".to_string(), trimmed.to_string()],
            }
        }
    }
}

/// Run a command with timeout.
///
/// # Errors
///
/// Returns error if:
/// - The program cannot be spawned
/// - Reading its output fails
/// - It does not finish within `timeout_duration` (the child is killed)
pub async fn run_command(
    program: &str,
    args: &[String],
    timeout_duration: Duration,
) -> Result<CliOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MeterError::ProcessFailure(format!("Command not found: {program}"))
            } else {
                MeterError::ProcessFailure(format!("Failed to start {program}: {e}"))
            }
        })?;

    let result = timeout(timeout_duration, async {
        // Drain both pipes concurrently so a chatty stderr cannot block stdout.
        let stdout_handle = async {
            let mut stdout = String::new();
            if let Some(mut out) = child.stdout.take() {
                out.read_to_string(&mut stdout).await?;
            }
            Ok::<_, std::io::Error>(stdout)
        };

        let stderr_handle = async {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                err.read_to_string(&mut stderr).await?;
            }
            Ok::<_, std::io::Error>(stderr)
        };

        let (stdout_result, stderr_result) = tokio::join!(stdout_handle, stderr_handle);
        let stdout = stdout_result?;
        let stderr = stderr_result?;

        let status = child.wait().await?;

        Ok::<_, std::io::Error>(CliOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
        })
    })
    .await;

    match result {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(MeterError::ProcessFailure(format!(
            "Failed to read output of {program}: {e}"
        ))),
        Err(_) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            Err(MeterError::Timeout(timeout_duration.as_secs()))
        }
    }
}
