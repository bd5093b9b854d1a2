//! Typed subprocess invocation
//!
//! Every external tool (git, the signer, the release CLI) goes through [`run`],
//! which captures exit status, stdout and stderr in one [`ProcessOutput`].
//! Call sites decide which error kind a failure maps to.

use std::ffi::OsStr;
use std::io;
use std::process::Command;
use tracing::debug;

/// Captured result of a finished subprocess
#[derive(Debug, Clone)]
pub struct ProcessOutput {
  /// Exit code, `None` when killed by a signal
  pub code: Option<i32>,
  pub stdout: Vec<u8>,
  pub stderr: Vec<u8>,
}

impl ProcessOutput {
  /// True when the process exited with status 0
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// Stdout as trimmed text
  pub fn stdout_text(&self) -> String {
    String::from_utf8_lossy(&self.stdout).trim().to_string()
  }

  /// Stderr as text, untouched
  pub fn stderr_text(&self) -> String {
    String::from_utf8_lossy(&self.stderr).to_string()
  }
}

/// Human-readable rendering of a command line for logs
pub fn describe(cmd: &Command) -> String {
  let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
  parts.extend(cmd.get_args().map(|a: &OsStr| a.to_string_lossy().to_string()));
  parts.join(" ")
}

/// Run a command to completion, blocking
///
/// Errors only when the program cannot be spawned; a non-zero exit is
/// reported through [`ProcessOutput::code`].
pub fn run(cmd: &mut Command) -> io::Result<ProcessOutput> {
  let line = describe(cmd);
  debug!(command = %line, "spawning");

  let output = cmd.output()?;
  let result = ProcessOutput {
    code: output.status.code(),
    stdout: output.stdout,
    stderr: output.stderr,
  };

  debug!(command = %line, code = ?result.code, "finished");
  Ok(result)
}
