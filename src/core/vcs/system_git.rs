//! System git backend
//!
//! Uses the `git` binary for all operations. Commands run with an isolated
//! environment so user configuration cannot change archive output.

use crate::core::error::{ResultExt, ShipError, ShipResult};
use crate::core::process::{self, ProcessOutput};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to find the working tree root.
  pub fn open(path: &Path) -> ShipResult<Self> {
    let output = process::run(
      Command::new("git")
        .arg("-C")
        .arg(path)
        .args(["rev-parse", "--show-toplevel"]),
    )
    .context("Failed to execute git rev-parse")?;

    if !output.success() {
      let stderr = output.stderr_text();
      if stderr.contains("not a git repository") {
        return Err(ShipError::with_help(
          format!("Not a git repository: {}", path.display()),
          "Run tagship from inside the repository you want to release.",
        ));
      }
      return Err(ShipError::message(format!("Failed to open git repository: {}", stderr)));
    }

    Ok(Self {
      work_tree: PathBuf::from(output.stdout_text()),
    })
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Directory name of the working tree (default repository name)
  pub fn repo_dir_name(&self) -> Option<String> {
    self
      .work_tree
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
  }

  /// Run git with the given arguments and capture the result
  pub(crate) fn run<I, S>(&self, args: I) -> ShipResult<ProcessOutput>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
  {
    let mut cmd = self.git_cmd();
    cmd.args(args);
    let line = process::describe(&cmd);
    process::run(&mut cmd).with_context(|| format!("Failed to execute {}", line))
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to the work tree
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.work_tree);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
    cmd.arg("-c").arg("advice.detachedHead=false");

    cmd
  }
}
