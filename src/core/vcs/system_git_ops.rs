//! Release operations for SystemGit (tags, status, archive, remotes)

use super::system_git::SystemGit;
use crate::core::error::{BuildError, ResolutionError, ResultExt, ShipError, ShipResult};
use crate::core::process;
use std::path::Path;

impl SystemGit {
  /// Tag that exactly describes HEAD
  ///
  /// Uses `git describe --tags --exact-match` so a commit past the tag is
  /// rejected instead of yielding `v1.2.3-4-gabcdef`.
  pub fn describe_head_tag(&self) -> ShipResult<String> {
    let output = self.run(["describe", "--tags", "--exact-match", "HEAD"])?;

    if !output.success() {
      return Err(ShipError::Resolution(ResolutionError::NoTag {
        stderr: output.stderr_text(),
      }));
    }

    let tag = output.stdout_text();
    if tag.is_empty() {
      return Err(ShipError::Resolution(ResolutionError::NoTag { stderr: String::new() }));
    }
    Ok(tag)
  }

  /// Porcelain status lines for one path (tracked edits, untracked and
  /// ignored files)
  ///
  /// An empty string means the path matches HEAD exactly. Ignored files are
  /// listed too (`!!`): one that was never committed is on disk but not in
  /// the tag.
  pub fn path_status(&self, path: &Path) -> ShipResult<String> {
    let mut cmd = self.git_cmd();
    cmd
      .args(["status", "--porcelain", "--ignored", "--untracked-files=all", "--"])
      .arg(path);
    let output = process::run(&mut cmd).context("Failed to execute git status")?;

    if !output.success() {
      return Err(ShipError::message(format!(
        "git status failed for {}: {}",
        path.display(),
        output.stderr_text()
      )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  /// Write a gzip tarball of `tag` to `out`, every path under `prefix`
  pub fn archive_tar_gz(&self, tag: &str, prefix: &str, out: &Path) -> ShipResult<()> {
    let mut cmd = self.git_cmd();
    cmd
      .args(["archive", "--format=tar.gz"])
      .arg(format!("--prefix={}", prefix))
      .arg("-o")
      .arg(out)
      .arg(tag);
    let output = process::run(&mut cmd).context("Failed to execute git archive")?;

    if !output.success() {
      return Err(ShipError::Build(BuildError {
        tag: tag.to_string(),
        stderr: output.stderr_text(),
      }));
    }

    Ok(())
  }

  /// List all remotes as (name, fetch URL)
  pub fn list_remotes(&self) -> ShipResult<Vec<(String, String)>> {
    let output = self.run(["remote", "-v"])?;

    if !output.success() {
      return Ok(vec![]);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut remotes = Vec::new();

    for line in stdout.lines() {
      // Format: "origin  git@github.com:user/repo.git (fetch)"
      let parts: Vec<&str> = line.split_whitespace().collect();
      if parts.len() >= 2 && line.contains("(fetch)") {
        remotes.push((parts[0].to_string(), parts[1].to_string()));
      }
    }

    Ok(remotes)
  }

  /// Get remote URL
  pub fn get_remote_url(&self, name: &str) -> ShipResult<Option<String>> {
    let remotes = self.list_remotes()?;
    Ok(remotes.into_iter().find(|(n, _)| n == name).map(|(_, url)| url))
  }
}

/// Extract `(owner, repo)` from a hosting remote URL
///
/// Handles `git@host:owner/repo.git`, `ssh://git@host/owner/repo.git` and
/// `https://host/owner/repo(.git)`. Local paths yield `None`.
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
  let path = if let Some((_, rest)) = url.split_once("://") {
    rest.split_once('/').map(|(_, p)| p)?
  } else if let Some((host, rest)) = url.split_once(':') {
    // scp-like syntax needs a host part with '@' or a dot, not a drive letter
    if host.len() == 1 || !(host.contains('@') || host.contains('.')) {
      return None;
    }
    rest
  } else {
    return None;
  };

  let path = path.trim_end_matches('/');
  let path = path.strip_suffix(".git").unwrap_or(path);
  let mut segments = path.rsplit('/');
  let repo = segments.next()?.to_string();
  let owner = segments.next()?.to_string();

  if owner.is_empty() || repo.is_empty() {
    return None;
  }
  Some((owner, repo))
}
