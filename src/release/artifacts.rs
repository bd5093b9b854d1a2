//! Artifact tracking and terminal cleanup
//!
//! Every file a run creates is registered here *before* it is written, and
//! registration refuses paths that already exist so cleanup can only ever
//! delete what the run produced. The tracker is owned by the run; [`ArtifactTracker::cleanup_all`] is called once
//! when the stages have resolved, and `Drop` repeats it so a panic mid-stage
//! still leaves nothing behind.

use crate::core::error::{ResultExt, ShipError, ShipResult};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Registry of files owned by one pipeline run
#[derive(Debug, Default)]
pub struct ArtifactTracker {
  paths: Vec<PathBuf>,
}

/// What a cleanup pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
  /// Files that existed and were deleted
  pub removed: Vec<PathBuf>,
  /// Files that could not be deleted, with the reason
  pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
  pub fn is_clean(&self) -> bool {
    self.failed.is_empty()
  }
}

impl ArtifactTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Claim a path for this run and record it for removal
  ///
  /// Fails if something the run did not create is already there.
  /// Registering a path this run already owns is harmless.
  pub fn register(&mut self, path: impl Into<PathBuf>) -> ShipResult<PathBuf> {
    let path = path.into();
    if self.paths.contains(&path) {
      return Ok(path);
    }

    if std::fs::symlink_metadata(&path).is_ok() {
      return Err(ShipError::with_help(
        format!("Refusing to overwrite existing file {}", path.display()),
        "Move it out of the way, or point `artifact_dir` in ship.toml at another directory.",
      ));
    }

    debug!(path = %path.display(), "tracking artifact");
    self.paths.push(path.clone());
    Ok(path)
  }

  /// Make sure `dir` exists, tracking whatever part of it this run creates
  pub fn create_dir(&mut self, dir: &Path) -> ShipResult<()> {
    if dir.is_dir() {
      return Ok(());
    }

    // Topmost missing ancestor; removing it removes everything below
    let mut outermost = dir;
    while let Some(parent) = outermost.parent() {
      if parent.as_os_str().is_empty() || parent.exists() {
        break;
      }
      outermost = parent;
    }

    self.register(outermost)?;
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  #[cfg(test)]
  pub fn is_tracked(&self, path: &Path) -> bool {
    self.paths.iter().any(|p| p == path)
  }

  /// Remove every registered file that exists and empty the registry
  ///
  /// Absent files are skipped silently, so a second call is a no-op.
  /// Removal happens in reverse creation order.
  pub fn cleanup_all(&mut self) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in self.paths.drain(..).rev() {
      match remove_path(&path) {
        Ok(true) => report.removed.push(path),
        Ok(false) => {}
        Err(e) => {
          warn!(path = %path.display(), error = %e, "failed to remove artifact");
          report.failed.push((path, e.to_string()));
        }
      }
    }

    report.removed.reverse();
    report
  }
}

impl Drop for ArtifactTracker {
  fn drop(&mut self) {
    if !self.paths.is_empty() {
      let report = self.cleanup_all();
      debug!(removed = report.removed.len(), "cleaned artifacts on drop");
    }
  }
}

/// Delete a file or directory tree; `Ok(false)` if nothing was there
fn remove_path(path: &Path) -> io::Result<bool> {
  let metadata = match std::fs::symlink_metadata(path) {
    Ok(m) => m,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
    Err(e) => return Err(e),
  };

  let result = if metadata.is_dir() {
    std::fs::remove_dir_all(path)
  } else {
    std::fs::remove_file(path)
  };

  match result {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e),
  }
}
