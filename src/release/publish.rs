//! Release creation on the hosting service
//!
//! Publishing is the last stage and the only one allowed to fail softly: by
//! the time it runs the artifacts are verified and signed, so a failure here
//! is reported as a warning and the operator can retry by hand.

use crate::core::config::PublishSection;
use crate::core::error::{ResultExt, ShipResult};
use crate::core::process;
use crate::release::artifacts::ArtifactTracker;
use crate::release::changelog::ChangelogEntry;
use crate::release::tag::Tag;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Result of the publish stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
  Published,
  /// Disabled in ship.toml
  Skipped,
  /// Release tool failed; the run still succeeds
  Warning(String),
}

impl PublishOutcome {
  pub fn is_warning(&self) -> bool {
    matches!(self, PublishOutcome::Warning(_))
  }
}

impl fmt::Display for PublishOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishOutcome::Published => write!(f, "published"),
      PublishOutcome::Skipped => write!(f, "skipped (publish.enabled = false)"),
      PublishOutcome::Warning(reason) => write!(f, "not published: {}", reason),
    }
  }
}

/// Write the changelog body to a tracked notes file
pub fn write_notes(tracker: &mut ArtifactTracker, path: PathBuf, entry: &ChangelogEntry) -> ShipResult<PathBuf> {
  let path = tracker.register(path)?;
  let mut body = entry.body.clone();
  body.push('\n');
  std::fs::write(&path, body).with_context(|| format!("Failed to write release notes {}", path.display()))?;
  Ok(path)
}

/// Create the release for `tag` with the notes file and signature attached
pub fn publish(settings: &PublishSection, tag: &Tag, notes: &Path, signature: &Path) -> PublishOutcome {
  if !settings.enabled {
    return PublishOutcome::Skipped;
  }

  let mut cmd = Command::new(&settings.program);
  cmd
    .args(["release", "create", tag.as_str(), "--title", tag.as_str(), "--notes-file"])
    .arg(notes)
    .arg(signature);

  match process::run(&mut cmd) {
    Ok(output) if output.success() => PublishOutcome::Published,
    Ok(output) => {
      let stderr = output.stderr_text();
      let reason = match output.code {
        Some(code) if stderr.trim().is_empty() => format!("{} exited with status {}", settings.program, code),
        Some(code) => format!("{} exited with status {}: {}", settings.program, code, stderr.trim()),
        None => format!("{} was terminated by a signal", settings.program),
      };
      tracing::warn!(%reason, "publish failed");
      PublishOutcome::Warning(reason)
    }
    Err(e) => {
      let reason = format!("failed to start {}: {}", settings.program, e);
      tracing::warn!(%reason, "publish failed");
      PublishOutcome::Warning(reason)
    }
  }
}
