//! Canonical archive built straight from git history

use crate::core::error::ShipResult;
use crate::core::vcs::SystemGit;
use crate::release::artifacts::ArtifactTracker;
use crate::release::tag::{NormalizedTag, Tag};
use std::path::{Path, PathBuf};

/// File names for one release's artifacts
#[derive(Debug, Clone)]
pub struct ArtifactNames {
  dir: PathBuf,
  stem: String,
}

impl ArtifactNames {
  /// `<dir>/<repo>-<normalized>.*`
  pub fn new(dir: &Path, repo: &str, normalized: &NormalizedTag) -> Self {
    Self {
      dir: dir.to_path_buf(),
      stem: format!("{}-{}", repo, normalized),
    }
  }

  /// Directory prefix inside the archive, trailing slash included
  pub fn archive_prefix(&self) -> String {
    format!("{}/", self.stem)
  }

  pub fn local_archive(&self) -> PathBuf {
    self.dir.join(format!("{}.local.tar.gz", self.stem))
  }

  /// Downloaded archive, the one that gets signed
  pub fn remote_archive(&self) -> PathBuf {
    self.dir.join(format!("{}.tar.gz", self.stem))
  }

  pub fn remote_copy(&self) -> PathBuf {
    self.dir.join(format!("{}.remote.tar.gz", self.stem))
  }

  pub fn notes(&self) -> PathBuf {
    self.dir.join(format!("{}.notes.md", self.stem))
  }
}

/// Run `git archive` for `tag` into the local archive path
///
/// The output path is tracked before git starts writing it.
pub fn build(
  git: &SystemGit,
  tracker: &mut ArtifactTracker,
  tag: &Tag,
  names: &ArtifactNames,
) -> ShipResult<PathBuf> {
  let out = tracker.register(names.local_archive())?;
  git.archive_tar_gz(tag.as_str(), &names.archive_prefix(), &out)?;
  tracing::debug!(path = %out.display(), "built canonical archive");
  Ok(out)
}
