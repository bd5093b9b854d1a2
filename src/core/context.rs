//! Unified release context - build once, pass everywhere
//!
//! `ShipContext` resolves everything that does not depend on the tag (the
//! repository, its config, owner and name, the artifact directory) before the
//! first pipeline stage runs.

use crate::core::config::{ShipConfig, validate_name};
use crate::core::error::{ConfigError, ShipResult};
use crate::core::vcs::{SystemGit, parse_owner_repo};
use std::path::{Path, PathBuf};

/// Repository-level data shared by every stage
pub struct ShipContext {
  /// Git backend rooted at the working tree
  pub git: SystemGit,

  /// Loaded ship.toml (or defaults)
  pub config: ShipConfig,

  /// Account on the hosting service
  pub owner: String,

  /// Repository name, used in the archive prefix and download URL
  pub repo: String,

  /// Absolute directory for artifacts (may not exist yet)
  pub artifact_dir: PathBuf,
}

impl ShipContext {
  /// Build context from any directory inside the repository
  pub fn build(start: &Path) -> ShipResult<Self> {
    let git = SystemGit::open(start)?;
    let root = git.work_tree().to_path_buf();
    let config = ShipConfig::load(&root)?;

    let origin = match (&config.release.owner, &config.release.repo) {
      (Some(_), Some(_)) => None,
      _ => git.get_remote_url("origin")?.as_deref().and_then(parse_owner_repo),
    };

    let owner = config
      .release
      .owner
      .clone()
      .or_else(|| origin.as_ref().map(|(o, _)| o.clone()))
      .ok_or_else(|| ConfigError::MissingField {
        field: "release.owner".to_string(),
      })?;

    let repo = config
      .release
      .repo
      .clone()
      .or_else(|| origin.as_ref().map(|(_, r)| r.clone()))
      .or_else(|| git.repo_dir_name())
      .ok_or_else(|| ConfigError::MissingField {
        field: "release.repo".to_string(),
      })?;

    validate_name("release.owner", &owner)?;
    validate_name("release.repo", &repo)?;

    // Created by the pipeline, and only once changelog validation has passed
    let artifact_dir = root.join(&config.release.artifact_dir);

    tracing::debug!(%owner, %repo, artifact_dir = %artifact_dir.display(), "context ready");

    Ok(Self {
      git,
      config,
      owner,
      repo,
      artifact_dir,
    })
  }

  /// Repository root as Path reference (convenience)
  pub fn root(&self) -> &Path {
    self.git.work_tree()
  }

  /// Absolute path of the changelog
  pub fn changelog_path(&self) -> PathBuf {
    self.root().join(&self.config.release.changelog)
  }
}
