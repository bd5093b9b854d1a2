use crate::core::error::{ConfigError, ResultExt, ShipResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default download endpoint (GitHub's tarball host)
pub const DEFAULT_URL_TEMPLATE: &str = "https://codeload.github.com/{owner}/{repo}/tar.gz/{tag}";

/// Configuration for tagship
/// Searched in order: ship.toml, .ship.toml, .config/ship.toml
///
/// Every section is optional; a repository without a config file ships with
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipConfig {
  #[serde(default)]
  pub release: ReleaseSection,
  #[serde(default)]
  pub remote: RemoteSection,
  #[serde(default)]
  pub signing: SigningSection,
  #[serde(default)]
  pub publish: PublishSection,
}

/// What is being released and where intermediate files go
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseSection {
  /// Account owning the repository on the hosting service
  /// (default: parsed from the `origin` remote)
  #[serde(default)]
  pub owner: Option<String>,

  /// Repository name (default: name of the working tree directory)
  #[serde(default)]
  pub repo: Option<String>,

  /// Changelog path relative to the repository root
  #[serde(default = "default_changelog")]
  pub changelog: PathBuf,

  /// Where artifacts are written, relative to the repository root
  #[serde(default = "default_artifact_dir")]
  pub artifact_dir: PathBuf,
}

fn default_changelog() -> PathBuf {
  PathBuf::from("CHANGELOG.md")
}

fn default_artifact_dir() -> PathBuf {
  PathBuf::from(".")
}

impl Default for ReleaseSection {
  fn default() -> Self {
    Self {
      owner: None,
      repo: None,
      changelog: default_changelog(),
      artifact_dir: default_artifact_dir(),
    }
  }
}

/// Public distribution endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSection {
  /// Download URL with `{owner}`, `{repo}` and `{tag}` placeholders
  #[serde(default = "default_url_template")]
  pub url_template: String,
}

fn default_url_template() -> String {
  DEFAULT_URL_TEMPLATE.to_string()
}

impl Default for RemoteSection {
  fn default() -> Self {
    Self {
      url_template: default_url_template(),
    }
  }
}

/// Detached signature tool
#[derive(Debug, Clone, Deserialize)]
pub struct SigningSection {
  /// gpg-compatible program
  #[serde(default = "default_signing_program")]
  pub program: String,

  /// Key passed as `--local-user` (default: the tool's default key)
  #[serde(default)]
  pub key: Option<String>,
}

fn default_signing_program() -> String {
  "gpg".to_string()
}

impl Default for SigningSection {
  fn default() -> Self {
    Self {
      program: default_signing_program(),
      key: None,
    }
  }
}

/// Release-hosting CLI
#[derive(Debug, Clone, Deserialize)]
pub struct PublishSection {
  /// gh-compatible program
  #[serde(default = "default_publish_program")]
  pub program: String,

  /// Set to false to stop after signing
  #[serde(default = "default_true")]
  pub enabled: bool,
}

fn default_publish_program() -> String {
  "gh".to_string()
}

fn default_true() -> bool {
  true
}

impl Default for PublishSection {
  fn default() -> Self {
    Self {
      program: default_publish_program(),
      enabled: true,
    }
  }
}

impl ShipConfig {
  /// Find config file in search order: ship.toml, .ship.toml, .config/ship.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("ship.toml"),
      path.join(".ship.toml"),
      path.join(".config").join("ship.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from the repository root, falling back to defaults
  pub fn load(path: &Path) -> ShipResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content)?;
    tracing::debug!(path = %config_path.display(), "loaded config");
    Ok(config)
  }

  /// Parse and validate config text
  pub fn parse(content: &str) -> ShipResult<Self> {
    let config: ShipConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Validate field values that serde cannot check
  pub fn validate(&self) -> ShipResult<()> {
    if !self.remote.url_template.contains("{tag}") {
      return Err(
        ConfigError::Invalid {
          field: "remote.url_template".to_string(),
          reason: "must contain the {tag} placeholder".to_string(),
        }
        .into(),
      );
    }

    for (field, value) in [("release.owner", &self.release.owner), ("release.repo", &self.release.repo)] {
      if let Some(value) = value {
        validate_name(field, value)?;
      }
    }

    if self.signing.program.trim().is_empty() {
      return Err(ConfigError::MissingField {
        field: "signing.program".to_string(),
      }
      .into());
    }

    if self.publish.enabled && self.publish.program.trim().is_empty() {
      return Err(ConfigError::MissingField {
        field: "publish.program".to_string(),
      }
      .into());
    }

    Ok(())
  }
}

/// Owner and repository names end up in URLs and file names
pub fn validate_name(field: &str, value: &str) -> ShipResult<()> {
  if value.is_empty() || value.contains('/') || value.contains('\\') || value == "." || value == ".." {
    return Err(
      ConfigError::Invalid {
        field: field.to_string(),
        reason: format!("'{}' is not a valid name", value),
      }
      .into(),
    );
  }
  Ok(())
}
