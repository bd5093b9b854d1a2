//! Error types for tagship with contextual messages and exit codes
//!
//! Every fatal pipeline stage has its own variant so the operator can tell at a
//! glance where a run stopped. Publishing problems are not errors at all: they
//! surface as [`crate::release::publish::PublishOutcome::Warning`].

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for tagship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Release shipped (publish warnings included)
  Success = 0,
  /// Any fatal stage failure
  Failure = 1,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for tagship
#[derive(Debug)]
pub enum ShipError {
  /// Configuration errors (ship.toml, owner/repo detection)
  Config(ConfigError),

  /// No tag describes HEAD
  Resolution(ResolutionError),

  /// Changelog checks failed
  Validation(ValidationError),

  /// `git archive` failed
  Build(BuildError),

  /// Remote tarball could not be retrieved
  Fetch(FetchError),

  /// Local and remote archives diverge
  Reproducibility(ReproducibilityMismatch),

  /// Detached signature could not be produced
  Signing(SigningError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ShipError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ShipError::Message { message, context, help } => ShipError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ShipError::Io(e) => ShipError::Message {
        message: ctx_str,
        context: Some(e.to_string()),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  ///
  /// Every error that reaches `main` is fatal.
  pub fn exit_code(&self) -> ExitCode {
    ExitCode::Failure
  }

  /// Short name of the stage that produced this error
  pub fn stage(&self) -> &'static str {
    match self {
      ShipError::Config(_) => "configuration",
      ShipError::Resolution(_) => "tag resolution",
      ShipError::Validation(_) => "changelog validation",
      ShipError::Build(_) => "archive build",
      ShipError::Fetch(_) => "remote fetch",
      ShipError::Reproducibility(_) => "reproducibility check",
      ShipError::Signing(_) => "signing",
      ShipError::Io(_) | ShipError::Message { .. } => "pipeline",
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ShipError::Config(e) => e.help_message(),
      ShipError::Resolution(e) => e.help_message(),
      ShipError::Validation(e) => e.help_message(),
      ShipError::Fetch(e) => e.help_message(),
      ShipError::Reproducibility(e) => e.help_message(),
      ShipError::Signing(e) => e.help_message(),
      ShipError::Message { help, .. } => help.clone(),
      ShipError::Build(_) | ShipError::Io(_) => None,
    }
  }
}

impl fmt::Display for ShipError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShipError::Config(e) => write!(f, "{}", e),
      ShipError::Resolution(e) => write!(f, "{}", e),
      ShipError::Validation(e) => write!(f, "{}", e),
      ShipError::Build(e) => write!(f, "{}", e),
      ShipError::Fetch(e) => write!(f, "{}", e),
      ShipError::Reproducibility(e) => write!(f, "{}", e),
      ShipError::Signing(e) => write!(f, "{}", e),
      ShipError::Io(e) => write!(f, "I/O error: {}", e),
      ShipError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ShipError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ShipError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ShipError {
  fn from(err: io::Error) -> Self {
    ShipError::Io(err)
  }
}

impl From<String> for ShipError {
  fn from(msg: String) -> Self {
    ShipError::message(msg)
  }
}

impl From<&str> for ShipError {
  fn from(msg: &str) -> Self {
    ShipError::message(msg)
  }
}

impl From<toml_edit::de::Error> for ShipError {
  fn from(err: toml_edit::de::Error) -> Self {
    ShipError::Config(ConfigError::Parse {
      message: err.to_string(),
    })
  }
}

impl From<ConfigError> for ShipError {
  fn from(err: ConfigError) -> Self {
    ShipError::Config(err)
  }
}

impl From<ValidationError> for ShipError {
  fn from(err: ValidationError) -> Self {
    ShipError::Validation(err)
  }
}

impl From<FetchError> for ShipError {
  fn from(err: FetchError) -> Self {
    ShipError::Fetch(err)
  }
}

impl From<SigningError> for ShipError {
  fn from(err: SigningError) -> Self {
    ShipError::Signing(err)
  }
}

impl From<ReproducibilityMismatch> for ShipError {
  fn from(err: ReproducibilityMismatch) -> Self {
    ShipError::Reproducibility(err)
  }
}

impl From<reqwest::Error> for ShipError {
  fn from(err: reqwest::Error) -> Self {
    let url = err.url().map(|u| u.to_string()).unwrap_or_default();
    match err.status() {
      Some(status) => ShipError::Fetch(FetchError::Status {
        url,
        status: status.as_u16(),
      }),
      None => ShipError::Fetch(FetchError::Transport {
        url,
        reason: err.to_string(),
      }),
    }
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// ship.toml could not be parsed
  Parse { message: String },

  /// Field has an unusable value
  Invalid { field: String, reason: String },

  /// Required value is neither configured nor derivable
  MissingField { field: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::MissingField { field } if field == "release.owner" => Some(
        "Set `owner` under [release] in ship.toml, or add an `origin` remote pointing at the hosting service."
          .to_string(),
      ),
      ConfigError::MissingField { field } => Some(format!("Set `{}` in ship.toml.", field)),
      ConfigError::Invalid { field, .. } => Some(format!("Fix `{}` in ship.toml.", field)),
      ConfigError::Parse { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Parse { message } => write!(f, "Failed to parse ship.toml: {}", message),
      ConfigError::Invalid { field, reason } => write!(f, "Invalid value for `{}`: {}", field, reason),
      ConfigError::MissingField { field } => write!(f, "Missing required setting: {}", field),
    }
  }
}

/// Tag resolution errors
#[derive(Debug)]
pub enum ResolutionError {
  /// HEAD carries no tag
  NoTag { stderr: String },

  /// Tag resolves to nothing usable in file names
  EmptyNormalized { tag: String },
}

impl ResolutionError {
  fn help_message(&self) -> Option<String> {
    match self {
      ResolutionError::NoTag { .. } => {
        Some("Check out the release tag (or tag HEAD) before shipping: git tag v1.2.3".to_string())
      }
      ResolutionError::EmptyNormalized { .. } => {
        Some("Release tags must contain a version number, e.g. v1.2.3".to_string())
      }
    }
  }
}

impl fmt::Display for ResolutionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ResolutionError::NoTag { stderr } => {
        write!(f, "No tag describes HEAD")?;
        if !stderr.trim().is_empty() {
          write!(f, "\n{}", stderr.trim_end())?;
        }
        Ok(())
      }
      ResolutionError::EmptyNormalized { tag } => {
        write!(f, "Tag '{}' contains no version digits", tag)
      }
    }
  }
}

/// Changelog validation errors
#[derive(Debug)]
pub enum ValidationError {
  /// Changelog has uncommitted or untracked changes
  DirtyChangelog { path: PathBuf, status: String },

  /// Changelog could not be read
  ChangelogUnreadable { path: PathBuf, reason: String },

  /// No entry matches the tag
  MissingEntry { path: PathBuf, tag: String },

  /// More than one entry matches the tag
  AmbiguousEntry { path: PathBuf, tag: String, lines: Vec<usize> },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::DirtyChangelog { path, .. } => Some(format!(
        "Commit the release notes first: git commit {}",
        path.display()
      )),
      ValidationError::ChangelogUnreadable { .. } => {
        Some("Set `changelog` under [release] in ship.toml if the file lives elsewhere.".to_string())
      }
      ValidationError::MissingEntry { tag, .. } => Some(format!("Add a `## {}` section to the changelog.", tag)),
      ValidationError::AmbiguousEntry { .. } => {
        Some("Keep exactly one changelog section per release; merge or rename the duplicates.".to_string())
      }
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::DirtyChangelog { path, status } => {
        write!(
          f,
          "Changelog {} has uncommitted changes\n{}",
          path.display(),
          status.trim_end()
        )
      }
      ValidationError::ChangelogUnreadable { path, reason } => {
        write!(f, "Cannot read changelog {}: {}", path.display(), reason)
      }
      ValidationError::MissingEntry { path, tag } => {
        write!(f, "No entry for '{}' in {}", tag, path.display())
      }
      ValidationError::AmbiguousEntry { path, tag, lines } => {
        let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        write!(
          f,
          "Multiple entries for '{}' in {} (lines {})",
          tag,
          path.display(),
          lines.join(", ")
        )
      }
    }
  }
}

/// Archive build errors
#[derive(Debug)]
pub struct BuildError {
  pub tag: String,
  pub stderr: String,
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "git archive failed for '{}'\n{}", self.tag, self.stderr.trim_end())
  }
}

/// Remote retrieval errors
#[derive(Debug)]
pub enum FetchError {
  /// Server answered with a non-success status
  Status { url: String, status: u16 },

  /// Connection, TLS or body transfer failed
  Transport { url: String, reason: String },
}

impl FetchError {
  fn help_message(&self) -> Option<String> {
    match self {
      FetchError::Status { status: 404, .. } => {
        Some("Push the tag to the hosting service first: git push origin <tag>".to_string())
      }
      FetchError::Status { .. } => None,
      FetchError::Transport { .. } => Some("Check network access, then re-run tagship.".to_string()),
    }
  }
}

impl fmt::Display for FetchError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FetchError::Status { url, status } => write!(f, "Download of {} failed with HTTP {}", url, status),
      FetchError::Transport { url, reason } => write!(f, "Download of {} failed: {}", url, reason),
    }
  }
}

/// Local and remote archives differ
#[derive(Debug)]
pub struct ReproducibilityMismatch {
  pub paths: Vec<PathBuf>,
}

impl ReproducibilityMismatch {
  fn help_message(&self) -> Option<String> {
    Some("The published tarball does not match the tagged history. Do not ship; investigate the tag.".to_string())
  }
}

impl fmt::Display for ReproducibilityMismatch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Remote archive differs from the canonical archive in {} path(s):",
      self.paths.len()
    )?;
    for path in &self.paths {
      write!(f, "\n  {}", path.display())?;
    }
    Ok(())
  }
}

/// Signing errors
#[derive(Debug)]
pub struct SigningError {
  pub program: String,
  pub stderr: String,
}

impl SigningError {
  fn help_message(&self) -> Option<String> {
    Some(format!(
      "Make sure `{}` has a usable secret key (gpg --list-secret-keys) and a running agent.",
      self.program
    ))
  }
}

impl fmt::Display for SigningError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Signing with {} failed", self.program)?;
    if !self.stderr.trim().is_empty() {
      write!(f, "\n{}", self.stderr.trim_end())?;
    }
    Ok(())
  }
}

/// Result type alias for tagship
pub type ShipResult<T> = Result<T, ShipError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ShipResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ShipError>,
{
  fn context(self, ctx: impl Into<String>) -> ShipResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ShipError) {
  eprintln!("\n❌ {} failed: {}\n", error.stage(), error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
