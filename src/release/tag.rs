//! Release tag resolution and normalization
//!
//! The raw tag (e.g. `v1.4.2`) addresses the commit in git and on the hosting
//! service; the normalized form (`1.4.2`) names files and archive prefixes.

use crate::core::error::{ResolutionError, ShipError, ShipResult};
use crate::core::vcs::SystemGit;
use std::fmt;

/// Release tag as git reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag(String);

/// Tag reduced to digits and dots
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedTag(String);

impl Tag {
  pub fn new(tag: impl Into<String>) -> Self {
    Self(tag.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Normalized form, rejecting tags with no digits at all
  pub fn normalized(&self) -> ShipResult<NormalizedTag> {
    let normalized = normalize(&self.0);
    if !normalized.as_str().chars().any(|c| c.is_ascii_digit()) {
      return Err(ShipError::Resolution(ResolutionError::EmptyNormalized { tag: self.0.clone() }));
    }
    Ok(normalized)
  }
}

impl NormalizedTag {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl fmt::Display for NormalizedTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Keep ASCII digits and `.`, in order; drop everything else
pub fn normalize(tag: &str) -> NormalizedTag {
  NormalizedTag(tag.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect())
}

/// Tag exactly describing HEAD
pub fn resolve(git: &SystemGit) -> ShipResult<Tag> {
  let tag = git.describe_head_tag()?;
  tracing::debug!(%tag, "resolved HEAD tag");
  Ok(Tag::new(tag))
}
