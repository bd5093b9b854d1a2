//! Changelog validation
//!
//! The changelog is Markdown with one `## ` section per release:
//!
//! ```markdown
//! # Changelog
//!
//! ## [2.0.0] - 2025-01-15
//! - Breaking: new archive layout
//!
//! ## v1.4.2
//! - Fix checksum output
//! ```
//!
//! A section belongs to a tag when one of its heading tokens equals the tag
//! (`v2.0.0`) or its normalized form (`2.0.0`).

use crate::core::error::{ShipResult, ValidationError};
use crate::core::vcs::SystemGit;
use crate::release::tag::{Tag, normalize};
use std::path::{Path, PathBuf};

/// Release notes for one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
  /// Heading text without the `## ` marker
  pub title: String,
  /// Section body, trimmed
  pub body: String,
  /// 1-based line number of the heading
  pub line: usize,
}

/// Checks the changelog working copy and extracts the tag's entry
pub struct ChangelogValidator<'a> {
  git: &'a SystemGit,
  path: PathBuf,
}

impl<'a> ChangelogValidator<'a> {
  pub fn new(git: &'a SystemGit, path: impl Into<PathBuf>) -> Self {
    Self { git, path: path.into() }
  }

  /// Require a committed changelog with exactly one entry for `tag`
  pub fn validate(&self, tag: &Tag) -> ShipResult<ChangelogEntry> {
    let status = self.git.path_status(&self.path)?;
    if !status.trim().is_empty() {
      return Err(
        ValidationError::DirtyChangelog {
          path: self.display_path(),
          status,
        }
        .into(),
      );
    }

    let content = std::fs::read_to_string(&self.path).map_err(|e| ValidationError::ChangelogUnreadable {
      path: self.display_path(),
      reason: e.to_string(),
    })?;

    let entry = find_entry(&content, tag).map_err(|e| e.at(self.display_path()))?;
    tracing::debug!(title = %entry.title, line = entry.line, "changelog entry found");
    Ok(entry)
  }

  /// Path relative to the repository root when possible
  fn display_path(&self) -> PathBuf {
    self
      .path
      .strip_prefix(self.git.work_tree())
      .map(Path::to_path_buf)
      .unwrap_or_else(|_| self.path.clone())
  }
}

/// Lookup failure before the changelog path is attached
#[derive(Debug, PartialEq, Eq)]
pub enum LookupError {
  Missing { tag: String },
  Ambiguous { tag: String, lines: Vec<usize> },
}

impl LookupError {
  fn at(self, path: PathBuf) -> ValidationError {
    match self {
      LookupError::Missing { tag } => ValidationError::MissingEntry { path, tag },
      LookupError::Ambiguous { tag, lines } => ValidationError::AmbiguousEntry { path, tag, lines },
    }
  }
}

/// Split Markdown into `## ` sections
pub fn parse_entries(content: &str) -> Vec<ChangelogEntry> {
  let mut entries = Vec::new();
  let mut current: Option<(String, usize, Vec<&str>)> = None;

  for (idx, line) in content.lines().enumerate() {
    if let Some(title) = line.strip_prefix("## ") {
      if let Some((title, line, body)) = current.take() {
        entries.push(finish_entry(title, line, &body));
      }
      current = Some((title.trim().to_string(), idx + 1, Vec::new()));
    } else if let Some((_, _, body)) = current.as_mut() {
      body.push(line);
    }
  }

  if let Some((title, line, body)) = current {
    entries.push(finish_entry(title, line, &body));
  }

  entries
}

fn finish_entry(title: String, line: usize, body: &[&str]) -> ChangelogEntry {
  ChangelogEntry {
    title,
    body: body.join("\n").trim().to_string(),
    line,
  }
}

/// Does this heading name the tag?
pub fn heading_matches(title: &str, tag: &Tag) -> bool {
  let normalized = normalize(tag.as_str());
  title
    .split(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | ':' | ','))
    .filter(|token| !token.is_empty())
    .any(|token| token == tag.as_str() || (!normalized.as_str().is_empty() && token == normalized.as_str()))
}

/// The single entry for `tag`
pub fn find_entry(content: &str, tag: &Tag) -> Result<ChangelogEntry, LookupError> {
  let mut matches: Vec<ChangelogEntry> = parse_entries(content)
    .into_iter()
    .filter(|entry| heading_matches(&entry.title, tag))
    .collect();

  match matches.len() {
    0 => Err(LookupError::Missing {
      tag: tag.as_str().to_string(),
    }),
    1 => Ok(matches.remove(0)),
    _ => Err(LookupError::Ambiguous {
      tag: tag.as_str().to_string(),
      lines: matches.iter().map(|e| e.line).collect(),
    }),
  }
}
