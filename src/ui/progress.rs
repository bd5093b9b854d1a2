//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free progress bars drawn on stderr.

use linya::{Bar, Progress};

/// Byte-count progress bar for a single download
pub struct DownloadProgress {
  progress: Progress,
  bar: Bar,
}

impl DownloadProgress {
  /// Create a bar when the total size is known
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self { progress, bar }
  }

  /// Only draw a bar when the server announced a length
  pub fn for_length(total: Option<u64>, label: impl Into<String>) -> Option<Self> {
    total
      .filter(|t| *t > 0)
      .and_then(|t| usize::try_from(t).ok())
      .map(|t| Self::new(t, label))
  }

  /// Advance by `bytes`
  pub fn inc(&mut self, bytes: usize) {
    self.progress.inc_and_draw(&self.bar, bytes);
  }
}
