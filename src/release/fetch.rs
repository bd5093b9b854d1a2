//! Remote tarball retrieval
//!
//! One blocking GET against the public distribution endpoint, no retry. The
//! body is written to the publishable archive path and then duplicated so the
//! comparator can decompress the copy while the original stays untouched.

use crate::core::error::{FetchError, ResultExt, ShipError, ShipResult};
use crate::release::archive::ArtifactNames;
use crate::release::artifacts::ArtifactTracker;
use crate::release::tag::Tag;
use crate::ui::progress::DownloadProgress;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Network backend for the fetcher
pub trait Download {
  /// Stream the body at `url` into `sink`, returning the byte count
  fn download(&self, url: &str, sink: &mut dyn Write) -> ShipResult<u64>;
}

/// Blocking HTTP backend
pub struct HttpDownloader {
  client: reqwest::blocking::Client,
  show_progress: bool,
}

impl HttpDownloader {
  pub fn new() -> ShipResult<Self> {
    let client = reqwest::blocking::Client::builder()
      .user_agent(concat!("tagship/", env!("CARGO_PKG_VERSION")))
      .timeout(None::<Duration>)
      .build()
      .map_err(ShipError::from)
      .context("Failed to build HTTP client")?;

    Ok(Self {
      client,
      show_progress: true,
    })
  }

  /// Disable the progress bar (non-interactive use)
  pub fn quiet(mut self) -> Self {
    self.show_progress = false;
    self
  }
}

impl Download for HttpDownloader {
  fn download(&self, url: &str, sink: &mut dyn Write) -> ShipResult<u64> {
    debug!(%url, "GET");
    let mut response = self.client.get(url).send()?.error_for_status()?;

    let mut progress = if self.show_progress {
      DownloadProgress::for_length(response.content_length(), "Downloading")
    } else {
      None
    };

    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
      let n = match response.read(&mut buf) {
        Ok(0) => break,
        Ok(n) => n,
        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
        Err(e) => {
          return Err(ShipError::Fetch(FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
          }));
        }
      };
      sink.write_all(&buf[..n])?;
      total += n as u64;
      if let Some(progress) = progress.as_mut() {
        progress.inc(n);
      }
    }

    debug!(%url, bytes = total, "download complete");
    Ok(total)
  }
}

/// Fill `{owner}`, `{repo}` and `{tag}` in a URL template
pub fn render_url(template: &str, owner: &str, repo: &str, tag: &Tag) -> String {
  template
    .replace("{owner}", owner)
    .replace("{repo}", repo)
    .replace("{tag}", tag.as_str())
}

/// Files produced by a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedArchives {
  pub url: String,
  /// Untouched download, signed and referenced by the release
  pub remote: PathBuf,
  /// Byte-identical copy handed to the comparator
  pub copy: PathBuf,
  pub bytes: u64,
  /// Hex SHA-256 of the download
  pub sha256: String,
}

/// Download the public tarball and duplicate it
pub fn fetch(
  downloader: &dyn Download,
  tracker: &mut ArtifactTracker,
  url: &str,
  names: &ArtifactNames,
) -> ShipResult<FetchedArchives> {
  let remote = tracker.register(names.remote_archive())?;
  let bytes = {
    let file = File::create(&remote).with_context(|| format!("Failed to create {}", remote.display()))?;
    let mut writer = BufWriter::new(file);
    let bytes = downloader.download(url, &mut writer)?;
    writer
      .flush()
      .with_context(|| format!("Failed to write {}", remote.display()))?;
    bytes
  };

  let copy = tracker.register(names.remote_copy())?;
  std::fs::copy(&remote, &copy).with_context(|| format!("Failed to copy {}", remote.display()))?;

  let mut hasher = Sha256::new();
  io::copy(&mut File::open(&remote)?, &mut hasher)?;
  let sha256 = format!("{:x}", hasher.finalize());

  Ok(FetchedArchives {
    url: url.to_string(),
    remote,
    copy,
    bytes,
    sha256,
  })
}
