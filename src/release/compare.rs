//! Reproducibility check between the canonical and the published archive
//!
//! Both `.tar.gz` files are gunzipped next to themselves, then the two tar
//! payloads are walked entry by entry. File contents must match exactly and
//! are compared by SHA-256, so neither archive is held in memory. Entry type,
//! permission bits and link targets are compared as well; timestamps and
//! ownership are not, since hosting services rewrite them.
//!
//! A path that appears more than once in either archive is always a
//! difference: extractors disagree on which copy wins.

use crate::core::error::{ResultExt, ShipResult};
use crate::release::artifacts::ArtifactTracker;
use flate2::read::MultiGzDecoder;
use sha2::{Digest, Sha256};
use similar::TextDiff;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Largest file for which a text diff is rendered
const MAX_DIFF_BYTES: u64 = 64 * 1024;

/// One way in which the archives disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Difference {
  OnlyInLocal(PathBuf),
  OnlyInRemote(PathBuf),
  /// The path has more than one entry in the local archive
  DuplicateInLocal(PathBuf),
  /// The path has more than one entry in the remote archive
  DuplicateInRemote(PathBuf),
  /// File bytes differ; `diff` is a unified diff for small text files
  Content { path: PathBuf, diff: Option<String> },
  Metadata { path: PathBuf, detail: String },
}

impl Difference {
  pub fn path(&self) -> &Path {
    match self {
      Difference::OnlyInLocal(p)
      | Difference::OnlyInRemote(p)
      | Difference::DuplicateInLocal(p)
      | Difference::DuplicateInRemote(p) => p,
      Difference::Content { path, .. } | Difference::Metadata { path, .. } => path,
    }
  }

  /// One-line description for reports
  pub fn summary(&self) -> String {
    match self {
      Difference::OnlyInLocal(p) => format!("only in local archive: {}", p.display()),
      Difference::OnlyInRemote(p) => format!("only in remote archive: {}", p.display()),
      Difference::DuplicateInLocal(p) => format!("duplicate entry in local archive: {}", p.display()),
      Difference::DuplicateInRemote(p) => format!("duplicate entry in remote archive: {}", p.display()),
      Difference::Content { path, .. } => format!("content differs: {}", path.display()),
      Difference::Metadata { path, detail } => format!("metadata differs: {} ({})", path.display(), detail),
    }
  }
}

/// Outcome of comparing two archives
#[derive(Debug, Clone, Default)]
pub struct ComparisonResult {
  /// Entries inspected in the local archive
  pub entries: usize,
  pub differences: Vec<Difference>,
}

impl ComparisonResult {
  pub fn is_equivalent(&self) -> bool {
    self.differences.is_empty()
  }

  /// Every path involved in a difference, sorted, each listed once
  pub fn differing_paths(&self) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = self.differences.iter().map(|d| d.path().to_path_buf()).collect();
    paths.dedup();
    paths
  }
}

/// Snapshot of one tar entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct EntrySnapshot {
  kind: u8,
  mode: u32,
  link: Option<PathBuf>,
  size: u64,
  /// SHA-256 of the entry data
  digest: Vec<u8>,
}

/// Every entry of one tar file, keyed by path (first occurrence wins)
#[derive(Debug, Default)]
struct Listing {
  entries: BTreeMap<PathBuf, EntrySnapshot>,
  /// Paths seen again after their first entry
  duplicates: BTreeSet<PathBuf>,
}

/// Gunzip both archives (tracked) and compare their tar payloads
pub fn compare(tracker: &mut ArtifactTracker, local: &Path, remote_copy: &Path) -> ShipResult<ComparisonResult> {
  let local_tar = gunzip_beside(tracker, local)?;
  let remote_tar = gunzip_beside(tracker, remote_copy)?;
  compare_tars(&local_tar, &remote_tar)
}

/// `foo.tar.gz` → `foo.tar`, registered before it is written
fn gunzip_beside(tracker: &mut ArtifactTracker, archive: &Path) -> ShipResult<PathBuf> {
  let target = tracker.register(archive.with_extension(""))?;
  let bytes = gunzip(archive, &target).with_context(|| format!("Failed to decompress {}", archive.display()))?;
  tracing::debug!(archive = %archive.display(), bytes, "decompressed");
  Ok(target)
}

/// Stream-decompress a gzip file, every member of it
pub fn gunzip(src: &Path, dest: &Path) -> io::Result<u64> {
  let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(src)?));
  let mut out = BufWriter::new(File::create(dest)?);
  let bytes = io::copy(&mut decoder, &mut out)?;
  out.flush()?;
  Ok(bytes)
}

/// Compare two uncompressed tar files
pub fn compare_tars(local: &Path, remote: &Path) -> ShipResult<ComparisonResult> {
  let ours = read_entries(local).with_context(|| format!("Failed to read tar archive {}", local.display()))?;
  let theirs = read_entries(remote).with_context(|| format!("Failed to read tar archive {}", remote.display()))?;

  let mut differences = Vec::new();
  let mut changed = Vec::new();

  for path in &ours.duplicates {
    differences.push(Difference::DuplicateInLocal(path.clone()));
  }
  for path in &theirs.duplicates {
    differences.push(Difference::DuplicateInRemote(path.clone()));
  }

  for (path, local_entry) in &ours.entries {
    match theirs.entries.get(path) {
      None => differences.push(Difference::OnlyInLocal(path.clone())),
      Some(remote_entry) => {
        if local_entry.digest != remote_entry.digest {
          changed.push((path.clone(), local_entry.size.max(remote_entry.size)));
        } else if let Some(detail) = metadata_difference(local_entry, remote_entry) {
          differences.push(Difference::Metadata {
            path: path.clone(),
            detail,
          });
        }
      }
    }
  }

  for path in theirs.entries.keys() {
    if !ours.entries.contains_key(path) {
      differences.push(Difference::OnlyInRemote(path.clone()));
    }
  }

  // Only small entries are read back, and only to render their diffs
  let wanted: BTreeSet<PathBuf> = changed
    .iter()
    .filter(|(_, size)| *size <= MAX_DIFF_BYTES)
    .map(|(path, _)| path.clone())
    .collect();
  let (local_data, remote_data) = if wanted.is_empty() {
    (BTreeMap::new(), BTreeMap::new())
  } else {
    (
      read_contents(local, &wanted).with_context(|| format!("Failed to read tar archive {}", local.display()))?,
      read_contents(remote, &wanted).with_context(|| format!("Failed to read tar archive {}", remote.display()))?,
    )
  };

  for (path, _) in changed {
    let diff = match (local_data.get(&path), remote_data.get(&path)) {
      (Some(a), Some(b)) => text_diff(&path, a, b),
      _ => None,
    };
    differences.push(Difference::Content { path, diff });
  }

  differences.sort_by(|a, b| a.path().cmp(b.path()));

  Ok(ComparisonResult {
    entries: ours.entries.len(),
    differences,
  })
}

fn open_tar(path: &Path) -> io::Result<tar::Archive<BufReader<File>>> {
  let mut archive = tar::Archive::new(BufReader::new(File::open(path)?));
  // Keep reading past an end-of-archive marker; a second archive appended
  // behind it is still part of what gets extracted
  archive.set_ignore_zeros(true);
  Ok(archive)
}

fn read_entries(path: &Path) -> io::Result<Listing> {
  let mut archive = open_tar(path)?;
  let mut listing = Listing::default();

  for entry in archive.entries()? {
    let mut entry = entry?;
    let header = entry.header();
    let kind = header.entry_type();

    // pax global headers (git stores the commit id there) describe the
    // archive, not a file
    if kind.is_pax_global_extensions() {
      continue;
    }

    let kind = kind.as_byte();
    let mode = header.mode()?;
    let entry_path = entry.path()?.into_owned();
    let link = entry.link_name()?.map(|l| l.into_owned());

    let mut hasher = Sha256::new();
    let size = io::copy(&mut entry, &mut hasher)?;

    if listing.entries.contains_key(&entry_path) {
      listing.duplicates.insert(entry_path);
      continue;
    }
    listing.entries.insert(
      entry_path,
      EntrySnapshot {
        kind,
        mode,
        link,
        size,
        digest: hasher.finalize().to_vec(),
      },
    );
  }

  Ok(listing)
}

/// Data of the first entry for each path in `wanted`
fn read_contents(path: &Path, wanted: &BTreeSet<PathBuf>) -> io::Result<BTreeMap<PathBuf, Vec<u8>>> {
  let mut archive = open_tar(path)?;
  let mut contents = BTreeMap::new();

  for entry in archive.entries()? {
    let mut entry = entry?;
    if entry.header().entry_type().is_pax_global_extensions() {
      continue;
    }
    let entry_path = entry.path()?.into_owned();
    if !wanted.contains(&entry_path) || contents.contains_key(&entry_path) {
      continue;
    }
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    contents.insert(entry_path, data);
    if contents.len() == wanted.len() {
      break;
    }
  }

  Ok(contents)
}

fn metadata_difference(ours: &EntrySnapshot, theirs: &EntrySnapshot) -> Option<String> {
  if ours.kind != theirs.kind {
    return Some(format!(
      "entry type {:?} vs {:?}",
      ours.kind as char, theirs.kind as char
    ));
  }
  if ours.mode != theirs.mode {
    return Some(format!("mode {:o} vs {:o}", ours.mode, theirs.mode));
  }
  if ours.link != theirs.link {
    return Some(format!("link target {:?} vs {:?}", ours.link, theirs.link));
  }
  None
}

fn text_diff(path: &Path, ours: &[u8], theirs: &[u8]) -> Option<String> {
  let ours = std::str::from_utf8(ours).ok()?;
  let theirs = std::str::from_utf8(theirs).ok()?;

  let local_name = format!("local/{}", path.display());
  let remote_name = format!("remote/{}", path.display());
  let diff = TextDiff::from_lines(ours, theirs);
  let rendered = diff
    .unified_diff()
    .context_radius(3)
    .header(&local_name, &remote_name)
    .to_string();
  Some(rendered)
}
