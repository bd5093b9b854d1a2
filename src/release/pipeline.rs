//! Stage sequencing for one release run
//!
//! Stages run strictly in order and the first failure stops the run. Whatever
//! happens, the artifact tracker is drained exactly once before `run` returns.

use crate::core::context::ShipContext;
use crate::core::error::{ReproducibilityMismatch, ShipResult};
use crate::release::archive::{self, ArtifactNames};
use crate::release::artifacts::{ArtifactTracker, CleanupReport};
use crate::release::changelog::ChangelogValidator;
use crate::release::compare::{self, ComparisonResult, Difference};
use crate::release::fetch::{self, Download};
use crate::release::publish::{self, PublishOutcome};
use crate::release::sign;
use crate::release::tag::{self, NormalizedTag, Tag};

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct ReleaseReport {
  pub tag: Tag,
  pub normalized: NormalizedTag,
  /// Heading of the changelog section that was shipped
  pub entry_title: String,
  pub url: String,
  /// SHA-256 of the published archive
  pub sha256: String,
  pub entries_compared: usize,
  pub publish: PublishOutcome,
  /// Artifacts removed by the final cleanup
  pub removed: usize,
}

/// One release run over a prepared context
pub struct Pipeline<'a> {
  ctx: &'a ShipContext,
  downloader: &'a dyn Download,
}

impl<'a> Pipeline<'a> {
  pub fn new(ctx: &'a ShipContext, downloader: &'a dyn Download) -> Self {
    Self { ctx, downloader }
  }

  /// Run every stage, then clean up
  pub fn run(&self) -> ShipResult<ReleaseReport> {
    let mut tracker = ArtifactTracker::new();
    let result = self.run_stages(&mut tracker);
    tracing::debug!(pending = tracker.len(), ok = result.is_ok(), "stages finished");

    let cleanup = tracker.cleanup_all();
    print_cleanup(&cleanup);

    result.map(|report| ReleaseReport {
      removed: cleanup.removed.len(),
      ..report
    })
  }

  fn run_stages(&self, tracker: &mut ArtifactTracker) -> ShipResult<ReleaseReport> {
    let ctx = self.ctx;

    println!("🏷️  Resolving release tag...");
    let tag = tag::resolve(&ctx.git)?;
    let normalized = tag.normalized()?;
    println!("   {} (version {})", tag, normalized);

    println!("📝 Validating changelog...");
    let validator = ChangelogValidator::new(&ctx.git, ctx.changelog_path());
    let entry = validator.validate(&tag)?;
    println!("   Found '## {}' at line {}", entry.title, entry.line);

    // Nothing touches the disk before this point
    tracker.create_dir(&ctx.artifact_dir)?;
    let names = ArtifactNames::new(&ctx.artifact_dir, &ctx.repo, &normalized);

    println!("📦 Building canonical archive...");
    let local = archive::build(&ctx.git, tracker, &tag, &names)?;
    println!("   {}", local.display());

    let url = fetch::render_url(&ctx.config.remote.url_template, &ctx.owner, &ctx.repo, &tag);
    println!("🌐 Fetching {}", url);
    let fetched = fetch::fetch(self.downloader, tracker, &url, &names)?;
    println!("   {} bytes", fetched.bytes);

    println!("🔍 Comparing archives...");
    let comparison = compare::compare(tracker, &local, &fetched.copy)?;
    if !comparison.is_equivalent() {
      print_differences(&comparison);
      return Err(
        ReproducibilityMismatch {
          paths: comparison.differing_paths(),
        }
        .into(),
      );
    }
    println!("   ✅ {} entries identical", comparison.entries);

    println!("🔏 Signing {}...", fetched.remote.display());
    let signature = sign::sign(&ctx.config.signing, tracker, &fetched.remote)?;
    println!("   {}", signature.display());

    let outcome = if ctx.config.publish.enabled {
      println!("🚀 Publishing release {}...", tag);
      let notes = publish::write_notes(tracker, names.notes(), &entry)?;
      publish::publish(&ctx.config.publish, &tag, &notes, &signature)
    } else {
      PublishOutcome::Skipped
    };

    match &outcome {
      PublishOutcome::Warning(reason) => {
        println!("   ⚠️  Release was not published: {}", reason);
        println!("   Re-run the release tool by hand once the problem is fixed.");
      }
      other => println!("   {}", other),
    }

    Ok(ReleaseReport {
      tag,
      normalized,
      entry_title: entry.title,
      url: fetched.url,
      sha256: fetched.sha256,
      entries_compared: comparison.entries,
      publish: outcome,
      removed: 0,
    })
  }
}

fn print_differences(comparison: &ComparisonResult) {
  println!("   ❌ {} difference(s):", comparison.differences.len());
  for difference in &comparison.differences {
    println!("      {}", difference.summary());
  }
  for difference in &comparison.differences {
    if let Difference::Content { diff: Some(diff), .. } = difference {
      println!();
      print!("{}", diff);
    }
  }
  println!();
}

fn print_cleanup(report: &CleanupReport) {
  if !report.removed.is_empty() {
    println!("🧹 Removed {} intermediate file(s)", report.removed.len());
  }
  if report.is_clean() {
    return;
  }
  for (path, reason) in &report.failed {
    println!("   ⚠️  Could not remove {}: {}", path.display(), reason);
  }
}

/// Final block printed after a successful run
pub fn print_report(report: &ReleaseReport) {
  println!();
  if report.publish.is_warning() {
    println!("⚠️  {} verified and signed, but not published", report.tag);
  } else {
    println!("✅ Shipped {}", report.tag);
  }
  println!("   Version:   {}", report.normalized);
  println!("   Changelog: {}", report.entry_title);
  println!("   Source:    {}", report.url);
  println!("   SHA-256:   {}", report.sha256);
  println!("   Entries:   {}", report.entries_compared);
  println!("   Release:   {}", report.publish);
  println!("   Cleaned:   {} file(s)", report.removed);
}
