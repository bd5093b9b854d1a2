//! End-to-end runs of the `tagship` binary

use crate::helpers::{PREFIX, Reply, TAG, TestRepo, TestServer, run_tagship, stderr, stdout};
use anyhow::Result;

/// Repo with working stand-ins and a server serving the tag's own archive
fn ready_repo() -> Result<(TestRepo, TestServer)> {
  let repo = TestRepo::new()?;
  repo.install_signer()?;
  repo.install_publisher()?;
  let server = TestServer::start(Reply::Archive(repo.archive(TAG)?))?;
  repo.write_config(&server.url_template(), true)?;
  Ok((repo, server))
}

#[test]
fn test_ship_happy_path() -> Result<()> {
  let (repo, server) = ready_repo()?;

  let output = run_tagship(&repo.path)?;
  assert!(
    output.status.success(),
    "tagship failed\nstdout: {}\nstderr: {}",
    stdout(&output),
    stderr(&output)
  );
  assert!(stdout(&output).contains("Shipped v2.0.0"));

  // Fetched from the rendered template
  assert_eq!(server.requests(), vec!["GET /acme/widget/tar.gz/v2.0.0 HTTP/1.1".to_string()]);

  // Signed the downloaded archive with the configured key
  let signer_args = repo.tool_args("signer").expect("signer was not invoked");
  assert_eq!(
    &signer_args[..6],
    &["--batch", "--yes", "--armor", "--detach-sign", "--local-user", "0xT3ST"]
  );
  assert_eq!(signer_args[6], repo.out.join("widget-2.0.0.tar.gz").display().to_string());

  // Published with notes and signature
  let publish_args = repo.tool_args("publisher").expect("publisher was not invoked");
  assert_eq!(&publish_args[..6], &["release", "create", "v2.0.0", "--title", "v2.0.0", "--notes-file"]);
  assert_eq!(publish_args[6], repo.out.join("widget-2.0.0.notes.md").display().to_string());
  assert_eq!(publish_args[7], repo.out.join("widget-2.0.0.tar.gz.asc").display().to_string());

  let notes = repo.read_tool_file("notes.copy")?;
  assert_eq!(notes, "- Reproducible tarballs\n- Detached signatures\n");
  assert!(repo.read_tool_file("signature.copy")?.contains("BEGIN PGP SIGNATURE"));

  // Nothing left behind
  assert_eq!(repo.leftovers()?, Vec::<std::path::PathBuf>::new());
  Ok(())
}

#[test]
fn test_dirty_changelog_aborts_before_any_work() -> Result<()> {
  let (repo, server) = ready_repo()?;
  repo.modify_file("CHANGELOG.md", "# Changelog\n\n## v2.0.0\n- Edited after tagging\n")?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("CHANGELOG.md has uncommitted changes"));

  assert!(server.requests().is_empty());
  assert!(repo.tool_args("signer").is_none());
  assert!(repo.leftovers()?.is_empty());
  Ok(())
}

#[test]
fn test_untracked_changelog_is_dirty() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.install_signer()?;
  repo.install_publisher()?;
  let server = TestServer::start(Reply::NotFound)?;
  repo.write_config(&server.url_template(), true)?;

  let notes_dir = repo.path.join("docs");
  std::fs::create_dir_all(&notes_dir)?;
  std::fs::write(notes_dir.join("CHANGES.md"), "## v2.0.0\n- Untracked\n")?;
  let config = std::fs::read_to_string(repo.path.join("ship.toml"))?;
  std::fs::write(
    repo.path.join("ship.toml"),
    config.replace("[release]\n", "[release]\nchangelog = \"docs/CHANGES.md\"\n"),
  )?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("uncommitted changes"));
  assert!(server.requests().is_empty());
  Ok(())
}

#[test]
fn test_remote_mismatch_aborts_without_signing() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.install_signer()?;
  repo.install_publisher()?;

  // Archive of a different commit under the same prefix
  repo.commit_change("README.md", "# widget\n\nTampered.\n", "Tamper")?;
  let other = repo.archive("HEAD")?;
  crate::helpers::git(&repo.path, &["reset", "--hard", TAG])?;

  let server = TestServer::start(Reply::Archive(other))?;
  repo.write_config(&server.url_template(), true)?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));

  let err = stderr(&output);
  assert!(err.contains("reproducibility check failed"), "stderr: {}", err);
  assert!(err.contains(&format!("{}README.md", PREFIX)));

  let out = stdout(&output);
  assert!(out.contains("-A small tool."));
  assert!(out.contains("+Tampered."));

  assert!(repo.tool_args("signer").is_none());
  assert!(repo.tool_args("publisher").is_none());
  assert!(repo.leftovers()?.is_empty());
  Ok(())
}

#[test]
fn test_signing_failure_removes_partial_signature() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.install_failing_signer()?;
  repo.install_publisher()?;
  let server = TestServer::start(Reply::Archive(repo.archive(TAG)?))?;
  repo.write_config(&server.url_template(), true)?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("signing failed"), "stderr: {}", err);
  assert!(err.contains("No secret key"));

  assert!(repo.tool_args("signer").is_some());
  assert!(repo.tool_args("publisher").is_none());
  assert!(repo.leftovers()?.is_empty());
  Ok(())
}

#[test]
fn test_publish_failure_is_a_warning() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.install_signer()?;
  repo.install_failing_publisher()?;
  let server = TestServer::start(Reply::Archive(repo.archive(TAG)?))?;
  repo.write_config(&server.url_template(), true)?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

  let out = stdout(&output);
  assert!(out.contains("Release was not published"));
  assert!(out.contains("Validation Failed"));
  assert!(repo.leftovers()?.is_empty());
  Ok(())
}

#[test]
fn test_publish_disabled_skips_release_tool() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.install_signer()?;
  repo.install_publisher()?;
  let server = TestServer::start(Reply::Archive(repo.archive(TAG)?))?;
  repo.write_config(&server.url_template(), false)?;

  let output = run_tagship(&repo.path)?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert!(stdout(&output).contains("skipped"));
  assert!(repo.tool_args("signer").is_some());
  assert!(repo.tool_args("publisher").is_none());
  assert!(repo.leftovers()?.is_empty());
  Ok(())
}

#[test]
fn test_missing_remote_archive() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.install_signer()?;
  repo.install_publisher()?;
  let server = TestServer::start(Reply::NotFound)?;
  repo.write_config(&server.url_template(), true)?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("HTTP 404"), "stderr: {}", err);
  assert!(err.contains("git push"));

  assert!(repo.tool_args("signer").is_none());
  assert!(repo.leftovers()?.is_empty());
  Ok(())
}

#[test]
fn test_existing_artifact_is_never_overwritten() -> Result<()> {
  let (repo, server) = ready_repo()?;
  let existing = repo.out.join("widget-2.0.0.tar.gz");
  std::fs::write(&existing, b"signed by hand last week")?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("Refusing to overwrite"), "stderr: {}", err);

  assert!(server.requests().is_empty());
  assert!(repo.tool_args("signer").is_none());
  assert_eq!(std::fs::read(&existing)?, b"signed by hand last week");
  assert_eq!(repo.leftovers()?, vec![existing]);
  Ok(())
}

#[test]
fn test_untagged_head() -> Result<()> {
  let (repo, server) = ready_repo()?;
  repo.commit_change("README.md", "# widget\n\nWork in progress.\n", "WIP")?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("No tag describes HEAD"));
  assert!(server.requests().is_empty());
  assert!(repo.leftovers()?.is_empty());
  Ok(())
}

#[test]
fn test_missing_changelog_entry() -> Result<()> {
  let repo = TestRepo::with_changelog("# Changelog\n\n## v1.0.0\n- First release\n")?;
  repo.install_signer()?;
  repo.install_publisher()?;
  let server = TestServer::start(Reply::NotFound)?;
  repo.write_config(&server.url_template(), true)?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("No entry for 'v2.0.0' in CHANGELOG.md"));
  assert!(server.requests().is_empty());
  Ok(())
}

#[test]
fn test_ambiguous_changelog_entry() -> Result<()> {
  let repo = TestRepo::with_changelog("# Changelog\n\n## v2.0.0\n- One\n\n## [2.0.0]\n- Two\n")?;
  repo.install_signer()?;
  repo.install_publisher()?;
  let server = TestServer::start(Reply::NotFound)?;
  repo.write_config(&server.url_template(), true)?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Multiple entries for 'v2.0.0' in CHANGELOG.md (lines 3, 6)"));
  assert!(server.requests().is_empty());
  Ok(())
}

#[test]
fn test_malformed_config_is_reported() -> Result<()> {
  let repo = TestRepo::new()?;
  std::fs::write(repo.path.join("ship.toml"), "[release\nowner = \"acme\"\n")?;

  let output = run_tagship(&repo.path)?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Failed to parse ship.toml"));
  Ok(())
}
