//! Detached signatures for the publishable archive

use crate::core::config::SigningSection;
use crate::core::error::{ShipResult, SigningError};
use crate::core::process;
use crate::release::artifacts::ArtifactTracker;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// `<artifact>.asc`
pub fn signature_path(artifact: &Path) -> PathBuf {
  let mut name = OsString::from(artifact.as_os_str());
  name.push(".asc");
  PathBuf::from(name)
}

/// Sign `artifact` with the configured program
///
/// The signature path is tracked before the signer starts, so a half-written
/// `.asc` from a failed run is removed with everything else.
pub fn sign(settings: &SigningSection, tracker: &mut ArtifactTracker, artifact: &Path) -> ShipResult<PathBuf> {
  let signature = tracker.register(signature_path(artifact))?;

  let mut cmd = Command::new(&settings.program);
  cmd.args(["--batch", "--yes", "--armor", "--detach-sign"]);
  if let Some(key) = &settings.key {
    cmd.arg("--local-user").arg(key);
  }
  cmd.arg(artifact);

  let output = process::run(&mut cmd).map_err(|e| SigningError {
    program: settings.program.clone(),
    stderr: format!("failed to start: {}", e),
  })?;

  if !output.success() {
    return Err(
      SigningError {
        program: settings.program.clone(),
        stderr: output.stderr_text(),
      }
      .into(),
    );
  }

  if !signature.exists() {
    return Err(
      SigningError {
        program: settings.program.clone(),
        stderr: format!("exited successfully but {} was not written", signature.display()),
      }
      .into(),
    );
  }

  Ok(signature)
}
