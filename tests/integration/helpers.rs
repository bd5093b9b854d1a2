//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TAG: &str = "v2.0.0";
pub const PREFIX: &str = "widget-2.0.0/";

pub const CHANGELOG: &str = "# Changelog

## v2.0.0 - 2025-01-15
- Reproducible tarballs
- Detached signatures

## v1.0.0
- First release
";

/// A tagged repository plus directories for artifacts and tool stand-ins
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
  _out: TempDir,
  pub out: PathBuf,
  _tools: TempDir,
  pub tools: PathBuf,
}

impl TestRepo {
  /// Repository with the default changelog, HEAD tagged `v2.0.0`
  pub fn new() -> Result<Self> {
    Self::with_changelog(CHANGELOG)
  }

  pub fn with_changelog(changelog: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    let out = TempDir::new()?;
    let tools = TempDir::new()?;

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;
    git(&path, &["config", "tag.gpgsign", "false"])?;

    std::fs::write(path.join("CHANGELOG.md"), changelog)?;
    std::fs::write(path.join("README.md"), "# widget\n\nA small tool.\n")?;
    std::fs::create_dir_all(path.join("src"))?;
    std::fs::write(path.join("src/main.c"), "int main(void) { return 0; }\n")?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Release 2.0.0"])?;
    git(&path, &["tag", TAG])?;

    Ok(Self {
      _root: root,
      path,
      out: out.path().to_path_buf(),
      _out: out,
      tools: tools.path().to_path_buf(),
      _tools: tools,
    })
  }

  /// Write ship.toml (left untracked, outside the tagged tree)
  pub fn write_config(&self, url_template: &str, publish_enabled: bool) -> Result<()> {
    let config = format!(
      r#"[release]
owner = "acme"
repo = "widget"
artifact_dir = '{}'

[remote]
url_template = '{}'

[signing]
program = '{}'
key = "0xT3ST"

[publish]
program = '{}'
enabled = {}
"#,
      self.out.display(),
      url_template,
      self.tools.join("signer.sh").display(),
      self.tools.join("publisher.sh").display(),
      publish_enabled
    );
    std::fs::write(self.path.join("ship.toml"), config)?;
    Ok(())
  }

  /// Signer stand-in: records its arguments and writes `<last arg>.asc`
  pub fn install_signer(&self) -> Result<()> {
    self.write_tool(
      "signer.sh",
      &format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{log}'\nfor last; do :; done\necho '-----BEGIN PGP SIGNATURE-----' > \"$last.asc\"\n",
        log = self.tools.join("signer.args").display()
      ),
    )
  }

  /// Signer stand-in that writes half a signature, then fails
  pub fn install_failing_signer(&self) -> Result<()> {
    self.write_tool(
      "signer.sh",
      &format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{log}'\nfor last; do :; done\necho partial > \"$last.asc\"\necho 'gpg: signing failed: No secret key' >&2\nexit 2\n",
        log = self.tools.join("signer.args").display()
      ),
    )
  }

  /// Release-tool stand-in: records arguments, keeps a copy of the notes and
  /// notes whether the signature existed when it ran
  pub fn install_publisher(&self) -> Result<()> {
    self.write_tool(
      "publisher.sh",
      &format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{log}'\ncp \"$7\" '{notes}'\ntest -f \"$8\" && cp \"$8\" '{sig}'\nexit 0\n",
        log = self.tools.join("publisher.args").display(),
        notes = self.tools.join("notes.copy").display(),
        sig = self.tools.join("signature.copy").display()
      ),
    )
  }

  pub fn install_failing_publisher(&self) -> Result<()> {
    self.write_tool(
      "publisher.sh",
      &format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{log}'\necho 'HTTP 422: Validation Failed' >&2\nexit 1\n",
        log = self.tools.join("publisher.args").display()
      ),
    )
  }

  #[cfg(unix)]
  fn write_tool(&self, name: &str, script: &str) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let path = self.tools.join(name);
    std::fs::write(&path, script)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
  }

  #[cfg(not(unix))]
  fn write_tool(&self, _name: &str, _script: &str) -> Result<()> {
    anyhow::bail!("tool stand-ins need a POSIX shell")
  }

  /// Arguments a stand-in tool was called with, if it ran
  pub fn tool_args(&self, tool: &str) -> Option<Vec<String>> {
    let log = self.tools.join(format!("{}.args", tool));
    std::fs::read_to_string(log)
      .ok()
      .map(|s| s.lines().map(String::from).collect())
  }

  pub fn read_tool_file(&self, name: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.tools.join(name))?)
  }

  /// `git archive` bytes for `rev`, laid out like the hosting service serves them
  pub fn archive(&self, rev: &str) -> Result<Vec<u8>> {
    let prefix = format!("--prefix={}", PREFIX);
    let output = git(&self.path, &["archive", "--format=tar.gz", &prefix, rev])?;
    Ok(output.stdout)
  }

  /// Commit a change on top of the tag, returning the commit SHA
  pub fn commit_change(&self, file: &str, content: &str, message: &str) -> Result<String> {
    std::fs::write(self.path.join(file), content)?;
    git(&self.path, &["add", file])?;
    git(&self.path, &["commit", "-m", message])?;
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Files left in the artifact directory
  pub fn leftovers(&self) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&self.out)? {
      files.push(entry?.path());
    }
    files.sort();
    Ok(files)
  }

  pub fn modify_file(&self, file: &str, content: &str) -> Result<()> {
    std::fs::write(self.path.join(file), content)?;
    Ok(())
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Canned HTTP reply
pub enum Reply {
  Archive(Vec<u8>),
  NotFound,
}

/// Loopback HTTP server answering every request with the same reply
pub struct TestServer {
  pub port: u16,
  requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
  pub fn start(reply: Reply) -> Result<Self> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    let (status, body) = match reply {
      Reply::Archive(bytes) => ("200 OK", bytes),
      Reply::NotFound => ("404 Not Found", b"404: Not Found".to_vec()),
    };

    std::thread::spawn(move || {
      for stream in listener.incoming() {
        let Ok(mut stream) = stream else { continue };

        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
          match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
          }
        }

        let request_line = String::from_utf8_lossy(&head).lines().next().unwrap_or("").to_string();
        seen.lock().unwrap().push(request_line);

        let header = format!(
          "HTTP/1.1 {}\r\nContent-Type: application/x-gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
          status,
          body.len()
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
      }
    });

    Ok(Self { port, requests })
  }

  /// URL template with the usual placeholders, pointed at this server
  pub fn url_template(&self) -> String {
    format!("http://127.0.0.1:{}/{{owner}}/{{repo}}/tar.gz/{{tag}}", self.port)
  }

  /// Request lines received so far
  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().unwrap().clone()
  }
}

/// Run tagship in `cwd`; the caller inspects the exit status
pub fn run_tagship(cwd: &Path) -> Result<Output> {
  let tagship_bin = env!("CARGO_BIN_EXE_tagship");

  let mut cmd = Command::new(tagship_bin);
  cmd.current_dir(cwd);
  for var in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"] {
    cmd.env_remove(var);
  }

  cmd.output().context("Failed to run tagship")
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
