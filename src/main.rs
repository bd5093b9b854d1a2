mod core;
mod release;
mod ui;

use clap::Parser;
use core::context::ShipContext;
use core::error::{ExitCode, ShipError, print_error};
use release::fetch::HttpDownloader;
use release::pipeline::{Pipeline, print_report};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Verify, sign and publish the release tagged on HEAD
///
/// Run from inside the repository. The tarball served by the hosting service
/// is checked against `git archive` of the same tag before it is signed.
#[derive(Parser)]
#[command(name = "tagship")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {}

fn main() {
  let _cli = Cli::parse();
  init_tracing();

  let start = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(ShipError::from(e).context("Failed to get current directory")),
  };

  let ctx = match ShipContext::build(&start) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let downloader = match HttpDownloader::new() {
    Ok(d) if std::io::stderr().is_terminal() => d,
    Ok(d) => d.quiet(),
    Err(e) => handle_error(e),
  };

  match Pipeline::new(&ctx, &downloader).run() {
    Ok(report) => {
      print_report(&report);
      std::process::exit(ExitCode::Success.as_i32());
    }
    Err(e) => handle_error(e),
  }
}

/// Diagnostics go to stderr, filtered by `TAGSHIP_LOG` (default `warn`)
fn init_tracing() {
  let filter = EnvFilter::try_from_env("TAGSHIP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn handle_error(err: ShipError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}
