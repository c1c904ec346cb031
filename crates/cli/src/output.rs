//! CLI output formatting utilities.
//!
//! Colored status messages and action symbols shared by the commands.

use std::time::{Duration, UNIX_EPOCH};

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use partplan_lib::consts::MAX_COMPLETED_AT;
use partplan_lib::sequencer::{Action, ActionKind};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
  pub const RUN: &str = "+";
  pub const RERUN: &str = "~";
  pub const SKIP: &str = "=";
}

/// Seconds since the epoch as an RFC 3339 timestamp, or the raw seconds when
/// the value is past what RFC 3339 can express.
pub fn format_timestamp(secs: u64) -> String {
  if secs > MAX_COMPLETED_AT {
    return format!("{}s", secs);
  }
  match UNIX_EPOCH.checked_add(Duration::from_secs(secs)) {
    Some(time) => humantime::format_rfc3339_seconds(time).to_string(),
    None => format!("{}s", secs),
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// One line per action: symbol, `part:step` and the reason.
pub fn print_action(action: &Action) {
  let target = format!("{}:{}", action.part, action.step);
  let reason = format!("({})", action.reason);
  let symbol = match action.kind {
    ActionKind::Run => format!("{}", symbols::RUN.if_supports_color(Stream::Stdout, |s| s.green())),
    ActionKind::Rerun => format!("{}", symbols::RERUN.if_supports_color(Stream::Stdout, |s| s.yellow())),
    ActionKind::Skip => format!("{}", symbols::SKIP.if_supports_color(Stream::Stdout, |s| s.dimmed())),
  };
  println!(
    "  {} {:<7} {} {}",
    symbol,
    action.kind.to_string(),
    target,
    reason.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
