//! Terminal output for dockyard commands.
//!
//! Text output is a status line followed by indented detail rows. Failures
//! and warnings go to stderr so `--format json` keeps stdout parseable.

use std::fmt::Display;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{AnsiColors, OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Done,
  Failed,
  Warning,
  Note,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Failed => "✗",
      Status::Warning => "⚠",
      Status::Note => "•",
    }
  }

  fn color(self) -> AnsiColors {
    match self {
      Status::Done => AnsiColors::Green,
      Status::Failed => AnsiColors::Red,
      Status::Warning => AnsiColors::Yellow,
      Status::Note => AnsiColors::Blue,
    }
  }

  fn stream(self) -> Stream {
    match self {
      Status::Failed | Status::Warning => Stream::Stderr,
      Status::Done | Status::Note => Stream::Stdout,
    }
  }
}

/// Print one status line; problems are colored in full, the rest only by symbol.
pub fn status(kind: Status, message: impl Display) {
  let stream = kind.stream();
  let symbol_text = kind.symbol();
  let symbol = symbol_text.if_supports_color(stream, |s| s.color(kind.color()));
  match kind {
    Status::Failed | Status::Warning => {
      let message = message.to_string();
      eprintln!("{symbol} {}", message.if_supports_color(stream, |s| s.color(kind.color())));
    }
    Status::Done | Status::Note => println!("{symbol} {message}"),
  }
}

/// Numbered plan step; the final step gets a check mark instead of an arrow.
pub fn step(index: usize, last: bool, description: impl Display) {
  let marker = if last { "✓" } else { "→" };
  println!(
    "  {:>2}. {} {description}",
    index + 1,
    marker.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

/// Indented `label: value` row under a status line.
pub fn detail(label: &str, value: impl Display) {
  println!("  {}: {value}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()));
}

/// Comma-separated row, skipped when there is nothing to list.
pub fn detail_list<T: Display>(label: &str, items: &[T]) {
  if items.is_empty() {
    return;
  }
  let joined: Vec<String> = items.iter().map(ToString::to_string).collect();
  detail(label, joined.join(", "));
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}

/// Human-readable build time: `850ms`, `12.3s`, `4m 07s`.
pub fn elapsed(duration: Duration) -> String {
  match duration.as_millis() {
    ms if ms < 1_000 => format!("{ms}ms"),
    ms if ms < 60_000 => format!("{:.1}s", ms as f64 / 1_000.0),
    _ => {
      let secs = duration.as_secs();
      format!("{}m {:02}s", secs / 60, secs % 60)
    }
  }
}
