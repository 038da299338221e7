mod cmd;
mod output;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{BuildArgs, PathArgs};
use crate::output::{OutputFormat, Status};

/// dockyard - build container images from declarative manifests
#[derive(Parser)]
#[command(name = "dockyard")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Manifest parameter as NAME=VALUE (repeatable)
  #[arg(short = 'p', long = "param", global = true, value_parser = parse_param)]
  params: Vec<(String, String)>,

  /// Partial manifest merged over the manifest before validation
  #[arg(long, global = true, value_name = "FILE")]
  overrides: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Load and validate a manifest
  Validate {
    /// Path to the image manifest
    manifest: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Compile a manifest and show the build plan
  Plan {
    /// Path to the image manifest
    manifest: PathBuf,

    #[command(flatten)]
    paths: PathArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Build an image from a manifest
  Build {
    /// Path to the image manifest
    manifest: PathBuf,

    #[command(flatten)]
    args: BuildArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Render an equivalent Dockerfile
  Dockerfile {
    /// Path to the image manifest
    manifest: PathBuf,

    #[command(flatten)]
    paths: PathArgs,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
    _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  // RUST_LOG wins; otherwise --verbose selects debug
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let params: BTreeMap<String, String> = cli.params.into_iter().collect();
  let overrides = cli.overrides.as_deref();

  let result = match cli.command {
    Commands::Validate { manifest, format } => cmd::cmd_validate(&manifest, &params, overrides, format),
    Commands::Plan {
      manifest,
      paths,
      format,
    } => cmd::cmd_plan(&manifest, &params, overrides, &paths, format),
    Commands::Build { manifest, args, format } => cmd::cmd_build(&manifest, &params, overrides, &args, format),
    Commands::Dockerfile {
      manifest,
      paths,
      output,
    } => cmd::cmd_dockerfile(&manifest, &params, overrides, &paths, output.as_deref()),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      output::status(Status::Failed, format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
