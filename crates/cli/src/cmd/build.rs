//! Implementation of the `dockyard build` command.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use dockyard_lib::pipeline::{build, prepare};

use super::{BuildArgs, build_config};
use crate::output::{self, OutputFormat, Status, print_json};

/// Execute the build command.
///
/// Loads and compiles the manifest, then runs the plan:
/// - installs OS packages with the configured package manager
/// - fetches and verifies source artifacts
/// - runs package scripts in manifest order
/// - writes the image config under the work directory
pub fn cmd_build(
  manifest: &Path,
  params: &BTreeMap<String, String>,
  overrides: Option<&Path>,
  args: &BuildArgs,
  format: OutputFormat,
) -> Result<()> {
  let mut config = build_config(manifest, &args.paths, overrides);
  if let Some(dir) = &args.work_dir {
    config.work_dir = dir.clone();
  }
  if args.skip_ssl_verification {
    config.ssl_verify = false;
  }
  if !config.ssl_verify && !format.is_json() {
    output::status(Status::Warning, "TLS certificate verification is disabled");
  }

  let (descriptor, plan) =
    prepare(manifest, params, &config).with_context(|| format!("Failed to plan {}", manifest.display()))?;
  info!(image = %descriptor.name, steps = plan.steps.len(), "building");

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let image = rt
    .block_on(build(&plan, &config))
    .with_context(|| format!("Build of {} failed", descriptor.name))?;
  let elapsed = started.elapsed();

  if format.is_json() {
    return print_json(&image);
  }

  output::status(
    Status::Done,
    format!("Built {} in {}", image.metadata.reference(), output::elapsed(elapsed)),
  );
  output::detail("From", &image.base_image);
  output::detail("Root filesystem", image.rootfs.display());
  if let Some(path) = &image.config_path {
    output::detail("Image config", path.display());
  }
  output::detail("User", image.metadata.user);
  output::detail_list("Ports", image.exposed_ports());

  Ok(())
}
