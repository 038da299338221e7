//! Implementation of the `dockyard plan` command.
//!
//! Compiles a manifest against the package directory and prints the steps a
//! build would run, without running any of them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use dockyard_lib::pipeline::prepare;
use dockyard_lib::plan::PlanStep;

use super::{PathArgs, build_config};
use crate::output::{self, OutputFormat, Status, print_json};

pub fn cmd_plan(
  manifest: &Path,
  params: &BTreeMap<String, String>,
  overrides: Option<&Path>,
  paths: &PathArgs,
  format: OutputFormat,
) -> Result<()> {
  let config = build_config(manifest, paths, overrides);
  let (descriptor, plan) =
    prepare(manifest, params, &config).with_context(|| format!("Failed to plan {}", manifest.display()))?;

  if format.is_json() {
    return print_json(&plan);
  }

  output::status(Status::Note, format!("Plan for {} (from {})", descriptor.name, plan.base_image));
  for (index, step) in plan.steps.iter().enumerate() {
    output::step(index, matches!(step, PlanStep::ApplyMetadata(_)), step);
  }
  println!();
  output::detail("Steps", plan.steps.len());
  output::detail("Packages dir", config.packages_dir.display());

  Ok(())
}
