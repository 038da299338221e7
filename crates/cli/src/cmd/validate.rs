//! Implementation of the `dockyard validate` command.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use dockyard_lib::manifest::load_file_with_overrides;

use crate::output::{self, OutputFormat, Status, print_json};

pub fn cmd_validate(
  manifest: &Path,
  params: &BTreeMap<String, String>,
  overrides: Option<&Path>,
  format: OutputFormat,
) -> Result<()> {
  let descriptor = load_file_with_overrides(manifest, overrides, params)
    .with_context(|| format!("Invalid manifest: {}", manifest.display()))?;

  if format.is_json() {
    return print_json(&descriptor);
  }

  let version = descriptor.version.as_deref().unwrap_or("unversioned");
  output::status(Status::Done, format!("{} {} is valid", descriptor.name, version));
  output::detail("From", &descriptor.base_image);
  output::detail("Packages", descriptor.unique_packages().len());
  output::detail("Sources", descriptor.sources.len());
  output::detail("Scripts", descriptor.scripts.len());
  output::detail_list("Ports", &descriptor.ports);

  Ok(())
}
