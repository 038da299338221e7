//! Implementation of the `dockyard dockerfile` command.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use dockyard_lib::dockerfile::render;
use dockyard_lib::pipeline::prepare;

use super::{PathArgs, build_config};
use crate::output::{self, Status};

pub fn cmd_dockerfile(
  manifest: &Path,
  params: &BTreeMap<String, String>,
  overrides: Option<&Path>,
  paths: &PathArgs,
  output: Option<&Path>,
) -> Result<()> {
  let config = build_config(manifest, paths, overrides);
  let (_, plan) =
    prepare(manifest, params, &config).with_context(|| format!("Failed to plan {}", manifest.display()))?;
  let dockerfile = render(&plan);

  match output {
    Some(path) => {
      std::fs::write(path, &dockerfile).with_context(|| format!("Failed to write {}", path.display()))?;
      output::status(Status::Done, format!("Wrote {}", path.display()));
    }
    None => print!("{dockerfile}"),
  }

  Ok(())
}
