//! Build plan compilation.
//!
//! [`compile`] turns an [`ImageDescriptor`] into a [`BuildPlan`]: every
//! script step resolved to a bundle on disk, every source turned into a fetch
//! with its expected checksums and destination, and the image metadata
//! collapsed into its final form.
//!
//! # Step order
//!
//! 1. `InstallOsPackages` (once, only when the manifest lists packages),
//!    carrying the `.repo` files of the configured repository directory
//! 2. `FetchArtifact` per source, in manifest order
//! 3. `RunScript` per script step, in manifest order
//! 4. `ApplyMetadata`
//!
//! Script steps are never reordered relative to each other.

mod types;

use std::path::Path;

use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::consts::DEFAULT_IMAGE_USER;
use crate::manifest::{ImageDescriptor, SourceArtifact, is_bundle_relative};
use crate::registry::PackageRegistry;
use crate::util::hash::{Checksum, HashAlgorithm, hash_bytes};

pub use types::*;

/// Compile a descriptor into an executable plan.
///
/// Fails on the first script step whose package the registry cannot resolve,
/// or whose bundle lacks the requested script. Steps without a user run as
/// the configured default script user, if any.
pub fn compile(
  descriptor: &ImageDescriptor,
  registry: &impl PackageRegistry,
  config: &BuildConfig,
) -> Result<BuildPlan, CompileError> {
  let mut steps = Vec::new();

  let packages = descriptor.unique_packages();
  if !packages.is_empty() {
    let repos = match &config.repo_files_dir {
      Some(dir) => repo_files(dir)?,
      None => Vec::new(),
    };
    steps.push(PlanStep::InstallOsPackages { names: packages, repos });
  } else if config.repo_files_dir.is_some() {
    debug!("no OS packages to install, repository files are not used");
  }

  for source in &descriptor.sources {
    steps.push(PlanStep::FetchArtifact(fetch_step(source, config)));
  }

  for (index, script) in descriptor.scripts.iter().enumerate() {
    let bundle = registry
      .resolve(&script.package)
      .ok_or_else(|| CompileError::UnresolvedPackage {
        package: script.package.clone(),
        step: index,
      })?;

    let exec = script.exec.clone().unwrap_or_else(|| config.script_exec.clone());
    let script_path = bundle.join(&exec);
    if !is_bundle_relative(&exec) || !script_path.starts_with(&bundle) {
      return Err(CompileError::ScriptOutsideBundle {
        package: script.package.clone(),
        exec,
        bundle,
      });
    }
    if !script_path.is_file() {
      return Err(CompileError::MissingScript {
        package: script.package.clone(),
        exec,
        bundle,
      });
    }

    let user = script.user.or(config.script_user);
    debug!(package = %script.package, exec = %exec, user = ?user, "resolved script step");
    steps.push(PlanStep::RunScript(RunScript {
      package: script.package.clone(),
      bundle,
      exec,
      user,
    }));
  }

  steps.push(PlanStep::ApplyMetadata(image_metadata(descriptor)));

  info!(image = %descriptor.name, steps = steps.len(), "compiled build plan");

  Ok(BuildPlan {
    base_image: descriptor.base_image.clone(),
    steps,
  })
}

/// The `*.repo` files directly inside `dir`, sorted by name.
fn repo_files(dir: &Path) -> Result<Vec<RepoFile>, CompileError> {
  let io_error = |source| CompileError::RepoFiles {
    dir: dir.to_path_buf(),
    source,
  };

  let mut repos = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(io_error)? {
    let path = entry.map_err(io_error)?.path();
    if path.extension().is_some_and(|e| e == "repo")
      && path.is_file()
      && let Some(id) = path.file_stem().and_then(|s| s.to_str())
    {
      info!(repo = %id, "adding repository");
      repos.push(RepoFile {
        id: id.to_string(),
        path: path.clone(),
      });
    }
  }
  repos.sort_by(|a, b| a.id.cmp(&b.id));
  Ok(repos)
}

fn fetch_step(source: &SourceArtifact, config: &BuildConfig) -> FetchArtifact {
  let filename = source
    .name
    .clone()
    .unwrap_or_else(|| url_to_filename(&source.artifact));
  let checksums = source.checksums();

  let url = match &config.artifact_cache {
    Some(template) => cache_url(template, &filename, source),
    None => source.artifact.clone(),
  };

  FetchArtifact {
    artifact: source.artifact.clone(),
    url,
    checksums,
    dest: config.artifacts_dir.join(filename),
  }
}

/// Rewrite a fetch through the artifact cache template.
///
/// The strongest declared checksum addresses the cached copy.
fn cache_url(template: &str, filename: &str, source: &SourceArtifact) -> String {
  let checksum = source
    .checksums()
    .into_iter()
    .min_by_key(|c| c.algorithm)
    .unwrap_or_else(|| Checksum::md5(&source.md5));

  debug!(algorithm = %checksum.algorithm, "using artifact cache");
  template
    .replace("#filename#", filename)
    .replace("#algorithm#", checksum.algorithm.as_str())
    .replace("#hash#", &checksum.value)
}

/// Collapse descriptor metadata into what the image carries.
///
/// `name`, `version`, `release` and `description` become labels unless the
/// manifest sets those labels itself.
fn image_metadata(descriptor: &ImageDescriptor) -> ImageMetadata {
  let mut labels = std::collections::BTreeMap::new();
  labels.insert("name".to_string(), descriptor.name.clone());
  if let Some(version) = &descriptor.version {
    labels.insert("version".to_string(), version.clone());
  }
  if let Some(release) = &descriptor.release {
    labels.insert("release".to_string(), release.clone());
  }
  if let Some(description) = &descriptor.description {
    labels.insert("description".to_string(), description.clone());
  }
  labels.extend(descriptor.effective_labels());

  ImageMetadata {
    name: descriptor.name.clone(),
    version: descriptor.version.clone(),
    release: descriptor.release.clone(),
    labels,
    env: descriptor.effective_env(),
    ports: descriptor.ports.clone(),
    cmd: descriptor.cmd.clone(),
    entrypoint: descriptor.entrypoint.clone(),
    user: descriptor.user.unwrap_or(DEFAULT_IMAGE_USER),
    volumes: descriptor.volumes.clone(),
    workdir: descriptor.workdir.clone(),
  }
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to a hash of
/// the URL if no suitable filename can be extracted.
pub fn url_to_filename(url: &str) -> String {
  if let Some(filename) = url.rsplit('/').next() {
    let filename = filename.split(['?', '#']).next().unwrap_or(filename);

    // Sanitize: only allow alphanumeric, dash, underscore, dot
    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  format!(
    "download_{}",
    &hash_bytes(HashAlgorithm::Sha256, url.as_bytes())[..16]
  )
}
