//! End-to-end build pipeline: load, compile, execute.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::config::BuildConfig;
use crate::execute::{
  CommandPackageManager, ExecuteError, Executor, FinalImage, HttpFetcher, JsonImageCommitter, ShellScriptRunner,
  WorkingImage,
};
use crate::manifest::{ImageDescriptor, LoadError, load_file_with_overrides};
use crate::plan::{BuildPlan, CompileError, compile};
use crate::registry::DirRegistry;

/// Any failure along the pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Load(#[from] LoadError),

  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),
}

/// Load a manifest, merged with the configured overrides document if any,
/// and compile it against the configured package directory.
pub fn prepare(
  manifest: &Path,
  params: &BTreeMap<String, String>,
  config: &BuildConfig,
) -> Result<(ImageDescriptor, BuildPlan), BuildError> {
  let descriptor = load_file_with_overrides(manifest, config.overrides.as_deref(), params)?;
  let registry = DirRegistry::new(&config.packages_dir);
  let plan = compile(&descriptor, &registry, config)?;
  Ok((descriptor, plan))
}

/// Execute `plan` with the default collaborators.
///
/// Artifacts are fetched over HTTP, packages installed with the configured
/// package manager command, scripts run by `/bin/sh` (or the configured
/// shell), and the image config is written under the work directory.
pub async fn build(plan: &BuildPlan, config: &BuildConfig) -> Result<FinalImage, BuildError> {
  let image = WorkingImage {
    base_image: plan.base_image.clone(),
    rootfs: config.rootfs_dir(),
    artifacts_dir: config.artifacts_dir.clone(),
  };
  info!(work_dir = ?config.work_dir, rootfs = ?image.rootfs, "preparing working image");
  tokio::fs::create_dir_all(&image.rootfs).await.map_err(ExecuteError::from)?;
  tokio::fs::create_dir_all(&image.artifacts_dir)
    .await
    .map_err(ExecuteError::from)?;

  let mut executor = Executor::new(
    HttpFetcher::new(config.ssl_verify)?,
    CommandPackageManager::new(&config.package_manager, config.shell.clone()),
    ShellScriptRunner::new(config.shell.clone()),
    JsonImageCommitter::new(config.image_config_path()),
  );

  Ok(executor.execute(plan, &image).await?)
}
