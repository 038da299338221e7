mod build;
mod dockerfile;
mod plan;
mod validate;

use std::path::{Path, PathBuf};

use clap::Args;

use dockyard_lib::config::BuildConfig;

pub use build::cmd_build;
pub use dockerfile::cmd_dockerfile;
pub use plan::cmd_plan;
pub use validate::cmd_validate;

/// Where to look for package bundles and extra repositories.
#[derive(Debug, Clone, Default, Args)]
pub struct PathArgs {
  /// Package bundle directory (default: `packages/` next to the manifest)
  #[arg(long)]
  pub packages_dir: Option<PathBuf>,

  /// Directory of `*.repo` files enabled while installing OS packages
  #[arg(long)]
  pub repo_files_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct BuildArgs {
  #[command(flatten)]
  pub paths: PathArgs,

  /// Directory receiving the root filesystem and image config
  #[arg(long)]
  pub work_dir: Option<PathBuf>,

  /// Do not verify TLS certificates when fetching artifacts
  #[arg(long)]
  pub skip_ssl_verification: bool,
}

/// Environment defaults for `manifest`, with command line options applied.
fn build_config(manifest: &Path, paths: &PathArgs, overrides: Option<&Path>) -> BuildConfig {
  let manifest_dir = manifest.parent().unwrap_or(Path::new("."));
  let mut config = BuildConfig::from_env(manifest_dir);
  if let Some(dir) = &paths.packages_dir {
    config.packages_dir = dir.clone();
  }
  if let Some(dir) = &paths.repo_files_dir {
    config.repo_files_dir = Some(dir.clone());
  }
  config.overrides = overrides.map(Path::to_path_buf);
  config
}
