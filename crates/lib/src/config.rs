//! Build configuration.
//!
//! Every tunable of a build lives in [`BuildConfig`]. Defaults come from
//! `DOCKYARD_*` environment variables with XDG fallbacks; callers (the CLI)
//! override individual fields afterwards.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::consts::{DEFAULT_PACKAGE_MANAGER, DEFAULT_SCRIPT_EXEC};
use crate::platform::paths;

pub const ENV_PACKAGES_DIR: &str = "DOCKYARD_PACKAGES_DIR";
pub const ENV_WORK_DIR: &str = "DOCKYARD_WORK_DIR";
pub const ENV_ARTIFACTS_DIR: &str = "DOCKYARD_ARTIFACTS_DIR";
pub const ENV_SCRIPT_EXEC: &str = "DOCKYARD_SCRIPT_EXEC";
pub const ENV_ARTIFACT_CACHE: &str = "DOCKYARD_ARTIFACT_CACHE";
pub const ENV_PACKAGE_MANAGER: &str = "DOCKYARD_PACKAGE_MANAGER";
pub const ENV_SKIP_SSL_VERIFY: &str = "DOCKYARD_SKIP_SSL_VERIFY";
pub const ENV_SCRIPT_USER: &str = "DOCKYARD_SCRIPT_USER";
pub const ENV_REPO_FILES_DIR: &str = "DOCKYARD_REPO_FILES_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
  /// Root of the package registry: one directory per package.
  pub packages_dir: PathBuf,

  /// Directory holding the working root filesystem and committed image config.
  pub work_dir: PathBuf,

  /// Where fetched artifacts are stored and reused from.
  pub artifacts_dir: PathBuf,

  /// Script run for steps that do not name one.
  pub script_exec: String,

  /// Uid for script steps that do not name one. `None` keeps the build
  /// process's own identity.
  pub script_user: Option<u32>,

  /// Directory of YUM `.repo` files enabled for the OS package install.
  pub repo_files_dir: Option<PathBuf>,

  /// Partial manifest merged over the main one when loading.
  pub overrides: Option<PathBuf>,

  /// Artifact cache URL template with `#filename#`, `#algorithm#` and
  /// `#hash#` markers. Fetch URLs are rewritten through it when set.
  pub artifact_cache: Option<String>,

  /// Verify TLS certificates when fetching.
  pub ssl_verify: bool,

  /// Command line prefix the OS package names are appended to. `#rootfs#`
  /// is replaced with the quoted root filesystem path.
  pub package_manager: String,

  /// Shell used to run scripts. Defaults to `/bin/sh`.
  pub shell: Option<String>,
}

impl BuildConfig {
  /// Configuration for a manifest located in `manifest_dir`.
  ///
  /// Packages default to `<manifest_dir>/packages`.
  pub fn from_env(manifest_dir: &Path) -> Self {
    Self {
      packages_dir: env_path(ENV_PACKAGES_DIR).unwrap_or_else(|| manifest_dir.join("packages")),
      work_dir: env_path(ENV_WORK_DIR).unwrap_or_else(paths::default_work_dir),
      artifacts_dir: env_path(ENV_ARTIFACTS_DIR).unwrap_or_else(paths::artifacts_cache_dir),
      script_exec: env_string(ENV_SCRIPT_EXEC).unwrap_or_else(|| DEFAULT_SCRIPT_EXEC.to_string()),
      script_user: env_uid(ENV_SCRIPT_USER),
      repo_files_dir: env_path(ENV_REPO_FILES_DIR),
      overrides: None,
      artifact_cache: env_string(ENV_ARTIFACT_CACHE),
      ssl_verify: !env_flag(ENV_SKIP_SSL_VERIFY),
      package_manager: env_string(ENV_PACKAGE_MANAGER).unwrap_or_else(|| DEFAULT_PACKAGE_MANAGER.to_string()),
      shell: None,
    }
  }

  /// Directory that becomes the image root filesystem.
  pub fn rootfs_dir(&self) -> PathBuf {
    self.work_dir.join(crate::consts::ROOTFS_DIR)
  }

  /// Path of the committed image config.
  pub fn image_config_path(&self) -> PathBuf {
    self.work_dir.join(crate::consts::IMAGE_CONFIG_FILE)
  }
}

fn env_string(key: &str) -> Option<String> {
  std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
  env_string(key).map(PathBuf::from)
}

fn env_uid(key: &str) -> Option<u32> {
  let value = env_string(key)?;
  match value.parse() {
    Ok(uid) => Some(uid),
    Err(_) => {
      warn!(var = key, value = %value, "ignoring non-numeric uid");
      None
    }
  }
}

fn env_flag(key: &str) -> bool {
  env_string(key).is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}
