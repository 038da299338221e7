//! Test helpers for dockyard-lib.

use std::path::{Path, PathBuf};

use crate::config::BuildConfig;

/// Create a package bundle under `packages` holding the given scripts.
///
/// Returns the bundle directory.
pub fn write_bundle(packages: &Path, package: &str, scripts: &[(&str, &str)]) -> PathBuf {
  let dir = packages.join(package);
  std::fs::create_dir_all(&dir).unwrap();
  for (exec, body) in scripts {
    std::fs::write(dir.join(exec), body).unwrap();
  }
  dir
}

/// A configuration rooted entirely inside `root`.
pub fn config_in(root: &Path) -> BuildConfig {
  BuildConfig {
    packages_dir: root.join("packages"),
    work_dir: root.join("work"),
    artifacts_dir: root.join("artifacts"),
    script_exec: crate::consts::DEFAULT_SCRIPT_EXEC.to_string(),
    script_user: None,
    repo_files_dir: None,
    overrides: None,
    artifact_cache: None,
    ssl_verify: true,
    package_manager: "true".to_string(),
    shell: None,
  }
}
