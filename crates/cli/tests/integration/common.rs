//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the manifest, its
/// `packages/` directory, and the work and cache directories.
pub struct TestEnv {
  pub temp: TempDir,
  pub manifest_path: PathBuf,
}

impl TestEnv {
  /// Copy a fixture to `image.yaml` in a fresh temporary directory.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let manifest_path = temp.path().join("image.yaml");
    std::fs::write(&manifest_path, fixture_content(name)).unwrap();
    Self { temp, manifest_path }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Create a package bundle under `packages/`.
  pub fn package(&self, name: &str, scripts: &[(&str, &str)]) {
    for (exec, body) in scripts {
      self.write_file(&format!("packages/{name}/{exec}"), body);
    }
  }

  /// Work directory for builds (isolated per test).
  pub fn work_path(&self) -> PathBuf {
    let p = self.temp.path().join("work");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Cache path for artifacts.
  pub fn cache_path(&self) -> PathBuf {
    let p = self.temp.path().join("cache");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Get a pre-configured Command for the dockyard binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `DOCKYARD_WORK_DIR`: isolated work directory
  /// - `XDG_CACHE_HOME` / `XDG_DATA_HOME`: isolated cache and data
  /// - `DOCKYARD_PACKAGE_MANAGER`: `true`, so no real packages are installed
  pub fn dockyard_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("dockyard");
    cmd.env("DOCKYARD_WORK_DIR", self.work_path());
    cmd.env("XDG_CACHE_HOME", self.cache_path());
    cmd.env("XDG_DATA_HOME", self.temp.path().join("data"));
    cmd.env("DOCKYARD_PACKAGE_MANAGER", "true");
    for var in [
      "DOCKYARD_PACKAGES_DIR",
      "DOCKYARD_ARTIFACTS_DIR",
      "DOCKYARD_SCRIPT_EXEC",
      "DOCKYARD_SCRIPT_USER",
      "DOCKYARD_REPO_FILES_DIR",
      "DOCKYARD_ARTIFACT_CACHE",
      "DOCKYARD_SKIP_SSL_VERIFY",
      "RUST_LOG",
    ] {
      cmd.env_remove(var);
    }
    cmd
  }

  /// Bundles used by `eap.yaml`.
  pub fn eap_packages(&self) {
    self.package(
      "os-java-jolokia",
      &[("prepare.sh", "true\n"), ("configure", "true\n")],
    );
    self.package("os-eap64-launch", &[("configure", "true\n")]);
  }
}
