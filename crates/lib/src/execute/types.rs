//! Types for plan execution.
//!
//! This module defines the error types, build states and result types used
//! while executing a [`BuildPlan`](crate::plan::BuildPlan).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::ImageMetadata;
use crate::util::hash::HashAlgorithm;

/// Errors that can occur during plan execution.
///
/// Every variant is fatal for the build and names the step that caused it.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The package manager exited non-zero.
  #[error("package install failed ({}): {packages}", exit_status(.code))]
  PackageInstall { packages: String, code: Option<i32> },

  /// The package manager could not be started.
  #[error("failed to run package manager: {source}")]
  PackageManagerSpawn {
    #[source]
    source: std::io::Error,
  },

  /// Transport failure while fetching an artifact.
  #[error("fetch failed for {url}: {message}")]
  Fetch { url: String, message: String },

  /// Downloaded bytes do not match a declared checksum.
  #[error("{algorithm} mismatch for {url}: expected {expected}, got {actual}")]
  ChecksumMismatch {
    url: String,
    algorithm: HashAlgorithm,
    expected: String,
    actual: String,
  },

  /// A script exited non-zero.
  #[error("script {package}/{exec} failed ({})", exit_status(.code))]
  ScriptExecution {
    package: String,
    exec: String,
    code: Option<i32>,
  },

  /// A script could not be started (missing shell, identity switch refused).
  #[error("failed to run script {package}/{exec}: {source}")]
  ScriptSpawn {
    package: String,
    exec: String,
    #[source]
    source: std::io::Error,
  },

  /// Image metadata could not be committed.
  #[error("failed to apply image metadata: {message}")]
  MetadataApply { message: String },

  /// The plan's steps are not in executable order.
  #[error("invalid plan: {0}")]
  InvalidPlan(String),

  /// HTTP client could not be initialized.
  #[error("failed to initialize HTTP client: {0}")]
  HttpClient(String),

  /// I/O error on the working filesystem.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

fn exit_status(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {code}"),
    None => "terminated by signal".to_string(),
  }
}

/// Executor lifecycle.
///
/// States are ordered; the executor only ever moves forward, or to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
  Init,
  InstallingPackages,
  FetchingArtifacts,
  RunningScripts,
  ApplyingMetadata,
  Done,
  Failed,
}

impl BuildState {
  pub fn is_terminal(self) -> bool {
    matches!(self, BuildState::Done | BuildState::Failed)
  }
}

impl fmt::Display for BuildState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      BuildState::Init => "init",
      BuildState::InstallingPackages => "installing-packages",
      BuildState::FetchingArtifacts => "fetching-artifacts",
      BuildState::RunningScripts => "running-scripts",
      BuildState::ApplyingMetadata => "applying-metadata",
      BuildState::Done => "done",
      BuildState::Failed => "failed",
    };
    f.write_str(s)
  }
}

/// Exit status and captured output of a collaborator command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutcome {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

/// The image being built.
///
/// Owned by the executor for the duration of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingImage {
  pub base_image: String,
  /// Root filesystem scripts and the package manager operate on.
  pub rootfs: PathBuf,
  /// Directory fetched artifacts land in.
  pub artifacts_dir: PathBuf,
}

/// The committed result of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalImage {
  pub base_image: String,
  pub metadata: ImageMetadata,
  pub rootfs: PathBuf,
  /// Where the image config was written, for committers that write one.
  pub config_path: Option<PathBuf>,
}

impl FinalImage {
  pub fn exposed_ports(&self) -> &[u16] {
    &self.metadata.ports
  }
}
