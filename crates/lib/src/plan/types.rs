use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::{Checksum, HashAlgorithm};

/// Errors that can occur while compiling a descriptor into a plan.
#[derive(Debug, Error)]
pub enum CompileError {
  /// The registry has no bundle for a script step's package.
  #[error("unresolved package '{package}' (scripts[{step}])")]
  UnresolvedPackage { package: String, step: usize },

  /// The bundle exists but does not contain the requested script.
  #[error("package '{package}' has no script '{exec}' (looked in {bundle})")]
  MissingScript {
    package: String,
    exec: String,
    bundle: PathBuf,
  },

  /// The script path resolves outside its bundle.
  #[error("script '{exec}' of package '{package}' is outside its bundle {bundle}")]
  ScriptOutsideBundle {
    package: String,
    exec: String,
    bundle: PathBuf,
  },

  /// The configured repository directory cannot be read.
  #[error("cannot read repository files from {dir}: {source}")]
  RepoFiles {
    dir: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A fully resolved, ordered build.
///
/// Steps run in vector order. The last step is always
/// [`PlanStep::ApplyMetadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
  pub base_image: String,
  pub steps: Vec<PlanStep>,
}

impl BuildPlan {
  /// The script steps in execution order.
  pub fn scripts(&self) -> impl Iterator<Item = &RunScript> {
    self.steps.iter().filter_map(|s| match s {
      PlanStep::RunScript(r) => Some(r),
      _ => None,
    })
  }

  /// The artifact fetches in plan order.
  pub fn fetches(&self) -> impl Iterator<Item = &FetchArtifact> {
    self.steps.iter().filter_map(|s| match s {
      PlanStep::FetchArtifact(f) => Some(f),
      _ => None,
    })
  }

  /// The OS packages to install, if any.
  pub fn os_packages(&self) -> &[String] {
    self
      .steps
      .iter()
      .find_map(|s| match s {
        PlanStep::InstallOsPackages { names, .. } => Some(names.as_slice()),
        _ => None,
      })
      .unwrap_or(&[])
  }

  /// Extra repositories enabled for the OS package install.
  pub fn repos(&self) -> &[RepoFile] {
    self
      .steps
      .iter()
      .find_map(|s| match s {
        PlanStep::InstallOsPackages { repos, .. } => Some(repos.as_slice()),
        _ => None,
      })
      .unwrap_or(&[])
  }

  pub fn metadata(&self) -> Option<&ImageMetadata> {
    self.steps.iter().find_map(|s| match s {
      PlanStep::ApplyMetadata(m) => Some(m),
      _ => None,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStep {
  InstallOsPackages {
    names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    repos: Vec<RepoFile>,
  },
  FetchArtifact(FetchArtifact),
  RunScript(RunScript),
  ApplyMetadata(ImageMetadata),
}

impl fmt::Display for PlanStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PlanStep::InstallOsPackages { names, repos } => {
        write!(f, "install {}", names.join(" "))?;
        if !repos.is_empty() {
          let ids: Vec<&str> = repos.iter().map(|r| r.id.as_str()).collect();
          write!(f, " (repos: {})", ids.join(", "))?;
        }
        Ok(())
      }
      PlanStep::FetchArtifact(fetch) => write!(f, "fetch {} -> {}", fetch.url, fetch.dest.display()),
      PlanStep::RunScript(run) => {
        write!(f, "run {}/{}", run.package, run.exec)?;
        if let Some(uid) = run.user {
          write!(f, " as {uid}")?;
        }
        Ok(())
      }
      PlanStep::ApplyMetadata(meta) => write!(
        f,
        "apply metadata ({} labels, {} env, {} ports)",
        meta.labels.len(),
        meta.env.len(),
        meta.ports.len()
      ),
    }
  }
}

/// A YUM `.repo` file enabled while installing OS packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
  /// File stem, passed as `--enablerepo=<id>`.
  pub id: String,
  pub path: PathBuf,
}

impl RepoFile {
  pub fn file_name(&self) -> String {
    format!("{}.repo", self.id)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchArtifact {
  /// URL as declared in the manifest. Errors name this one.
  pub artifact: String,
  /// URL actually fetched; differs from `artifact` behind an artifact cache.
  pub url: String,
  /// Every declared checksum, md5 first.
  pub checksums: Vec<Checksum>,
  pub dest: PathBuf,
}

impl FetchArtifact {
  pub fn expected_md5(&self) -> Option<&str> {
    self
      .checksums
      .iter()
      .find(|c| c.algorithm == HashAlgorithm::Md5)
      .map(|c| c.value.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunScript {
  pub package: String,
  pub bundle: PathBuf,
  pub exec: String,
  pub user: Option<u32>,
}

impl RunScript {
  pub fn script_path(&self) -> PathBuf {
    self.bundle.join(&self.exec)
  }
}

/// Metadata the produced image carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
  pub name: String,
  pub version: Option<String>,
  pub release: Option<String>,
  pub labels: BTreeMap<String, String>,
  /// Concrete environment defaults only.
  pub env: BTreeMap<String, String>,
  /// Exposed ports in declaration order.
  pub ports: Vec<u16>,
  pub cmd: Vec<String>,
  pub entrypoint: Option<Vec<String>>,
  pub user: u32,
  pub volumes: Vec<String>,
  pub workdir: Option<String>,
}

impl ImageMetadata {
  /// `name:version`, or just the name when unversioned.
  pub fn reference(&self) -> String {
    match &self.version {
      Some(v) => format!("{}:{}", self.name, v),
      None => self.name.clone(),
    }
  }
}
