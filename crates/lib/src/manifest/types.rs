//! Image descriptor types.
//!
//! The [`ImageDescriptor`] is the validated, in-memory form of an image
//! manifest. It is constructed once by the loader and never mutated
//! afterwards; the compiler and executor only borrow it.
//!
//! # Manifest shape
//!
//! ```yaml
//! name: jboss-eap-6/eap64-openshift
//! version: "1.4"
//! release: "3"
//! from: jboss-eap-6/eap64:6.4
//! labels:
//!   - name: io.k8s.description
//!     value: Platform for building and running JavaEE applications
//! envs:
//!   - name: JBOSS_MODULES_SYSTEM_PKGS
//!     value: org.jboss.logmanager
//!   - name: OPENSHIFT_KUBE_PING_NAMESPACE
//!     example: myproject
//!     description: Clustering project namespace.
//! ports:
//!   - value: 8443
//!   - value: 8778
//! cmd:
//!   - /opt/eap/bin/openshift-launch.sh
//! packages:
//!   - hostname
//! scripts:
//!   - package: os-eap64-launch
//!     exec: configure.sh
//!     user: 185
//! sources:
//!   - artifact: https://example.com/jolokia-jvm-1.3.2-agent.jar
//!     md5: 1b996b9083f537917b307309b0e2f16d
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::hash::{Checksum, HashAlgorithm};

/// A validated image manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
  pub name: String,
  pub version: Option<String>,
  pub release: Option<String>,
  pub description: Option<String>,
  /// Base image reference (`from` in the manifest).
  pub base_image: String,
  pub labels: Vec<Label>,
  pub envs: Vec<EnvVar>,
  /// Exposed ports in declaration order. Distinct by construction.
  pub ports: Vec<u16>,
  pub cmd: Vec<String>,
  pub entrypoint: Option<Vec<String>>,
  /// Uid the produced image runs as.
  pub user: Option<u32>,
  pub volumes: Vec<String>,
  pub workdir: Option<String>,
  /// OS packages in declaration order, duplicates included.
  pub packages: Vec<String>,
  /// Script steps in execution order.
  pub scripts: Vec<ScriptStep>,
  pub sources: Vec<SourceArtifact>,
}

impl ImageDescriptor {
  /// Labels collapsed by name; a later entry replaces an earlier one.
  pub fn effective_labels(&self) -> BTreeMap<String, String> {
    self
      .labels
      .iter()
      .map(|l| (l.name.clone(), l.value.clone()))
      .collect()
  }

  /// Concrete environment defaults, last entry per name wins.
  ///
  /// Documentation-only entries (no `value`) are left out.
  pub fn effective_env(&self) -> BTreeMap<String, String> {
    self
      .envs
      .iter()
      .filter_map(|e| e.value.as_ref().map(|v| (e.name.clone(), v.clone())))
      .collect()
  }

  /// OS packages deduplicated, first occurrence order preserved.
  pub fn unique_packages(&self) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    self
      .packages
      .iter()
      .filter(|p| seen.insert(p.as_str()))
      .cloned()
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
  pub name: String,
  pub value: String,
}

/// An environment entry.
///
/// Entries with a `value` are concrete defaults applied to the image. Entries
/// carrying only `example`/`description` document a variable operators may
/// set at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
  pub name: String,
  pub value: Option<String>,
  pub example: Option<String>,
  pub description: Option<String>,
}

impl EnvVar {
  pub fn is_concrete(&self) -> bool {
    self.value.is_some()
  }
}

/// One script execution from a package bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
  /// Registry name of the bundle providing the script.
  pub package: String,
  /// Script filename within the bundle; the build default when absent.
  pub exec: Option<String>,
  /// Uid to run under; the build default when absent.
  pub user: Option<u32>,
}

/// A binary artifact to fetch and verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceArtifact {
  /// Fetch URL.
  pub artifact: String,
  /// Target filename; derived from the URL when absent.
  pub name: Option<String>,
  pub md5: String,
  pub sha1: Option<String>,
  pub sha256: Option<String>,
}

impl SourceArtifact {
  /// Every declared checksum, `md5` first.
  pub fn checksums(&self) -> Vec<Checksum> {
    let mut sums = vec![Checksum::md5(&self.md5)];
    if let Some(sha1) = &self.sha1 {
      sums.push(Checksum::new(HashAlgorithm::Sha1, sha1));
    }
    if let Some(sha256) = &self.sha256 {
      sums.push(Checksum::new(HashAlgorithm::Sha256, sha256));
    }
    sums
  }
}
