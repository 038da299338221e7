//! Package registry.
//!
//! A package (in the build-system sense) is a named bundle of scripts. The
//! compiler asks a [`PackageRegistry`] where each bundle lives; how bundles
//! are stored is up to the implementation.

use std::path::PathBuf;

use tracing::debug;

/// Resolves package names to bundle directories.
pub trait PackageRegistry {
  /// Returns the bundle root for `name`, or `None` if the package is unknown.
  fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Registry backed by a directory with one subdirectory per package.
///
/// ```text
/// packages/
///   os-eap64-launch/
///     configure.sh
///   os-java-jolokia/
///     prepare.sh
///     configure.sh
/// ```
#[derive(Debug, Clone)]
pub struct DirRegistry {
  root: PathBuf,
}

impl DirRegistry {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    let root = dunce::canonicalize(&root).unwrap_or(root);
    Self { root }
  }
}

impl PackageRegistry for DirRegistry {
  fn resolve(&self, name: &str) -> Option<PathBuf> {
    // Package names are single path components.
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
      return None;
    }

    let bundle = self.root.join(name);
    if bundle.is_dir() {
      debug!(package = %name, path = %bundle.display(), "resolved package");
      Some(bundle)
    } else {
      None
    }
  }
}
