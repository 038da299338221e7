//! Default on-disk locations.
//!
//! Downloaded artifacts are shared between builds and live under the XDG
//! cache home; build work directories are per-user data.

use std::path::PathBuf;

use crate::consts::APP_NAME;

/// XDG base directory kinds dockyard stores files under.
#[derive(Debug, Clone, Copy)]
enum XdgBase {
  Cache,
  Data,
}

impl XdgBase {
  fn var(self) -> &'static str {
    match self {
      XdgBase::Cache => "XDG_CACHE_HOME",
      XdgBase::Data => "XDG_DATA_HOME",
    }
  }

  fn home_relative(self) -> &'static str {
    match self {
      XdgBase::Cache => ".cache",
      XdgBase::Data => ".local/share",
    }
  }

  /// `$XDG_*_HOME/dockyard`, or its `$HOME` fallback.
  fn app_dir(self) -> PathBuf {
    let base = std::env::var_os(self.var())
      .filter(|v| !v.is_empty())
      .map(PathBuf::from)
      .unwrap_or_else(|| home().join(self.home_relative()));
    base.join(APP_NAME)
  }
}

// Minimal build containers often run without HOME.
fn home() -> PathBuf {
  std::env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(std::env::temp_dir)
}

/// Default location for downloaded artifacts shared between builds.
pub fn artifacts_cache_dir() -> PathBuf {
  XdgBase::Cache.app_dir().join("artifacts")
}

/// Default working directory for builds.
pub fn default_work_dir() -> PathBuf {
  XdgBase::Data.app_dir().join("work")
}
