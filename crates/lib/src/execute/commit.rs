//! Image metadata commit.
//!
//! The last step of a build records the image configuration next to the
//! working root filesystem. The on-disk shape follows the `config` object of
//! an OCI image configuration so it can be fed to image tooling directly.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::execute::types::{ExecuteError, FinalImage, WorkingImage};
use crate::plan::ImageMetadata;

/// Applies final metadata to the working image.
pub trait ImageCommitter {
  fn commit(&self, image: &WorkingImage, metadata: &ImageMetadata) -> Result<FinalImage, ExecuteError>;
}

/// Writes the image config as JSON.
#[derive(Debug, Clone)]
pub struct JsonImageCommitter {
  path: PathBuf,
}

impl JsonImageCommitter {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl ImageCommitter for JsonImageCommitter {
  fn commit(&self, image: &WorkingImage, metadata: &ImageMetadata) -> Result<FinalImage, ExecuteError> {
    let document = ImageConfigDocument::new(image, metadata);
    let content = serde_json::to_string_pretty(&document).map_err(|e| ExecuteError::MetadataApply {
      message: e.to_string(),
    })?;

    let write_error = |e: std::io::Error| ExecuteError::MetadataApply {
      message: format!("{}: {e}", self.path.display()),
    };

    if let Some(dir) = self.path.parent() {
      fs::create_dir_all(dir).map_err(write_error)?;
    }

    // Write atomically: write to temp file, then rename
    let temp_path = self.path.with_extension("json.tmp");
    fs::write(&temp_path, &content).map_err(write_error)?;
    fs::rename(&temp_path, &self.path).map_err(write_error)?;

    info!(image = %metadata.reference(), path = ?self.path, "image config committed");

    Ok(FinalImage {
      base_image: image.base_image.clone(),
      metadata: metadata.clone(),
      rootfs: image.rootfs.clone(),
      config_path: Some(self.path.clone()),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfigDocument {
  pub base_image: String,
  pub rootfs: PathBuf,
  pub config: ContainerConfig,
}

/// OCI-style container configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
  pub user: String,
  pub env: Vec<String>,
  pub exposed_ports: BTreeMap<String, Empty>,
  pub cmd: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entrypoint: Option<Vec<String>>,
  pub labels: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub volumes: BTreeMap<String, Empty>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub working_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

impl ImageConfigDocument {
  pub fn new(image: &WorkingImage, metadata: &ImageMetadata) -> Self {
    let empty_set = |keys: Vec<String>| keys.into_iter().map(|k| (k, Empty::default())).collect();

    Self {
      base_image: image.base_image.clone(),
      rootfs: image.rootfs.clone(),
      config: ContainerConfig {
        user: metadata.user.to_string(),
        env: metadata.env.iter().map(|(k, v)| format!("{k}={v}")).collect(),
        exposed_ports: empty_set(metadata.ports.iter().map(|p| format!("{p}/tcp")).collect()),
        cmd: metadata.cmd.clone(),
        entrypoint: metadata.entrypoint.clone(),
        labels: metadata.labels.clone(),
        volumes: empty_set(metadata.volumes.clone()),
        working_dir: metadata.workdir.clone(),
      },
    }
  }
}
