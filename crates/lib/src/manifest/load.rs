//! Manifest loading and validation.
//!
//! Loading runs in three passes, each with its own failure class:
//!
//! 1. Parameter substitution on the raw text ([`LoadError::Parameter`])
//! 2. Shape checks: YAML syntax, required fields, field types
//!    ([`LoadError::Schema`])
//! 3. Value checks: port ranges, checksum formats, empty names
//!    ([`LoadError::Validation`])
//!
//! Nothing past the loader runs unless all three pass.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde::de::{self, Deserializer};
use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::overrides;
use super::params::{self, ParamError};
use super::types::{EnvVar, ImageDescriptor, Label, ScriptStep, SourceArtifact};
use crate::util::hash::{HashAlgorithm, is_lower_hex};

/// Top-level keys that must be present in every manifest.
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "from", "cmd"];

const KNOWN_FIELDS: [&str; 17] = [
  "name",
  "version",
  "release",
  "description",
  "from",
  "labels",
  "envs",
  "ports",
  "cmd",
  "entrypoint",
  "user",
  "volumes",
  "workdir",
  "packages",
  "scripts",
  "sources",
  "schema_version",
];

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to read manifest {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("parameter error: {0}")]
  Parameter(#[from] ParamError),

  /// A required field is missing or a field has the wrong type.
  #[error("schema error: {message}")]
  Schema { message: String },

  /// A field is present and well-typed but its value is out of range.
  #[error("validation error in {field}: {message}")]
  Validation { field: String, message: String },
}

impl LoadError {
  fn schema(message: impl Into<String>) -> Self {
    LoadError::Schema {
      message: message.into(),
    }
  }

  fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    LoadError::Validation {
      field: field.into(),
      message: message.into(),
    }
  }
}

/// Load a manifest from a file.
pub fn load_file(path: &Path, params: &BTreeMap<String, String>) -> Result<ImageDescriptor, LoadError> {
  load_file_with_overrides(path, None, params)
}

/// Load a manifest from a file, merging an overrides document over it.
///
/// Parameters are substituted in both documents. Validation runs on the
/// merged result, so an override may supply a field the manifest lacks.
pub fn load_file_with_overrides(
  path: &Path,
  overrides: Option<&Path>,
  params: &BTreeMap<String, String>,
) -> Result<ImageDescriptor, LoadError> {
  let text = read(path)?;
  let overrides = overrides.map(read).transpose()?;
  load_layers(&text, overrides.as_deref(), params)
}

/// Load a manifest from its text.
pub fn load_str(text: &str, params: &BTreeMap<String, String>) -> Result<ImageDescriptor, LoadError> {
  load_layers(text, None, params)
}

/// Load a manifest from its text with an overrides document merged over it.
pub fn load_str_with_overrides(
  text: &str,
  overrides: &str,
  params: &BTreeMap<String, String>,
) -> Result<ImageDescriptor, LoadError> {
  load_layers(text, Some(overrides), params)
}

fn read(path: &Path) -> Result<String, LoadError> {
  debug!(path = %path.display(), "reading manifest");
  std::fs::read_to_string(path).map_err(|source| LoadError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn parse(text: &str, params: &BTreeMap<String, String>) -> Result<Value, LoadError> {
  let text = params::substitute(text, params)?;
  serde_yaml::from_str(&text).map_err(|e| LoadError::schema(format!("invalid YAML: {e}")))
}

fn load_layers(
  text: &str,
  overrides: Option<&str>,
  params: &BTreeMap<String, String>,
) -> Result<ImageDescriptor, LoadError> {
  let mut value = parse(text, params)?;
  if let Some(overrides) = overrides {
    match parse(overrides, params)? {
      Value::Mapping(layer) => overrides::merge(&mut value, layer),
      Value::Null => {}
      _ => return Err(LoadError::schema("overrides must be a mapping at the top level")),
    }
  }
  check_shape(&value)?;

  let raw: RawDescriptor = serde_yaml::from_value(value).map_err(|e| LoadError::schema(e.to_string()))?;
  raw.validate()
}

fn check_shape(value: &Value) -> Result<(), LoadError> {
  let Value::Mapping(map) = value else {
    return Err(LoadError::schema("manifest must be a mapping at the top level"));
  };

  for field in REQUIRED_FIELDS {
    match map.get(field) {
      None | Some(Value::Null) => {
        return Err(LoadError::schema(format!("missing required field `{field}`")));
      }
      Some(_) => {}
    }
  }

  for key in map.keys() {
    match key.as_str() {
      Some(k) if KNOWN_FIELDS.contains(&k) => {}
      Some(k) => warn!(key = %k, "ignoring unknown manifest field"),
      None => return Err(LoadError::schema("manifest keys must be strings")),
    }
  }

  Ok(())
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
  name: String,
  #[serde(default, deserialize_with = "scalar_string")]
  version: Option<String>,
  #[serde(default, deserialize_with = "scalar_string")]
  release: Option<String>,
  #[serde(default)]
  description: Option<String>,
  from: String,
  #[serde(default)]
  labels: Vec<RawLabel>,
  #[serde(default)]
  envs: Vec<RawEnv>,
  #[serde(default)]
  ports: Vec<RawPort>,
  cmd: Vec<String>,
  #[serde(default)]
  entrypoint: Option<Vec<String>>,
  #[serde(default)]
  user: Option<u32>,
  #[serde(default)]
  volumes: Vec<String>,
  #[serde(default)]
  workdir: Option<String>,
  #[serde(default)]
  packages: Vec<String>,
  #[serde(default)]
  scripts: Vec<RawScript>,
  #[serde(default)]
  sources: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
  name: String,
  #[serde(deserialize_with = "required_scalar_string")]
  value: String,
}

#[derive(Debug, Deserialize)]
struct RawEnv {
  name: String,
  #[serde(default, deserialize_with = "scalar_string")]
  value: Option<String>,
  #[serde(default, deserialize_with = "scalar_string")]
  example: Option<String>,
  #[serde(default)]
  description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPort {
  value: i64,
}

#[derive(Debug, Deserialize)]
struct RawScript {
  package: String,
  #[serde(default)]
  exec: Option<String>,
  #[serde(default)]
  user: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
  artifact: String,
  #[serde(default)]
  name: Option<String>,
  md5: String,
  #[serde(default)]
  sha1: Option<String>,
  #[serde(default)]
  sha256: Option<String>,
}

impl RawDescriptor {
  fn validate(self) -> Result<ImageDescriptor, LoadError> {
    if self.name.trim().is_empty() {
      return Err(LoadError::validation("name", "must not be empty"));
    }
    if self.from.trim().is_empty() {
      return Err(LoadError::validation("from", "must not be empty"));
    }
    if self.cmd.is_empty() {
      return Err(LoadError::validation("cmd", "must contain at least one argument"));
    }

    for (i, label) in self.labels.iter().enumerate() {
      if label.name.is_empty() {
        return Err(LoadError::validation(format!("labels[{i}].name"), "must not be empty"));
      }
    }

    for (i, env) in self.envs.iter().enumerate() {
      if env.name.is_empty() {
        return Err(LoadError::validation(format!("envs[{i}].name"), "must not be empty"));
      }
    }

    let mut ports = Vec::with_capacity(self.ports.len());
    let mut seen = HashSet::new();
    for (i, port) in self.ports.iter().enumerate() {
      let field = format!("ports[{i}].value");
      let value = u16::try_from(port.value)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| LoadError::validation(&field, format!("{} is outside 1-65535", port.value)))?;
      if !seen.insert(value) {
        return Err(LoadError::validation(field, format!("port {value} is declared twice")));
      }
      ports.push(value);
    }

    for (i, script) in self.scripts.iter().enumerate() {
      if script.package.trim().is_empty() {
        return Err(LoadError::validation(format!("scripts[{i}].package"), "must not be empty"));
      }
      if let Some(exec) = &script.exec
        && !is_bundle_relative(exec)
      {
        return Err(LoadError::validation(
          format!("scripts[{i}].exec"),
          format!("'{exec}' is not a script name inside the package"),
        ));
      }
    }

    for (i, source) in self.sources.iter().enumerate() {
      if source.artifact.trim().is_empty() {
        return Err(LoadError::validation(format!("sources[{i}].artifact"), "must not be empty"));
      }
      check_digest(i, HashAlgorithm::Md5, Some(&source.md5))?;
      check_digest(i, HashAlgorithm::Sha1, source.sha1.as_deref())?;
      check_digest(i, HashAlgorithm::Sha256, source.sha256.as_deref())?;
      if let Some(name) = &source.name
        && (name.is_empty() || name.contains('/') || name == "..")
      {
        return Err(LoadError::validation(
          format!("sources[{i}].name"),
          format!("'{name}' is not a plain filename"),
        ));
      }
    }

    Ok(ImageDescriptor {
      name: self.name,
      version: self.version,
      release: self.release,
      description: self.description,
      base_image: self.from,
      labels: self
        .labels
        .into_iter()
        .map(|l| Label {
          name: l.name,
          value: l.value,
        })
        .collect(),
      envs: self
        .envs
        .into_iter()
        .map(|e| EnvVar {
          name: e.name,
          value: e.value,
          example: e.example,
          description: e.description,
        })
        .collect(),
      ports,
      cmd: self.cmd,
      entrypoint: self.entrypoint,
      user: self.user,
      volumes: self.volumes,
      workdir: self.workdir,
      packages: self.packages,
      scripts: self
        .scripts
        .into_iter()
        .map(|s| ScriptStep {
          package: s.package,
          exec: s.exec,
          user: s.user,
        })
        .collect(),
      sources: self
        .sources
        .into_iter()
        .map(|s| SourceArtifact {
          artifact: s.artifact,
          name: s.name,
          md5: s.md5,
          sha1: s.sha1,
          sha256: s.sha256,
        })
        .collect(),
    })
  }
}

/// True for a non-empty relative path made only of normal components, so it
/// cannot leave the directory it is joined onto.
pub fn is_bundle_relative(exec: &str) -> bool {
  let path = Path::new(exec);
  !exec.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn check_digest(index: usize, algorithm: HashAlgorithm, value: Option<&str>) -> Result<(), LoadError> {
  match value {
    Some(v) if !is_lower_hex(v, algorithm.hex_len()) => Err(LoadError::validation(
      format!("sources[{index}].{algorithm}"),
      format!("'{v}' is not {} lowercase hex characters", algorithm.hex_len()),
    )),
    _ => Ok(()),
  }
}

/// Accept strings, numbers and booleans for fields that are strings to the
/// image but often written unquoted (`version: 1.0`, `value: true`).
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s)),
    Some(Value::Number(n)) => Ok(Some(n.to_string())),
    Some(Value::Bool(b)) => Ok(Some(b.to_string())),
    Some(other) => Err(de::Error::custom(format!("expected a scalar, found {other:?}"))),
  }
}

fn required_scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  scalar_string(deserializer)?.ok_or_else(|| de::Error::custom("expected a scalar, found null"))
}
