//! Overrides documents.
//!
//! An overrides document is a partial manifest merged over the main one
//! before validation, so one manifest can serve several targets. Top-level
//! keys replace the manifest's, except for the keyed lists:
//!
//! - `labels` and `envs` merge by `name`
//! - `ports` merge by `value`
//!
//! A keyed entry in the overrides replaces the manifest entry with the same
//! key in place; entries with new keys are appended.

use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Merge `overrides` into `base`. A non-mapping `base` is left untouched for
/// the shape check to reject.
pub fn merge(base: &mut Value, overrides: Mapping) {
  let Value::Mapping(base) = base else {
    return;
  };

  for (key, value) in overrides {
    let merge_key = match key.as_str() {
      Some("labels" | "envs") => Some("name"),
      Some("ports") => Some("value"),
      _ => None,
    };
    debug!(key = ?key.as_str(), "applying override");

    match (merge_key, base.get_mut(&key)) {
      (Some(by), Some(Value::Sequence(existing))) => match value {
        Value::Sequence(incoming) => merge_keyed(existing, incoming, by),
        other => {
          base.insert(key, other);
        }
      },
      _ => {
        base.insert(key, value);
      }
    }
  }
}

fn merge_keyed(existing: &mut Vec<Value>, incoming: Vec<Value>, by: &str) {
  for entry in incoming {
    let slot = entry
      .get(by)
      .and_then(|k| existing.iter().position(|e| e.get(by) == Some(k)));
    match slot {
      Some(index) => existing[index] = entry,
      None => existing.push(entry),
    }
  }
}
