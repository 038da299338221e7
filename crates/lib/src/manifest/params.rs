//! Parameter substitution for manifest text.
//!
//! Manifests may contain parameter references that are filled in before the
//! document is parsed, so one manifest can describe several image variants.
//!
//! # Formats
//!
//! - `{{NAME}}` - value of parameter `NAME`; an error if it is not supplied
//! - `{{NAME:default}}` - value of parameter `NAME`, or `default`
//!
//! Names match `[A-Za-z_][A-Za-z0-9_]*`. The default runs up to the closing
//! `}}` and may itself contain colons (`{{FROM:rhel:7}}` defaults to `rhel:7`).
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use dockyard_lib::manifest::params::substitute;
//!
//! let mut params = BTreeMap::new();
//! params.insert("FROM".to_string(), "centos:7".to_string());
//!
//! let text = substitute("from: {{FROM:rhel:7}}", &params).unwrap();
//! assert_eq!(text, "from: centos:7");
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// A parsed parameter reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
  pub name: String,
  pub default: Option<String>,
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Param(Param),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
  #[error("unclosed parameter at position {0}")]
  Unclosed(usize),

  #[error("invalid parameter name: '{0}'")]
  InvalidName(String),

  #[error("parameter '{0}' has no value and no default")]
  Missing(String),
}

/// Parse text into literal and parameter segments.
pub fn parse(input: &str) -> Result<Vec<Segment>, ParamError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut rest = input;
  let mut offset = 0;

  while let Some(start) = rest.find("{{") {
    literal.push_str(&rest[..start]);
    let body_start = start + 2;
    let Some(len) = rest[body_start..].find("}}") else {
      return Err(ParamError::Unclosed(offset + start));
    };

    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }
    segments.push(Segment::Param(parse_param(&rest[body_start..body_start + len])?));

    let consumed = body_start + len + 2;
    offset += consumed;
    rest = &rest[consumed..];
  }

  literal.push_str(rest);
  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_param(content: &str) -> Result<Param, ParamError> {
  let (name, default) = match content.split_once(':') {
    Some((name, default)) => (name.trim(), Some(default.to_string())),
    None => (content.trim(), None),
  };

  if !is_valid_name(name) {
    return Err(ParamError::InvalidName(name.to_string()));
  }

  Ok(Param {
    name: name.to_string(),
    default,
  })
}

fn is_valid_name(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
    _ => false,
  }
}

/// Replace every parameter reference in `input`.
pub fn substitute(input: &str, params: &BTreeMap<String, String>) -> Result<String, ParamError> {
  let mut result = String::with_capacity(input.len());

  for segment in parse(input)? {
    match segment {
      Segment::Literal(s) => result.push_str(&s),
      Segment::Param(p) => {
        let value = params
          .get(&p.name)
          .or(p.default.as_ref())
          .ok_or_else(|| ParamError::Missing(p.name.clone()))?;
        result.push_str(value);
      }
    }
  }

  Ok(result)
}
