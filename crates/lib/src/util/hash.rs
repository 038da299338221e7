//! Checksum utilities for artifact verification.
//!
//! This module provides:
//! - `HashAlgorithm`: the digest families a manifest may declare for a source
//! - `Checksum`: an expected digest paired with its algorithm
//! - `hash_bytes()`: in-memory hashing of downloaded content
//! - `hash_file()`: streaming hashing of a file already on disk
//! - `verify_bytes()` / `verify_file()`: check every declared checksum

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Digest family of a declared checksum.
///
/// Ordered by preference: when a single algorithm has to be picked (for
/// example to build an artifact cache URL), the strongest one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
  Sha256,
  Sha1,
  Md5,
}

impl HashAlgorithm {
  pub const ALL: [HashAlgorithm; 3] = [HashAlgorithm::Sha256, HashAlgorithm::Sha1, HashAlgorithm::Md5];

  pub fn as_str(self) -> &'static str {
    match self {
      HashAlgorithm::Sha256 => "sha256",
      HashAlgorithm::Sha1 => "sha1",
      HashAlgorithm::Md5 => "md5",
    }
  }

  /// Length of the lowercase hex encoding of a digest.
  pub fn hex_len(self) -> usize {
    match self {
      HashAlgorithm::Sha256 => 64,
      HashAlgorithm::Sha1 => 40,
      HashAlgorithm::Md5 => 32,
    }
  }

  fn hasher(self) -> Hasher {
    match self {
      HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
      HashAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
      HashAlgorithm::Md5 => Hasher::Md5(Md5::new()),
    }
  }
}

impl fmt::Display for HashAlgorithm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

enum Hasher {
  Sha256(Sha256),
  Sha1(Sha1),
  Md5(Md5),
}

impl Hasher {
  fn update(&mut self, data: &[u8]) {
    match self {
      Hasher::Sha256(h) => h.update(data),
      Hasher::Sha1(h) => h.update(data),
      Hasher::Md5(h) => h.update(data),
    }
  }

  fn finalize_hex(self) -> String {
    match self {
      Hasher::Sha256(h) => hex::encode(h.finalize()),
      Hasher::Sha1(h) => hex::encode(h.finalize()),
      Hasher::Md5(h) => hex::encode(h.finalize()),
    }
  }
}

/// An expected digest for an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
  pub algorithm: HashAlgorithm,
  /// Lowercase hex encoding.
  pub value: String,
}

impl Checksum {
  pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Self {
    Self {
      algorithm,
      value: value.into(),
    }
  }

  pub fn md5(value: impl Into<String>) -> Self {
    Self::new(HashAlgorithm::Md5, value)
  }
}

impl fmt::Display for Checksum {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.algorithm, self.value)
  }
}

/// A declared checksum that did not match the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumFailure {
  pub algorithm: HashAlgorithm,
  pub expected: String,
  pub actual: String,
}

/// Returns true if `value` is exactly `len` lowercase hex characters.
pub fn is_lower_hex(value: &str, len: usize) -> bool {
  value.len() == len && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Hash arbitrary bytes, returning the lowercase hex digest.
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
  let mut hasher = algorithm.hasher();
  hasher.update(data);
  hasher.finalize_hex()
}

/// Hash a file's contents without loading it into memory.
pub fn hash_file(algorithm: HashAlgorithm, path: &Path) -> std::io::Result<String> {
  let mut file = fs::File::open(path)?;
  let mut hasher = algorithm.hasher();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(hasher.finalize_hex())
}

/// Check every expected checksum against `data`.
///
/// Stops at the first mismatch.
pub fn verify_bytes(data: &[u8], expected: &[Checksum]) -> Result<(), ChecksumFailure> {
  for checksum in expected {
    let actual = hash_bytes(checksum.algorithm, data);
    if !actual.eq_ignore_ascii_case(&checksum.value) {
      return Err(ChecksumFailure {
        algorithm: checksum.algorithm,
        expected: checksum.value.clone(),
        actual,
      });
    }
  }
  Ok(())
}

/// Like [`verify_bytes`] but streams the content from disk.
///
/// I/O errors come back through the outer `Result`, a mismatch through the
/// inner one.
pub fn verify_file(path: &Path, expected: &[Checksum]) -> std::io::Result<Result<(), ChecksumFailure>> {
  for checksum in expected {
    let actual = hash_file(checksum.algorithm, path)?;
    if !actual.eq_ignore_ascii_case(&checksum.value) {
      return Ok(Err(ChecksumFailure {
        algorithm: checksum.algorithm,
        expected: checksum.value.clone(),
        actual,
      }));
    }
  }
  Ok(Ok(()))
}
