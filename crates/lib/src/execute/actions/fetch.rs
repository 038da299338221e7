//! Artifact fetching.
//!
//! Downloads a source artifact, verifies every declared checksum, and stores
//! it in the artifacts directory. A previously stored copy that still
//! verifies is reused without touching the network.

use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::execute::types::ExecuteError;
use crate::plan::FetchArtifact;
use crate::util::hash::{self, Checksum};

/// Network-level failure reported by an [`ArtifactFetcher`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Retrieves artifact bytes by URL.
pub trait ArtifactFetcher {
  fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

/// HTTP(S) fetcher backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new(ssl_verify: bool) -> Result<Self, ExecuteError> {
    if !ssl_verify {
      warn!("TLS certificate verification disabled for artifact fetches");
    }
    let client = reqwest::Client::builder()
      .user_agent(concat!("dockyard/", env!("CARGO_PKG_VERSION")))
      .danger_accept_invalid_certs(!ssl_verify)
      .build()
      .map_err(|e| ExecuteError::HttpClient(e.to_string()))?;
    Ok(Self { client })
  }
}

impl ArtifactFetcher for HttpFetcher {
  fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
    let request = self.client.get(url);
    async move {
      let response = request.send().await.map_err(|e| TransportError(e.to_string()))?;

      if !response.status().is_success() {
        return Err(TransportError(format!("HTTP {}", response.status())));
      }

      let bytes = response.bytes().await.map_err(|e| TransportError(e.to_string()))?;
      Ok(bytes.to_vec())
    }
  }
}

/// Execute a fetch step.
///
/// Returns the path of the verified artifact. On checksum mismatch nothing is
/// written and the error names the URL declared in the manifest.
pub async fn fetch_artifact(fetcher: &impl ArtifactFetcher, step: &FetchArtifact) -> Result<PathBuf, ExecuteError> {
  if let Some(parent) = step.dest.parent() {
    fs::create_dir_all(parent).await?;
  }

  if is_cached(&step.dest, &step.checksums).await {
    info!(path = ?step.dest, "using cached artifact");
    return Ok(step.dest.clone());
  }

  info!(url = %step.url, "fetching artifact");
  let bytes = fetcher.fetch(&step.url).await.map_err(|e| ExecuteError::Fetch {
    url: step.url.clone(),
    message: e.0,
  })?;

  hash::verify_bytes(&bytes, &step.checksums).map_err(|failure| ExecuteError::ChecksumMismatch {
    url: step.artifact.clone(),
    algorithm: failure.algorithm,
    expected: failure.expected,
    actual: failure.actual,
  })?;

  // Write next to the destination and rename so a partial download never
  // looks like a cached artifact.
  let partial = partial_path(&step.dest);
  let mut file = fs::File::create(&partial).await?;
  file.write_all(&bytes).await?;
  file.flush().await?;
  drop(file);
  fs::rename(&partial, &step.dest).await?;

  info!(path = ?step.dest, size = bytes.len(), "download complete");
  Ok(step.dest.clone())
}

async fn is_cached(path: &Path, checksums: &[Checksum]) -> bool {
  if checksums.is_empty() || !fs::try_exists(path).await.unwrap_or(false) {
    return false;
  }

  debug!(path = ?path, "checking cached artifact");
  let owned_path = path.to_path_buf();
  let owned_checksums = checksums.to_vec();
  let verified = tokio::task::spawn_blocking(move || hash::verify_file(&owned_path, &owned_checksums)).await;

  match verified {
    Ok(Ok(Ok(()))) => true,
    Ok(Ok(Err(failure))) => {
      debug!(
        algorithm = %failure.algorithm,
        expected = %failure.expected,
        actual = %failure.actual,
        "cached artifact mismatch, re-downloading"
      );
      false
    }
    Ok(Err(e)) => {
      debug!(error = %e, "cached artifact unreadable, re-downloading");
      false
    }
    Err(e) => {
      warn!(error = %e, "cache check task failed");
      false
    }
  }
}

fn partial_path(dest: &Path) -> PathBuf {
  let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".part");
  dest.with_file_name(name)
}
