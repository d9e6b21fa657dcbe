use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// One build event or final outcome reported by the Builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
  /// Log lines produced since the previous event.
  #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
  pub log: Vec<String>,

  /// Image reference, set once the image has been pushed.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub image: String,

  /// `in_progress` while building, then `success` or `failure`.
  #[serde(default)]
  pub status: String,
}

impl BuildResult {
  pub fn is_success(&self) -> bool {
    self.status == "success"
  }

  /// True for statuses after which the Builder sends no further events.
  pub fn is_terminal(&self) -> bool {
    matches!(self.status.as_str(), "success" | "failure" | "failed" | "error")
  }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn build_status(result: &Option<BuildResult>) -> &str {
  result.as_ref().map(|r| r.status.as_str()).unwrap_or("unknown")
}

/// Errors that can occur while submitting a build or reading its results.
#[derive(Debug, Error)]
pub enum BuilderError {
  #[error("failed to read build archive '{path}': {source}")]
  ReadArchive {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid builder URL '{0}'")]
  InvalidUrl(String),

  #[error("failed to sign build request: {0}")]
  Signing(String),

  /// Connection, TLS or timeout failure talking to the Builder.
  #[error("builder request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// An accepted response whose body is not a `BuildResult`.
  #[error("failed to decode builder response: {source}")]
  Decode {
    body: String,
    #[source]
    source: serde_json::Error,
  },

  /// The Builder rejected the request. `result` holds the body if it decoded.
  #[error(
    "failed to build function, builder responded with status code {status}, build status: {}",
    build_status(.result)
  )]
  UnexpectedStatus {
    status: u16,
    body: String,
    result: Option<BuildResult>,
  },

  #[error("failed to decode build result on line {line}: {source}")]
  StreamDecode {
    line: usize,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to read build result stream: {0}")]
  StreamRead(#[source] io::Error),

  #[error("build result stream ended without any results")]
  EmptyStream,
}
