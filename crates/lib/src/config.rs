//! Builder connection settings.
//!
//! Explicit arguments win over the environment:
//! - URL: argument, else `FNBUILD_BUILDER_URL`
//! - secret: secret file argument, else `FNBUILD_PAYLOAD_SECRET_FILE`, else
//!   the inline `FNBUILD_PAYLOAD_SECRET`
//! - timeout: argument, else `FNBUILD_BUILD_TIMEOUT` (e.g. `10m`), else none

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use crate::consts::{BUILD_TIMEOUT_ENV, BUILDER_URL_ENV, PAYLOAD_SECRET_ENV, PAYLOAD_SECRET_FILE_ENV};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("no builder URL given; pass --builder-url or set FNBUILD_BUILDER_URL")]
  MissingUrl,

  #[error("invalid builder URL '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },

  #[error("no payload secret given; pass --payload-secret or set FNBUILD_PAYLOAD_SECRET_FILE or FNBUILD_PAYLOAD_SECRET")]
  MissingSecret,

  #[error("failed to read payload secret '{path}': {source}")]
  ReadSecret {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid build timeout '{value}': {source}")]
  InvalidTimeout {
    value: String,
    #[source]
    source: humantime::DurationError,
  },
}

/// Where to send builds and how to sign them.
#[derive(Clone)]
pub struct BuilderSettings {
  pub url: Url,
  pub hmac_secret: Vec<u8>,
  /// Whole-request deadline. `None` waits as long as the build takes.
  pub timeout: Option<Duration>,
}

impl fmt::Debug for BuilderSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BuilderSettings")
      .field("url", &self.url.as_str())
      .field("hmac_secret", &"<redacted>")
      .field("timeout", &self.timeout)
      .finish()
  }
}

impl BuilderSettings {
  pub fn resolve(
    url: Option<&str>,
    secret_file: Option<&Path>,
    timeout: Option<Duration>,
  ) -> Result<Self, ConfigError> {
    let url = resolve_url(url)?;
    let hmac_secret = resolve_secret(secret_file)?;
    let timeout = match timeout {
      Some(timeout) => Some(timeout),
      None => timeout_from_env()?,
    };

    debug!(url = %url, timeout = ?timeout, "resolved builder settings");
    Ok(Self {
      url,
      hmac_secret,
      timeout,
    })
  }
}

fn env_value(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn resolve_url(explicit: Option<&str>) -> Result<Url, ConfigError> {
  let raw = match explicit {
    Some(url) => url.to_string(),
    None => env_value(BUILDER_URL_ENV).ok_or(ConfigError::MissingUrl)?,
  };
  Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
    reason: e.to_string(),
    url: raw,
  })
}

fn resolve_secret(explicit_file: Option<&Path>) -> Result<Vec<u8>, ConfigError> {
  let file = explicit_file
    .map(Path::to_path_buf)
    .or_else(|| env_value(PAYLOAD_SECRET_FILE_ENV).map(PathBuf::from));

  if let Some(path) = file {
    let contents = fs::read_to_string(&path).map_err(|e| ConfigError::ReadSecret { path: path.clone(), source: e })?;
    debug!(path = %path.display(), "payload secret read from file");
    return Ok(contents.trim().as_bytes().to_vec());
  }

  env_value(PAYLOAD_SECRET_ENV)
    .map(|secret| secret.trim().as_bytes().to_vec())
    .ok_or(ConfigError::MissingSecret)
}

fn timeout_from_env() -> Result<Option<Duration>, ConfigError> {
  match env_value(BUILD_TIMEOUT_ENV) {
    Some(value) => humantime::parse_duration(value.trim())
      .map(Some)
      .map_err(|e| ConfigError::InvalidTimeout { value, source: e }),
    None => Ok(None),
  }
}
