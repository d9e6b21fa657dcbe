//! Signed HTTP client for the Builder service.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use super::sign::signature_header_value;
use super::{BuildResult, BuildResultStream, BuilderError};
use crate::config::BuilderSettings;
use crate::consts::{self, ARCHIVE_CONTENT_TYPE, NDJSON_CONTENT_TYPE, SIGNATURE_HEADER};

/// Submits build archives to a Builder at `url`.
#[derive(Clone)]
pub struct FunctionBuilder {
  url: Url,
  client: Client,
  hmac_secret: Vec<u8>,
}

impl fmt::Debug for FunctionBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FunctionBuilder")
      .field("url", &self.url.as_str())
      .field("hmac_secret", &"<redacted>")
      .finish_non_exhaustive()
  }
}

impl FunctionBuilder {
  /// A builder with an empty signing secret. Use [`Self::with_hmac_secret`] to set one.
  pub fn new(url: Url, client: Client) -> Self {
    Self {
      url,
      client,
      hmac_secret: Vec::new(),
    }
  }

  pub fn with_hmac_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
    self.hmac_secret = secret.into();
    self
  }

  pub fn from_settings(settings: &BuilderSettings) -> Result<Self, BuilderError> {
    let client = Client::builder().timeout(settings.timeout).build()?;
    Ok(Self::new(settings.url.clone(), client).with_hmac_secret(settings.hmac_secret.clone()))
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  /// Submit `archive` and wait for the single JSON result.
  pub fn build(&self, archive: &Path) -> Result<BuildResult, BuilderError> {
    let started = Instant::now();
    let response = self.signed_request(archive, None)?.send()?;
    let status = response.status();
    let body = response.text()?;

    if !is_accepted(status) {
      return Err(rejected(status, body));
    }

    let result = if body.trim().is_empty() {
      BuildResult::default()
    } else {
      match serde_json::from_str::<BuildResult>(&body) {
        Ok(result) => result,
        Err(e) => return Err(BuilderError::Decode { body, source: e }),
      }
    };

    info!(
      status = status.as_u16(),
      build_status = %result.status,
      image = %result.image,
      elapsed = ?started.elapsed(),
      "build request completed"
    );
    Ok(result)
  }

  /// Submit `archive` and return the live event stream from the response body.
  pub fn build_with_stream(&self, archive: &Path) -> Result<BuildResultStream<Response>, BuilderError> {
    let response = self.signed_request(archive, Some(NDJSON_CONTENT_TYPE))?.send()?;
    let status = response.status();

    if !is_accepted(status) {
      let body = response.text()?;
      return Err(rejected(status, body));
    }

    info!(status = status.as_u16(), "build accepted, streaming results");
    Ok(BuildResultStream::new(response))
  }

  fn signed_request(&self, archive: &Path, accept: Option<&str>) -> Result<RequestBuilder, BuilderError> {
    let payload = fs::read(archive).map_err(|e| BuilderError::ReadArchive {
      path: archive.to_path_buf(),
      source: e,
    })?;
    let signature = signature_header_value(&self.hmac_secret, &payload)?;
    let endpoint = self.endpoint()?;

    debug!(url = %endpoint, bytes = payload.len(), "submitting signed build archive");

    let mut request = self
      .client
      .post(endpoint)
      .header(SIGNATURE_HEADER, signature)
      .header(CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
      .header(USER_AGENT, consts::USER_AGENT);
    if let Some(accept) = accept {
      request = request.header(ACCEPT, accept);
    }
    Ok(request.body(payload))
  }

  /// `<base>/build`, keeping any path prefix on the base URL.
  fn endpoint(&self) -> Result<Url, BuilderError> {
    let mut url = self.url.clone();
    url
      .path_segments_mut()
      .map_err(|_| BuilderError::InvalidUrl(self.url.to_string()))?
      .pop_if_empty()
      .push("build");
    Ok(url)
  }
}

fn is_accepted(status: StatusCode) -> bool {
  status == StatusCode::OK || status == StatusCode::ACCEPTED
}

fn rejected(status: StatusCode, body: String) -> BuilderError {
  let result = decode_best_effort(&body);
  warn!(status = status.as_u16(), "builder rejected build request");
  BuilderError::UnexpectedStatus {
    status: status.as_u16(),
    body,
    result,
  }
}

/// The body as one JSON result, or failing that its last NDJSON line.
fn decode_best_effort(body: &str) -> Option<BuildResult> {
  serde_json::from_str(body).ok().or_else(|| {
    body
      .lines()
      .rev()
      .find(|line| !line.trim().is_empty())
      .and_then(|line| serde_json::from_str(line).ok())
  })
}
