//! HMAC-SHA256 request signatures.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::BuilderError;
use crate::consts::SIGNATURE_ALGORITHM;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` keyed with `secret`.
pub fn compute_hmac(secret: &[u8], payload: &[u8]) -> Result<String, BuilderError> {
  let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| BuilderError::Signing(e.to_string()))?;
  mac.update(payload);
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Value of the signature header: `sha256=<hex digest>`.
pub fn signature_header_value(secret: &[u8], payload: &[u8]) -> Result<String, BuilderError> {
  Ok(format!("{}={}", SIGNATURE_ALGORITHM, compute_hmac(secret, payload)?))
}
