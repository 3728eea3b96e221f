//! Cache key derivation.

use reqwest::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifies a cacheable request by method, endpoint and serialized body.
///
/// The body is reduced to a SHA256 digest so keys stay short no matter how
/// large the payload is. Two requests are cache-equivalent iff their keys are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  method: Method,
  endpoint: String,
  body_digest: String,
}

impl CacheKey {
  pub fn new(method: &Method, endpoint: &str, body: Option<&Value>) -> Self {
    let body_digest = body
      .map(|value| {
        let mut hasher = Sha256::new();
        hasher.update(value.to_string().as_bytes());
        hex::encode(hasher.finalize())
      })
      .unwrap_or_default();

    Self {
      method: method.clone(),
      endpoint: endpoint.to_string(),
      body_digest,
    }
  }

  /// Key for a body-less GET, the only kind the gateway stores.
  pub fn read(endpoint: &str) -> Self {
    Self::new(&Method::GET, endpoint, None)
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}", self.method, self.endpoint, self.body_digest)
  }
}
