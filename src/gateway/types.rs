//! Values that flow through the request pipeline.

use chrono::Duration;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;

/// Transport-level options for one request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
  pub method: Method,
  pub headers: HeaderMap,
  /// JSON body, serialized by the transport
  pub body: Option<Value>,
}

/// A request as seen by request interceptors.
///
/// `url` is relative to the gateway's base URL.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
  pub url: String,
  pub options: RequestOptions,
}

/// Raw response returned by a transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: Vec<u8>,
}

impl TransportResponse {
  /// Canonical reason phrase, or `HTTP <code>` for unknown statuses.
  pub fn status_text(&self) -> String {
    self
      .status
      .canonical_reason()
      .map(String::from)
      .unwrap_or_else(|| format!("HTTP {}", self.status.as_u16()))
  }
}

/// Response metadata handed to response interceptors alongside the parsed body.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
  /// Full URL that was requested
  pub url: String,
  pub status: StatusCode,
  pub headers: HeaderMap,
}

/// Per-call options for `get`.
#[derive(Debug, Clone, Copy)]
pub struct GetOptions {
  /// Read from and write to the cache
  pub cache: bool,
  /// Overrides the client's default TTL for this entry
  pub ttl: Option<Duration>,
}

impl GetOptions {
  pub fn no_cache() -> Self {
    Self {
      cache: false,
      ttl: None,
    }
  }

  pub fn with_ttl(ttl: Duration) -> Self {
    Self {
      cache: true,
      ttl: Some(ttl),
    }
  }
}

impl Default for GetOptions {
  fn default() -> Self {
    Self {
      cache: true,
      ttl: None,
    }
  }
}
