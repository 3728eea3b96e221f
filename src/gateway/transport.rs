//! Network boundary of the gateway.

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use std::time::Duration;

use super::error::ApiError;
use super::types::{RequestOptions, TransportResponse};

/// Sends one request and hands back the raw response.
///
/// Implementations report only failures that prevented a response; non-2xx
/// statuses are returned as ordinary responses.
pub trait Transport: Send + Sync {
  fn send(&self, url: String, options: RequestOptions) -> BoxFuture<'_, Result<TransportResponse, ApiError>>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  /// Build a transport. Without a timeout a stalled server stalls the call.
  pub fn new(timeout: Option<Duration>) -> Result<Self> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }

    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }

  async fn execute(&self, url: String, options: RequestOptions) -> Result<TransportResponse, ApiError> {
    let mut request = self
      .client
      .request(options.method, &url)
      .headers(options.headers);

    if let Some(body) = &options.body {
      let bytes = serde_json::to_vec(body)
        .map_err(|e| ApiError::invalid_request(&url, format!("Failed to encode body: {}", e)))?;
      request = request.body(bytes);
    }

    let response = request
      .send()
      .await
      .map_err(|e| ApiError::transport(&url, e.to_string()))?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
      .bytes()
      .await
      .map_err(|e| ApiError::transport(&url, e.to_string()))?
      .to_vec();

    Ok(TransportResponse {
      status,
      headers,
      body,
    })
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, url: String, options: RequestOptions) -> BoxFuture<'_, Result<TransportResponse, ApiError>> {
    Box::pin(self.execute(url, options))
  }
}
