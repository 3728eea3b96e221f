//! Gateway client: the single outbound path to the back-office API.
//!
//! Every call goes through the same pipeline:
//!
//! 1. GET only: serve a live cache entry if there is one
//! 2. Ask the token supplier for a bearer token (failure means no header)
//! 3. Run request interceptors in registration order
//! 4. Send through the transport to `base_url + url`
//! 5. Non-2xx, transport and parse failures become one [`ApiError`] and go
//!    through the error interceptors exactly once
//! 6. Success bodies go through the response interceptors
//! 7. GET only: store the final value for the TTL
//!
//! Writes (`post`, `put`, `delete`) never read or fill the cache. They drop
//! every cached read that shares the endpoint or its resource family.

mod error;
mod interceptor;
mod token;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApiError, ApiErrorKind, ServerErrorBody};
pub use interceptor::{ErrorInterceptor, InterceptorChain, RequestInterceptor, ResponseInterceptor};
pub use token::{EnvToken, NoToken, StaticToken, TokenSupplier};
pub use transport::{ReqwestTransport, Transport};
pub use types::{GetOptions, OutgoingRequest, RequestOptions, ResponseInfo, TransportResponse};

use chrono::Duration;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheKey, Clock, ResponseCache};

/// How long a GET response is served from cache unless overridden.
pub const DEFAULT_CACHE_TTL_SECS: i64 = 60;

/// HTTP client with interceptors and a read cache.
///
/// Construct one per process and share it (it is `Send + Sync`, wrap it in an
/// `Arc`). Concurrent reads of the same uncached endpoint are not coalesced;
/// each one goes to the network.
pub struct GatewayClient {
  base_url: String,
  default_ttl: Duration,
  transport: Arc<dyn Transport>,
  tokens: Arc<dyn TokenSupplier>,
  cache: ResponseCache,
  request_interceptors: InterceptorChain<dyn RequestInterceptor>,
  response_interceptors: InterceptorChain<dyn ResponseInterceptor>,
  error_interceptors: InterceptorChain<dyn ErrorInterceptor>,
}

impl GatewayClient {
  /// Create a client that talks HTTP through reqwest with no timeout.
  pub fn new(
    base_url: impl Into<String>,
    tokens: impl TokenSupplier + 'static,
  ) -> color_eyre::Result<Self> {
    let transport = ReqwestTransport::new(None)?;
    Ok(Self::with_transport(base_url, tokens, Arc::new(transport)))
  }

  /// Create a client over an arbitrary transport.
  pub fn with_transport(
    base_url: impl Into<String>,
    tokens: impl TokenSupplier + 'static,
    transport: Arc<dyn Transport>,
  ) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_string();

    Self {
      base_url,
      default_ttl: Duration::seconds(DEFAULT_CACHE_TTL_SECS),
      transport,
      tokens: Arc::new(tokens),
      cache: ResponseCache::new(),
      request_interceptors: InterceptorChain::new(),
      response_interceptors: InterceptorChain::new(),
      error_interceptors: InterceptorChain::new(),
    }
  }

  /// Set the TTL used when a `get` does not pass its own.
  pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = ttl;
    self
  }

  /// Replace the cache's time source. Starts from an empty cache.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.cache = ResponseCache::with_clock(clock);
    self
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn default_ttl(&self) -> Duration {
    self.default_ttl
  }

  /// Number of entries currently held, expired ones included until read.
  pub fn cached_entries(&self) -> usize {
    self.cache.len()
  }

  pub fn add_request_interceptor(&self, interceptor: impl RequestInterceptor + 'static) {
    self.request_interceptors.register(Arc::new(interceptor));
  }

  pub fn add_response_interceptor(&self, interceptor: impl ResponseInterceptor + 'static) {
    self.response_interceptors.register(Arc::new(interceptor));
  }

  pub fn add_error_interceptor(&self, interceptor: impl ErrorInterceptor + 'static) {
    self.error_interceptors.register(Arc::new(interceptor));
  }

  /// Drop cached reads whose endpoint contains `endpoint`, or all of them.
  ///
  /// Returns how many entries were removed.
  pub fn clear_cache(&self, endpoint: Option<&str>) -> usize {
    let removed = self.cache.clear(endpoint);
    debug!(endpoint = endpoint.unwrap_or("*"), removed, "cleared cache");
    removed
  }

  /// GET `endpoint`, served from cache while the entry is live.
  pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
    self.get_with(endpoint, GetOptions::default()).await
  }

  /// GET with per-call cache options.
  pub async fn get_with<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    options: GetOptions,
  ) -> Result<T, ApiError> {
    self.ensure_endpoint(endpoint).await?;
    let key = CacheKey::read(endpoint);

    if options.cache {
      if let Some(value) = self.cache.get(&key) {
        return self.decode(endpoint, value).await;
      }
      debug!(endpoint, "cache miss");
    }

    let value = self.execute(Method::GET, endpoint, None).await?;

    if options.cache {
      let ttl = options.ttl.unwrap_or(self.default_ttl);
      self.cache.insert(key, value.clone(), ttl);
    }

    self.decode(endpoint, value).await
  }

  pub async fn post<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    body: Option<Value>,
  ) -> Result<T, ApiError> {
    self.mutate(Method::POST, endpoint, body).await
  }

  pub async fn put<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    body: Option<Value>,
  ) -> Result<T, ApiError> {
    self.mutate(Method::PUT, endpoint, body).await
  }

  pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
    self.mutate(Method::DELETE, endpoint, None).await
  }

  async fn mutate<T: DeserializeOwned>(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<Value>,
  ) -> Result<T, ApiError> {
    self.ensure_endpoint(endpoint).await?;

    self.invalidate(endpoint);
    let value = self.execute(method, endpoint, body).await?;
    // A read racing the write may have re-filled the cache with old data.
    self.invalidate(endpoint);

    self.decode(endpoint, value).await
  }

  fn invalidate(&self, endpoint: &str) {
    let removed = self.cache.invalidate_related(endpoint);
    if removed > 0 {
      debug!(endpoint, removed, "invalidated cached reads");
    }
  }

  /// Run the network part of the pipeline, routing any failure through the
  /// error interceptors.
  async fn execute(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<Value>,
  ) -> Result<Value, ApiError> {
    match self.send(method, endpoint, body).await {
      Ok(value) => Ok(value),
      Err(error) => Err(self.fail(error).await),
    }
  }

  async fn send(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<Value>,
  ) -> Result<Value, ApiError> {
    let headers = self.headers().await;
    let request = OutgoingRequest {
      url: endpoint.to_string(),
      options: RequestOptions {
        method,
        headers,
        body,
      },
    };
    let request = self.request_interceptors.apply(request).await;

    let url = format!("{}{}", self.base_url, request.url);
    debug!(method = %request.options.method, %url, "sending request");

    let response = self
      .transport
      .send(url.clone(), request.options)
      .await
      .map_err(|error| ApiError {
        endpoint: endpoint.to_string(),
        ..error
      })?;

    if !response.status.is_success() {
      warn!(endpoint, status = response.status.as_u16(), "request failed");
      return Err(ApiError::from_response(endpoint, &response));
    }

    let value = if response.body.iter().all(u8::is_ascii_whitespace) {
      Value::Null
    } else {
      serde_json::from_slice(&response.body)
        .map_err(|e| ApiError::parse(endpoint, format!("Failed to parse response body: {}", e)))?
    };

    let info = ResponseInfo {
      url,
      status: response.status,
      headers: response.headers,
    };
    Ok(self.response_interceptors.apply(&info, value).await)
  }

  async fn headers(&self) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    match self.tokens.token().await {
      Ok(Some(token)) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(mut value) => {
          value.set_sensitive(true);
          headers.insert(AUTHORIZATION, value);
        }
        Err(_) => warn!("Token is not a valid header value; sending request unauthenticated"),
      },
      Ok(None) => {}
      Err(e) => warn!(error = %e, "Token supplier failed; sending request unauthenticated"),
    }

    headers
  }

  async fn decode<T: DeserializeOwned>(&self, endpoint: &str, value: Value) -> Result<T, ApiError> {
    match serde_json::from_value(value) {
      Ok(decoded) => Ok(decoded),
      Err(e) => {
        let error = ApiError::parse(endpoint, format!("Unexpected response shape: {}", e));
        Err(self.fail(error).await)
      }
    }
  }

  async fn ensure_endpoint(&self, endpoint: &str) -> Result<(), ApiError> {
    if endpoint.trim().is_empty() {
      let error = ApiError::invalid_request(endpoint, "Endpoint must not be empty");
      return Err(self.fail(error).await);
    }
    Ok(())
  }

  async fn fail(&self, error: ApiError) -> ApiError {
    self.error_interceptors.apply(error).await
  }
}
