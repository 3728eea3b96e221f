//! Ordered interceptor chains for requests, responses and errors.
//!
//! Each kind of interceptor is a single async transform. Plain closures
//! returning a future implement the traits, so most callers never name them:
//!
//! ```ignore
//! client.add_request_interceptor(|mut request: OutgoingRequest| async move {
//!   request.url.push_str("?include=client");
//!   request
//! });
//! ```

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::error::ApiError;
use super::types::{OutgoingRequest, ResponseInfo};

/// Rewrites a request before it is sent.
pub trait RequestInterceptor: Send + Sync {
  fn intercept(&self, request: OutgoingRequest) -> BoxFuture<'_, OutgoingRequest>;
}

/// Rewrites a parsed success body.
pub trait ResponseInterceptor: Send + Sync {
  fn intercept(&self, response: ResponseInfo, value: Value) -> BoxFuture<'_, Value>;
}

/// Enriches or replaces an error. Always yields an error; it cannot swallow one.
pub trait ErrorInterceptor: Send + Sync {
  fn intercept(&self, error: ApiError) -> BoxFuture<'_, ApiError>;
}

impl<F, Fut> RequestInterceptor for F
where
  F: Fn(OutgoingRequest) -> Fut + Send + Sync,
  Fut: Future<Output = OutgoingRequest> + Send + 'static,
{
  fn intercept(&self, request: OutgoingRequest) -> BoxFuture<'_, OutgoingRequest> {
    Box::pin(self(request))
  }
}

impl<F, Fut> ResponseInterceptor for F
where
  F: Fn(ResponseInfo, Value) -> Fut + Send + Sync,
  Fut: Future<Output = Value> + Send + 'static,
{
  fn intercept(&self, response: ResponseInfo, value: Value) -> BoxFuture<'_, Value> {
    Box::pin(self(response, value))
  }
}

impl<F, Fut> ErrorInterceptor for F
where
  F: Fn(ApiError) -> Fut + Send + Sync,
  Fut: Future<Output = ApiError> + Send + 'static,
{
  fn intercept(&self, error: ApiError) -> BoxFuture<'_, ApiError> {
    Box::pin(self(error))
  }
}

/// Append-only list of interceptors, applied in registration order.
pub struct InterceptorChain<I: ?Sized> {
  entries: RwLock<Vec<Arc<I>>>,
}

impl<I: ?Sized> InterceptorChain<I> {
  pub fn new() -> Self {
    Self {
      entries: RwLock::new(Vec::new()),
    }
  }

  pub fn register(&self, interceptor: Arc<I>) {
    self.entries.write().push(interceptor);
  }

  pub fn is_empty(&self) -> bool {
    self.entries.read().is_empty()
  }

  /// Copy of the current list, so the lock is never held across an await.
  fn snapshot(&self) -> Vec<Arc<I>> {
    self.entries.read().clone()
  }
}

impl<I: ?Sized> Default for InterceptorChain<I> {
  fn default() -> Self {
    Self::new()
  }
}

impl InterceptorChain<dyn RequestInterceptor> {
  pub async fn apply(&self, mut request: OutgoingRequest) -> OutgoingRequest {
    for interceptor in self.snapshot() {
      request = interceptor.intercept(request).await;
    }
    request
  }
}

impl InterceptorChain<dyn ResponseInterceptor> {
  pub async fn apply(&self, response: &ResponseInfo, mut value: Value) -> Value {
    for interceptor in self.snapshot() {
      value = interceptor.intercept(response.clone(), value).await;
    }
    value
  }
}

impl InterceptorChain<dyn ErrorInterceptor> {
  pub async fn apply(&self, mut error: ApiError) -> ApiError {
    for interceptor in self.snapshot() {
      error = interceptor.intercept(error).await;
    }
    error
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::types::RequestOptions;
  use reqwest::header::HeaderMap;
  use reqwest::{Method, StatusCode};
  use serde_json::json;
  use std::time::Duration;

  fn request(url: &str) -> OutgoingRequest {
    OutgoingRequest {
      url: url.to_string(),
      options: RequestOptions {
        method: Method::GET,
        headers: HeaderMap::new(),
        body: None,
      },
    }
  }

  #[tokio::test]
  async fn test_request_chain_runs_in_registration_order() {
    let chain: InterceptorChain<dyn RequestInterceptor> = InterceptorChain::new();
    chain.register(Arc::new(|mut request: OutgoingRequest| async move {
      request.url.push_str("/a");
      request
    }));
    chain.register(Arc::new(|mut request: OutgoingRequest| async move {
      request.url.push_str("/b");
      request
    }));

    let out = chain.apply(request("/jobs")).await;
    assert_eq!(out.url, "/jobs/a/b");
  }

  #[tokio::test]
  async fn test_slow_interceptor_finishes_before_next_runs() {
    let chain: InterceptorChain<dyn RequestInterceptor> = InterceptorChain::new();
    chain.register(Arc::new(|mut request: OutgoingRequest| async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      request.url.push_str("/slow");
      request
    }));
    chain.register(Arc::new(|mut request: OutgoingRequest| async move {
      request.url.push_str("/fast");
      request
    }));

    let out = chain.apply(request("")).await;
    assert_eq!(out.url, "/slow/fast");
  }

  #[tokio::test]
  async fn test_response_chain_threads_value() {
    let chain: InterceptorChain<dyn ResponseInterceptor> = InterceptorChain::new();
    chain.register(Arc::new(|_info: ResponseInfo, value: Value| async move {
      value.get("data").cloned().unwrap_or(Value::Null)
    }));
    chain.register(Arc::new(|info: ResponseInfo, value: Value| async move {
      json!({ "status": info.status.as_u16(), "items": value })
    }));

    let info = ResponseInfo {
      url: "https://api.test/jobs".to_string(),
      status: StatusCode::OK,
      headers: HeaderMap::new(),
    };
    let out = chain.apply(&info, json!({"data": [1]})).await;
    assert_eq!(out, json!({"status": 200, "items": [1]}));
  }

  #[tokio::test]
  async fn test_error_chain_can_replace_error() {
    let chain: InterceptorChain<dyn ErrorInterceptor> = InterceptorChain::new();
    chain.register(Arc::new(|error: ApiError| async move {
      let message = format!("[{}] {}", error.endpoint, error.message);
      error.with_message(message)
    }));

    let out = chain.apply(ApiError::transport("/jobs", "offline")).await;
    assert_eq!(out.message, "[/jobs] offline");
  }

  #[tokio::test]
  async fn test_empty_chain_is_identity() {
    let chain: InterceptorChain<dyn RequestInterceptor> = InterceptorChain::default();
    assert!(chain.is_empty());

    let out = chain.apply(request("/staff")).await;
    assert_eq!(out.url, "/staff");
  }
}
