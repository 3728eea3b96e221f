//! Scripted transport for exercising the gateway without a network.

use futures::future::{self, BoxFuture};
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

use super::error::ApiError;
use super::transport::Transport;
use super::types::{RequestOptions, TransportResponse};

/// Canned outcome for one call.
#[derive(Debug, Clone)]
pub enum Reply {
  Json(u16, Value),
  Raw(u16, &'static str),
  Fail(&'static str),
}

/// A request the transport saw.
#[derive(Debug, Clone)]
pub struct RecordedCall {
  pub method: Method,
  pub url: String,
  pub headers: HeaderMap,
  pub body: Option<Value>,
}

/// Replies are queued per (method, url). The last reply for a route repeats
/// once the queue is down to one.
#[derive(Default)]
pub struct ScriptedTransport {
  routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
  calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reply(&self, method: Method, url: &str, reply: Reply) -> &Self {
    self
      .routes
      .lock()
      .entry((method, url.to_string()))
      .or_default()
      .push_back(reply);
    self
  }

  pub fn calls(&self) -> Vec<RecordedCall> {
    self.calls.lock().clone()
  }

  pub fn call_count(&self, method: &Method, url: &str) -> usize {
    self
      .calls
      .lock()
      .iter()
      .filter(|call| &call.method == method && call.url == url)
      .count()
  }

  fn next_reply(&self, method: &Method, url: &str) -> Option<Reply> {
    let mut routes = self.routes.lock();
    let queue = routes.get_mut(&(method.clone(), url.to_string()))?;
    if queue.len() > 1 {
      queue.pop_front()
    } else {
      queue.front().cloned()
    }
  }
}

impl Transport for ScriptedTransport {
  fn send(&self, url: String, options: RequestOptions) -> BoxFuture<'_, Result<TransportResponse, ApiError>> {
    self.calls.lock().push(RecordedCall {
      method: options.method.clone(),
      url: url.clone(),
      headers: options.headers.clone(),
      body: options.body.clone(),
    });

    let outcome = match self.next_reply(&options.method, &url) {
      Some(Reply::Json(status, value)) => Ok(response(status, value.to_string().into_bytes())),
      Some(Reply::Raw(status, body)) => Ok(response(status, body.as_bytes().to_vec())),
      Some(Reply::Fail(message)) => Err(ApiError::transport(&url, message)),
      None => Ok(response(404, br#"{"message":"no scripted reply"}"#.to_vec())),
    };

    Box::pin(future::ready(outcome))
  }
}

fn response(status: u16, body: Vec<u8>) -> TransportResponse {
  TransportResponse {
    status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    headers: HeaderMap::new(),
    body,
  }
}
