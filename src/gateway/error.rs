//! Error type shared by every failure the gateway can surface.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::types::TransportResponse;

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
  /// The request never produced a response (DNS, connect, timeout, ...)
  Transport,
  /// The server answered with a non-2xx status
  Http,
  /// A body could not be parsed or decoded into the requested type
  Parse,
  /// The request was rejected before it was sent
  InvalidRequest,
}

/// Normalized gateway error. Error interceptors receive and return this.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
  pub kind: ApiErrorKind,
  pub message: String,
  /// Endpoint the failing call targeted
  pub endpoint: String,
  pub status: Option<StatusCode>,
  /// JSON error body returned by the server, if any
  pub payload: Option<Value>,
}

impl ApiError {
  pub fn new(kind: ApiErrorKind, endpoint: &str, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
      endpoint: endpoint.to_string(),
      status: None,
      payload: None,
    }
  }

  pub fn transport(endpoint: &str, message: impl Into<String>) -> Self {
    Self::new(ApiErrorKind::Transport, endpoint, message)
  }

  pub fn parse(endpoint: &str, message: impl Into<String>) -> Self {
    Self::new(ApiErrorKind::Parse, endpoint, message)
  }

  pub fn invalid_request(endpoint: &str, message: impl Into<String>) -> Self {
    Self::new(ApiErrorKind::InvalidRequest, endpoint, message)
  }

  /// Build an error from a non-2xx response.
  pub fn from_response(endpoint: &str, response: &TransportResponse) -> Self {
    let payload = serde_json::from_slice::<Value>(&response.body).ok();
    let body = ServerErrorBody::parse(&response.body, response.status_text());

    Self {
      kind: ApiErrorKind::Http,
      message: body.into_message(),
      endpoint: endpoint.to_string(),
      status: Some(response.status),
      payload,
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = message.into();
    self
  }

  pub fn is_unauthorized(&self) -> bool {
    self.status == Some(StatusCode::UNAUTHORIZED)
  }
}

/// Result of reading a server's error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorBody {
  /// JSON body carrying a `message` string
  Parsed { message: String },
  /// Anything else; the status text stands in for the message
  Unparseable { status_text: String },
}

#[derive(Deserialize)]
struct MessageBody {
  message: String,
}

impl ServerErrorBody {
  /// Never fails: bodies that are not JSON or lack `message` fall back to
  /// `status_text`.
  pub fn parse(body: &[u8], status_text: String) -> Self {
    match serde_json::from_slice::<MessageBody>(body) {
      Ok(parsed) => Self::Parsed {
        message: parsed.message,
      },
      Err(_) => Self::Unparseable { status_text },
    }
  }

  pub fn into_message(self) -> String {
    match self {
      Self::Parsed { message } => message,
      Self::Unparseable { status_text } => status_text,
    }
  }
}
