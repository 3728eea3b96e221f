//! Bearer token suppliers.
//!
//! The gateway asks for a token on every network call and never caches it;
//! refreshing and storing tokens belongs to whoever implements the supplier.

use color_eyre::Result;
use futures::future::{self, BoxFuture};
use std::future::Future;

/// Async source of the bearer token. `Ok(None)` means "send unauthenticated".
pub trait TokenSupplier: Send + Sync {
  fn token(&self) -> BoxFuture<'_, Result<Option<String>>>;
}

impl<F, Fut> TokenSupplier for F
where
  F: Fn() -> Fut + Send + Sync,
  Fut: Future<Output = Result<Option<String>>> + Send + 'static,
{
  fn token(&self) -> BoxFuture<'_, Result<Option<String>>> {
    Box::pin(self())
  }
}

/// Supplier for clients that never authenticate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenSupplier for NoToken {
  fn token(&self) -> BoxFuture<'_, Result<Option<String>>> {
    Box::pin(future::ready(Ok(None)))
  }
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }
}

impl TokenSupplier for StaticToken {
  fn token(&self) -> BoxFuture<'_, Result<Option<String>>> {
    Box::pin(future::ready(Ok(Some(self.0.clone()))))
  }
}

/// Reads the token from an environment variable on every call, so a token
/// rotated by the identity provider is picked up without a restart.
#[derive(Debug, Clone)]
pub struct EnvToken {
  var: String,
}

impl EnvToken {
  pub fn new(var: impl Into<String>) -> Self {
    Self { var: var.into() }
  }
}

impl TokenSupplier for EnvToken {
  fn token(&self) -> BoxFuture<'_, Result<Option<String>>> {
    let token = std::env::var(&self.var)
      .ok()
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty());
    Box::pin(future::ready(Ok(token)))
  }
}
