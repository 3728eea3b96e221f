//! In-memory response store with per-entry expiry.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::family::{shares_family, ResourceFamily};
use super::key::CacheKey;

/// A single cached response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub value: Value,
  pub stored_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  /// Endpoint the entry was fetched from, matched by invalidation
  pub endpoint: String,
  /// Families computed when the entry was written
  pub families: Vec<ResourceFamily>,
}

impl CacheEntry {
  fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

/// Response cache keyed by [`CacheKey`].
///
/// Expired entries are dropped lazily when read. Writes against an endpoint
/// drop related entries eagerly through [`ResponseCache::invalidate_related`].
pub struct ResponseCache {
  entries: DashMap<CacheKey, CacheEntry>,
  clock: Arc<dyn Clock>,
}

impl ResponseCache {
  pub fn new() -> Self {
    Self::with_clock(Arc::new(SystemClock))
  }

  pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
    Self {
      entries: DashMap::new(),
      clock,
    }
  }

  /// Get a live value for `key`, evicting it if it has expired.
  pub fn get(&self, key: &CacheKey) -> Option<Value> {
    let now = self.clock.now();

    if let Some(entry) = self.entries.get(key) {
      if !entry.is_expired(now) {
        let age = now - entry.stored_at;
        debug!(%key, age_ms = age.num_milliseconds(), "cache hit");
        return Some(entry.value.clone());
      }
    }

    self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    None
  }

  /// Store `value` under `key` for `ttl`. A TTL past the end of the
  /// calendar keeps the entry until it is invalidated.
  pub fn insert(&self, key: CacheKey, value: Value, ttl: Duration) {
    let stored_at = self.clock.now();
    let expires_at = stored_at
      .checked_add_signed(ttl)
      .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let endpoint = key.endpoint().to_string();
    let families = ResourceFamily::classify(&endpoint);

    self.entries.insert(
      key,
      CacheEntry {
        value,
        stored_at,
        expires_at,
        endpoint,
        families,
      },
    );
  }

  /// Drop every entry a write to `endpoint` could have made stale.
  ///
  /// An entry goes if its endpoint contains `endpoint`, or if it shares a
  /// resource family with it. Returns how many entries were removed.
  pub fn invalidate_related(&self, endpoint: &str) -> usize {
    let written = ResourceFamily::classify(endpoint);
    self.remove_where(|entry| {
      entry.endpoint.contains(endpoint) || shares_family(&entry.families, &written)
    })
  }

  /// Remove entries whose endpoint contains `endpoint`, or everything when
  /// no endpoint is given. Returns how many entries were removed.
  pub fn clear(&self, endpoint: Option<&str>) -> usize {
    match endpoint {
      Some(endpoint) => self.remove_where(|entry| entry.endpoint.contains(endpoint)),
      None => {
        let removed = self.entries.len();
        self.entries.clear();
        removed
      }
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn remove_where(&self, mut doomed: impl FnMut(&CacheEntry) -> bool) -> usize {
    let mut removed = 0;
    self.entries.retain(|_, entry| {
      if doomed(entry) {
        removed += 1;
        false
      } else {
        true
      }
    });
    removed
  }
}

impl Default for ResponseCache {
  fn default() -> Self {
    Self::new()
  }
}
