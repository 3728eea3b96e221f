//! In-memory read cache for the API gateway.
//!
//! This module provides an endpoint-agnostic response cache that:
//! - Stores GET responses under a key derived from method, path and body
//! - Expires entries lazily once their TTL has elapsed
//! - Tags entries with resource families for coarse invalidation after writes

mod clock;
mod family;
mod key;
mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use family::ResourceFamily;
pub use key::CacheKey;
pub use storage::{CacheEntry, ResponseCache};
