//! Time source for cache expiry.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time used to stamp and expire cache entries.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to. Useful for exercising TTLs.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: Mutex::new(start),
    }
  }

  /// Move the clock forward by `by`.
  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock();
    *now += by;
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new(Utc::now())
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock()
  }
}
