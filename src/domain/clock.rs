//! Time source used by the shortening service and abuse guard.
//!
//! Expiry and window arithmetic never call `Utc::now()` directly so tests can
//! move time forward deterministically.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to whole seconds to match stored timestamps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        Utc.timestamp_opt(now.timestamp(), 0).single().unwrap_or(now)
    }
}

/// Manually driven clock for tests and tooling.
#[derive(Debug)]
pub struct ManualClock {
    epoch_secs: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at the given epoch second.
    pub fn at_epoch(secs: i64) -> Self {
        Self {
            epoch_secs: AtomicI64::new(secs),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.epoch_secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.epoch_secs.store(to.timestamp(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.epoch_secs.load(Ordering::SeqCst);
        DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}
