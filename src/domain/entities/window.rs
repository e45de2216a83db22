//! Fixed-window arithmetic shared by the rate limiter and duplicate throttle.
//!
//! Windows are aligned to the Unix epoch: the window containing `t` starts at
//! `t - t % size`. Counters reset at those boundaries, so a client can burst
//! up to twice the ceiling across one boundary.

use chrono::{DateTime, Utc};

/// A counting policy: at most `max` hits per aligned window of `size_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub max: i64,
    pub size_secs: i64,
}

impl WindowPolicy {
    pub fn new(max: i64, size_secs: i64) -> Self {
        Self { max, size_secs }
    }

    /// Epoch second at which the window containing `now` started.
    pub fn window_start(&self, now: DateTime<Utc>) -> i64 {
        let t = now.timestamp();
        t - t.rem_euclid(self.size_secs)
    }

    /// Seconds until the window containing `now` closes (at least 1).
    pub fn retry_after(&self, now: DateTime<Utc>) -> u64 {
        let end = self.window_start(now) + self.size_secs;
        (end - now.timestamp()).max(1) as u64
    }

    /// Whether a post-increment count exceeds the ceiling.
    pub fn is_exceeded(&self, count: i64) -> bool {
        count > self.max
    }
}
