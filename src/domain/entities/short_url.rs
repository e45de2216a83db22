//! Short URL entity representing a code → URL mapping with an expiry.

use chrono::{DateTime, Utc};

/// A stored mapping between a short code and its original URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortUrl {
    pub id: i64,
    pub code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub click_count: i64,
}

impl ShortUrl {
    /// Returns true while `now` is before `expires_at`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Returns true once `expires_at` has been reached.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_live(now)
    }
}

/// Input data for inserting a new mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShortUrl {
    pub code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
