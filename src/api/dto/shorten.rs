//! DTOs for the link shortening endpoint.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::application::services::ShortenOutcome;

/// Compiled regex for custom code validation.
static CUSTOM_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid custom code regex"));

/// Request to shorten one URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The URL to shorten. Emptiness, length, scheme and host are checked by
    /// the service so every entry point shares one set of messages.
    #[serde(default)]
    pub url: String,

    /// Optional custom short code.
    #[validate(length(
        min = 3,
        max = 32,
        message = "Short code must be between 3 and 32 characters long."
    ))]
    #[validate(regex(
        path = *CUSTOM_CODE_REGEX,
        message = "Short code can only contain letters, numbers, hyphens, and underscores."
    ))]
    #[serde(default)]
    pub code: Option<String>,
}

impl ShortenRequest {
    /// Trims both fields; a blank code means "generate one".
    pub fn normalized(self) -> Self {
        let code = self
            .code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Self {
            url: self.url.trim().to_string(),
            code,
        }
    }
}

/// A created or reused mapping.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub code: String,
    pub original_url: String,
    pub short_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reused: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ShortenResponse {
    pub fn from_outcome(outcome: ShortenOutcome, short_url: String) -> Self {
        let message = outcome
            .reused
            .then(|| "This URL was already shortened.".to_string());
        let mapping = outcome.short_url;

        Self {
            code: mapping.code,
            original_url: mapping.original_url,
            short_url,
            created_at: mapping.created_at,
            expires_at: mapping.expires_at,
            reused: outcome.reused,
            message,
        }
    }
}
