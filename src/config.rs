//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the server starts.
//!
//! ## Database
//!
//! ```bash
//! export DATABASE_URL="sqlite://snaplink.db"
//! ```
//!
//! If `DATABASE_URL` is not set, it is built from `DB_PATH`; with neither set
//! the database lives in `snaplink.db` in the working directory.
//!
//! ## Optional Variables
//!
//! - `BASE_URL` - Prefix of returned short URLs (default: `http://localhost:3000`)
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `BEHIND_PROXY` - Trust `X-Forwarded-For` / `X-Real-IP` (default: `false`)
//! - `LINK_TTL_SECONDS` - Lifetime of a new mapping (default: 86400)
//! - `CODE_LENGTH` - Length of generated codes (default: 6)
//! - `CODE_MAX_ATTEMPTS` - Random code attempts before giving up (default: 100)
//! - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECONDS` - Shorten requests per IP
//!   per window (default: 10 per 60s)
//! - `DUPLICATE_LIMIT_MAX` / `DUPLICATE_WINDOW_SECONDS` - Submissions of one
//!   URL per IP per window (default: 1 per 10s)
//! - `STORE_TIMEOUT_MS` - Deadline for each store call (default: 5000)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)

use anyhow::{Context, Result};
use chrono::Duration;
use std::env;
use std::str::FromStr;

use crate::application::services::ShortenPolicy;
use crate::domain::entities::WindowPolicy;
use crate::utils::code_generator::{MAX_CODE_LENGTH, MIN_CODE_LENGTH};

/// Longest accepted link lifetime (ten years).
pub const MAX_LINK_TTL_SECONDS: i64 = 10 * 366 * 24 * 60 * 60;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub base_url: String,
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// When true, the client IP is read from X-Forwarded-For / X-Real-IP headers.
    /// Enable only when the service is behind a trusted reverse proxy.
    pub behind_proxy: bool,

    // ── Shortening ──────────────────────────────────────────────────────────
    pub link_ttl_seconds: i64,
    pub code_length: usize,
    pub code_max_attempts: usize,

    // ── Abuse limits ────────────────────────────────────────────────────────
    pub rate_limit_max: i64,
    pub rate_limit_window_seconds: i64,
    pub duplicate_limit_max: i64,
    pub duplicate_window_seconds: i64,

    // ── Store ───────────────────────────────────────────────────────────────
    /// Deadline applied to every store call and to pool acquisition.
    pub store_timeout_ms: u64,
    pub db_max_connections: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let database_url = Self::load_database_url();
        let base_url = env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let listen_addr = env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        let behind_proxy = env::var("BEHIND_PROXY")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            base_url,
            listen_addr,
            log_level,
            log_format,
            behind_proxy,
            link_ttl_seconds: parse_env("LINK_TTL_SECONDS", 86_400)?,
            code_length: parse_env("CODE_LENGTH", 6)?,
            code_max_attempts: parse_env("CODE_MAX_ATTEMPTS", 100)?,
            rate_limit_max: parse_env("RATE_LIMIT_MAX", 10)?,
            rate_limit_window_seconds: parse_env("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            duplicate_limit_max: parse_env("DUPLICATE_LIMIT_MAX", 1)?,
            duplicate_window_seconds: parse_env("DUPLICATE_WINDOW_SECONDS", 10)?,
            store_timeout_ms: parse_env("STORE_TIMEOUT_MS", 5_000)?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
        })
    }

    /// Loads database URL with fallback to a file path.
    ///
    /// Priority:
    /// 1. `DATABASE_URL` environment variable
    /// 2. `sqlite://` + `DB_PATH`
    /// 3. `sqlite://snaplink.db`
    fn load_database_url() -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }

        let path = env::var("DB_PATH").unwrap_or_else(|_| "snaplink.db".to_string());
        format!("sqlite://{}", path)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if !self.database_url.starts_with("sqlite:") {
            anyhow::bail!(
                "DATABASE_URL must start with 'sqlite:', got '{}'",
                self.database_url
            );
        }

        let base = url::Url::parse(&self.base_url)
            .with_context(|| format!("BASE_URL is not a valid URL: '{}'", self.base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("BASE_URL must use http or https, got '{}'", self.base_url);
        }

        if !(1..=MAX_LINK_TTL_SECONDS).contains(&self.link_ttl_seconds) {
            anyhow::bail!(
                "LINK_TTL_SECONDS must be between 1 and {}, got {}",
                MAX_LINK_TTL_SECONDS,
                self.link_ttl_seconds
            );
        }

        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.code_length) {
            anyhow::bail!(
                "CODE_LENGTH must be between {} and {}, got {}",
                MIN_CODE_LENGTH,
                MAX_CODE_LENGTH,
                self.code_length
            );
        }

        if self.code_max_attempts == 0 {
            anyhow::bail!("CODE_MAX_ATTEMPTS must be at least 1");
        }

        if self.rate_limit_max < 1 || self.duplicate_limit_max < 1 {
            anyhow::bail!("RATE_LIMIT_MAX and DUPLICATE_LIMIT_MAX must be at least 1");
        }

        if self.rate_limit_window_seconds < 1 || self.duplicate_window_seconds < 1 {
            anyhow::bail!(
                "RATE_LIMIT_WINDOW_SECONDS and DUPLICATE_WINDOW_SECONDS must be at least 1"
            );
        }

        if self.store_timeout_ms == 0 {
            anyhow::bail!("STORE_TIMEOUT_MS must be greater than 0");
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }

        Ok(())
    }

    /// Deadline for a single store call.
    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.store_timeout_ms)
    }

    /// Limits handed to the shortening service.
    pub fn shorten_policy(&self) -> ShortenPolicy {
        ShortenPolicy {
            base_url: self.base_url.clone(),
            ttl: Duration::seconds(self.link_ttl_seconds),
            code_length: self.code_length,
            max_attempts: self.code_max_attempts,
            rate: WindowPolicy::new(self.rate_limit_max, self.rate_limit_window_seconds),
            duplicate: WindowPolicy::new(self.duplicate_limit_max, self.duplicate_window_seconds),
        }
    }

    /// Prints configuration summary.
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Base URL: {}", self.base_url);
        tracing::info!("  Database: {}", self.database_url);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Behind proxy: {}", self.behind_proxy);
        tracing::info!("  Link TTL: {}s", self.link_ttl_seconds);
        tracing::info!(
            "  Rate limit: {} per {}s, duplicate limit: {} per {}s",
            self.rate_limit_max,
            self.rate_limit_window_seconds,
            self.duplicate_limit_max,
            self.duplicate_window_seconds
        );
    }
}

/// Reads `key` and parses it, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
