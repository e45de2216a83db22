//! Shared application state injected into handlers.

use std::sync::Arc;

use crate::application::services::ShortenService;
use crate::infrastructure::persistence::{SqliteShortUrlRepository, SqliteWindowRepository};

/// Shortening service wired to the SQLite repositories.
pub type AppShortenService = ShortenService<SqliteShortUrlRepository, SqliteWindowRepository>;

#[derive(Clone)]
pub struct AppState {
    pub shorten_service: Arc<AppShortenService>,
    /// When true, the client IP is read from `X-Forwarded-For` / `X-Real-IP`.
    pub behind_proxy: bool,
}

impl AppState {
    pub fn new(shorten_service: Arc<AppShortenService>, behind_proxy: bool) -> Self {
        Self {
            shorten_service,
            behind_proxy,
        }
    }
}
