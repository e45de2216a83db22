//! # Snaplink
//!
//! A small URL shortener with expiring links and persistent per-IP abuse
//! limits, built with Axum and SQLite.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer separation:
//!
//! - **Domain Layer** ([`domain`]) - Entities, the clock, and repository traits
//! - **Application Layer** ([`application`]) - Shortening, code allocation, abuse limits
//! - **Infrastructure Layer** ([`infrastructure`]) - SQLite pool and repositories
//! - **API Layer** ([`api`]) - HTTP handlers, DTOs, and middleware
//!
//! ## Features
//!
//! - Random or custom short codes, unique among live mappings
//! - Idempotent shortening: a live mapping for the same URL is reused
//! - Links expire after a configurable TTL (410 Gone afterwards)
//! - Per-IP rate limit and duplicate-submission throttle kept in the database
//! - Click counting on redirect
//!
//! ## Quick Start
//!
//! ```bash
//! export DATABASE_URL="sqlite://snaplink.db"
//! export BASE_URL="https://s.example.com"
//!
//! # Migrations are embedded and applied on startup
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{
        MaintenanceService, ShortenCommand, ShortenOutcome, ShortenPolicy, ShortenService,
    };
    pub use crate::domain::clock::{Clock, ManualClock, SystemClock};
    pub use crate::domain::entities::{NewShortUrl, ShortUrl, WindowPolicy};
    pub use crate::error::{AppError, StoreError};
    pub use crate::state::AppState;
}
