//! SQLite repository implementations.
//!
//! Concrete implementations of the domain repository traits using SQLx with
//! bound parameters. Timestamps are stored as UTC epoch seconds.
//!
//! - [`SqliteShortUrlRepository`] - short URL storage, lookups and click counts
//! - [`SqliteWindowRepository`] - fixed-window abuse counters
//! - [`pool`] - pool construction and migrations

pub mod pool;
pub mod sqlite_short_url_repository;
pub mod sqlite_window_repository;

pub use sqlite_short_url_repository::SqliteShortUrlRepository;
pub use sqlite_window_repository::SqliteWindowRepository;
