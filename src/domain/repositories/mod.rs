//! Repository trait definitions for the domain layer.
//!
//! Implementations live in `crate::infrastructure::persistence`; mock
//! implementations are generated by `mockall` for unit tests.
//!
//! - [`ShortUrlRepository`] - code → URL mappings and click counts
//! - [`WindowRepository`] - fixed-window abuse counters

pub mod short_url_repository;
pub mod window_repository;

pub use short_url_repository::{ShortUrlRepository, StoreSummary};
pub use window_repository::WindowRepository;

#[cfg(test)]
pub use short_url_repository::MockShortUrlRepository;
#[cfg(test)]
pub use window_repository::MockWindowRepository;
