//! Application layer services implementing business logic.
//!
//! Services consume repository traits and expose the operations HTTP handlers
//! and the admin CLI call.
//!
//! - [`services::code_allocator::CodeAllocator`] - Custom or random short code allocation
//! - [`services::abuse_guard::AbuseGuard`] - Per-IP rate limit and duplicate throttle
//! - [`services::shorten_service::ShortenService`] - Shorten and redirect orchestration
//! - [`services::maintenance_service::MaintenanceService`] - Cleanup sweep and store statistics

pub(crate) mod retry;
pub mod services;
