//! Business logic services for the application layer.

pub mod abuse_guard;
pub mod code_allocator;
pub mod maintenance_service;
pub mod shorten_service;

pub use abuse_guard::AbuseGuard;
pub use code_allocator::CodeAllocator;
pub use maintenance_service::{MaintenanceService, MappingStatus, PurgeReport};
pub use shorten_service::{
    ResolvedTarget, ShortenCommand, ShortenOutcome, ShortenPolicy, ShortenService,
};
