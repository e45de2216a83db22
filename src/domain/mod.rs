//! Domain layer: entities, repository contracts and the time source.
//!
//! - [`entities`] - Core data structures
//! - [`repositories`] - Data access trait definitions
//! - [`clock`] - Injectable time source
//!
//! The domain layer has no dependencies on the HTTP layer; business rules live
//! in [`crate::application::services`].

pub mod clock;
pub mod entities;
pub mod repositories;
