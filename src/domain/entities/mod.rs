//! Core domain entities.
//!
//! - [`ShortUrl`] / [`NewShortUrl`] - a stored code → URL mapping and its insert form
//! - [`WindowPolicy`] - fixed-window ceiling used by the abuse guard

pub mod short_url;
pub mod window;

pub use short_url::{NewShortUrl, ShortUrl};
pub use window::WindowPolicy;
