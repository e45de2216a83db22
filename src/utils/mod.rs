//! Utility functions for code generation, URL validation, and request handling.
//!
//! - [`code_generator`] - Short code generation and validation
//! - [`url_validator`] - Submitted URL checks
//! - [`client_ip`] - Client IP extraction from the connection and proxy headers

pub mod client_ip;
pub mod code_generator;
pub mod url_validator;
