//! Short code generation and validation utilities.
//!
//! Random codes are drawn uniformly from the 64-symbol URL-safe alphabet;
//! custom codes are checked against the same charset with a length window.

use crate::error::AppError;
use rand::Rng;

/// The 64 symbols codes are built from.
pub const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Shortest accepted code.
pub const MIN_CODE_LENGTH: usize = 3;

/// Longest accepted code.
pub const MAX_CODE_LENGTH: usize = 32;

/// Default length of randomly generated codes.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Codes that collide with fixed routes and can never be issued.
pub const RESERVED_CODES: &[&str] = &["shorten", "health"];

/// Generates a random code of `length` symbols from [`ALPHABET`].
///
/// Each symbol is drawn independently and uniformly from the thread-local
/// CSPRNG.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code(6);
/// assert_eq!(code.len(), 6);
/// ```
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Returns true if `c` belongs to [`ALPHABET`].
pub fn is_code_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Validates a user-provided custom short code.
///
/// # Rules
///
/// - Length: 3-32 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
/// - Cannot be a reserved route name
///
/// # Errors
///
/// Returns [`AppError::InvalidCode`] if any rule is violated.
///
/// # Examples
///
/// ```ignore
/// assert!(validate_custom_code("my-link").is_ok());
/// assert!(validate_custom_code("ab").is_err());        // Too short
/// assert!(validate_custom_code("no spaces").is_err()); // Bad charset
/// ```
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    let length = code.chars().count();
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length) {
        return Err(AppError::InvalidCode(format!(
            "Short code must be between {MIN_CODE_LENGTH} and {MAX_CODE_LENGTH} characters."
        )));
    }

    if !code.chars().all(is_code_char) {
        return Err(AppError::InvalidCode(
            "Short code can only contain letters, numbers, hyphens, and underscores.".to_string(),
        ));
    }

    if is_reserved(code) {
        return Err(AppError::InvalidCode("This short code is reserved.".to_string()));
    }

    Ok(())
}

/// Returns true if `code` names a fixed route.
pub fn is_reserved(code: &str) -> bool {
    RESERVED_CODES.contains(&code)
}

/// Cheap pre-check for redirect paths: could `code` ever have been issued?
pub fn is_plausible_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= MAX_CODE_LENGTH && code.chars().all(is_code_char)
}
