//! Validation of URLs submitted for shortening.
//!
//! The submitted string is stored verbatim (after trimming) so redirects go to
//! exactly what the user entered; parsing is only used to reject bad input.

use url::Url;

/// Longest URL accepted for shortening.
pub const MAX_URL_LENGTH: usize = 2048;

/// Reasons a submitted URL is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("URL is required.")]
    Empty,

    #[error("URL is too long (max {MAX_URL_LENGTH} characters).")]
    TooLong,

    #[error("Only http and https URLs are allowed.")]
    UnsupportedScheme,

    #[error("URL is not a valid absolute URL.")]
    Malformed,
}

/// Checks that `input` is a well-formed absolute http(s) URL with a host.
///
/// # Errors
///
/// See [`UrlValidationError`] for the rejection reasons, checked in order:
/// empty, length, scheme, structure.
pub fn validate_url(input: &str) -> Result<(), UrlValidationError> {
    if input.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    if input.chars().count() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    let url = Url::parse(input).map_err(|_| {
        if has_foreign_scheme(input) {
            UrlValidationError::UnsupportedScheme
        } else {
            UrlValidationError::Malformed
        }
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme);
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(UrlValidationError::Malformed),
    }
}

/// True when `input` starts with a `scheme:` prefix other than http/https.
fn has_foreign_scheme(input: &str) -> bool {
    input.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            && !scheme.eq_ignore_ascii_case("http")
            && !scheme.eq_ignore_ascii_case("https")
    })
}
