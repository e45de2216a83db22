//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Look up the mapping by code
/// 2. Reject expired mappings
/// 3. Count the click (best effort)
/// 4. Return `302 Found`
///
/// # Errors
///
/// Returns 404 Not Found if the code doesn't exist.
/// Returns 410 Gone if the mapping has expired.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let target = state.shorten_service.resolve(&code).await?;
    let location = location_header(&target.target_url)?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]))
}

/// Stored URLs are kept verbatim and may contain non-ASCII text; those are
/// sent in their percent-encoded form.
fn location_header(target: &str) -> Result<HeaderValue, AppError> {
    if let Ok(value) = HeaderValue::from_str(target) {
        return Ok(value);
    }

    url::Url::parse(target)
        .ok()
        .and_then(|parsed| HeaderValue::from_str(parsed.as_str()).ok())
        .ok_or_else(|| {
            tracing::error!(target, "Stored URL cannot be used as a Location header");
            AppError::Internal
        })
}
