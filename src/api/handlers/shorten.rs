//! Handler for the link shortening endpoint.

use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use std::net::SocketAddr;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::application::services::ShortenCommand;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Creates a short URL, or returns the live one already held for the URL.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/some/long/path",
///   "code": "my-link"
/// }
/// ```
///
/// `code` is optional; when absent or blank a random code is generated.
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "code": "my-link",
///   "original_url": "https://example.com/some/long/path",
///   "short_url": "https://s.example.com/my-link",
///   "created_at": "2025-01-01T12:00:00Z",
///   "expires_at": "2025-01-02T12:00:00Z",
///   "reused": false
/// }
/// ```
///
/// # Errors
///
/// - `400` invalid URL or code (an unreadable body counts as a missing URL)
/// - `409` custom code already held by a live mapping
/// - `429` rate limited or throttled, with `Retry-After`
/// - `500` / `503` allocation or store failures
pub async fn shorten_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected shorten body");
        AppError::InvalidUrl("URL is required".to_string())
    })?;

    let payload = payload.normalized();
    payload.validate()?;

    let command = ShortenCommand {
        url: payload.url,
        code: payload.code,
        client_ip: client_ip(&headers, peer, state.behind_proxy),
    };

    let outcome = state.shorten_service.shorten(command).await?;
    let short_url = state.shorten_service.short_url(&outcome.short_url.code);

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse::from_outcome(outcome, short_url)),
    ))
}
