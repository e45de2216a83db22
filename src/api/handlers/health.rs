//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};
use std::time::Instant;

use crate::api::dto::health::{ComponentCheck, HealthChecks, HealthResponse, HealthStatus};
use crate::state::AppState;

/// Reports whether the store answers.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: The store answered a probe query
/// - **503 Service Unavailable**: The probe failed or timed out
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "latency_ms": 1 }
///   }
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = probe_database(&state).await;

    let (code, status) = if database.is_ok() {
        (StatusCode::OK, HealthStatus::Healthy)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Degraded)
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks { database },
    };

    (code, Json(response))
}

async fn probe_database(state: &AppState) -> ComponentCheck {
    let started = Instant::now();
    let result = state.shorten_service.check_store().await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(()) => ComponentCheck {
            status: "ok",
            latency_ms,
            message: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database probe failed");
            ComponentCheck {
                status: "error",
                latency_ms,
                message: Some(e.to_string()),
            }
        }
    }
}
