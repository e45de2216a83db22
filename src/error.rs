//! Error taxonomy and its HTTP mapping.
//!
//! [`AppError`] is what services return and handlers render. [`StoreError`] is
//! what repositories return; it keeps insert races (`Conflict`) and transient
//! failures apart so the shortening service can retry them.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use validator::ValidationErrors;

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Errors surfaced by the shortening service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidUrl(String),

    #[error("{0}")]
    InvalidCode(String),

    #[error("This short code is already taken. Please choose another one.")]
    CodeTaken { code: String },

    #[error("Rate limit exceeded. Try again later.")]
    RateLimited { retry_after: u64 },

    #[error("Too many repeated submissions. Try again later.")]
    Throttled { retry_after: u64 },

    #[error("Short link not found")]
    NotFound,

    #[error("This short link has expired")]
    Expired,

    #[error("Unable to generate a unique short code. Please supply a custom code.")]
    AllocationExhausted,

    #[error("Storage is temporarily unavailable. Try again later.")]
    TransientStoreFailure,

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidUrl(_) | AppError::InvalidCode(_) => StatusCode::BAD_REQUEST,
            AppError::CodeTaken { .. } => StatusCode::CONFLICT,
            AppError::RateLimited { .. } | AppError::Throttled { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Expired => StatusCode::GONE,
            AppError::AllocationExhausted | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::TransientStoreFailure => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable identifier.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidUrl(_) => "invalid_url",
            AppError::InvalidCode(_) => "invalid_code",
            AppError::CodeTaken { .. } => "code_taken",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Throttled { .. } => "throttled",
            AppError::NotFound => "not_found",
            AppError::Expired => "expired",
            AppError::AllocationExhausted => "allocation_exhausted",
            AppError::TransientStoreFailure => "store_unavailable",
            AppError::Internal => "internal_error",
        }
    }

    /// Seconds the client should wait before retrying, for limiter rejections.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AppError::RateLimited { retry_after } | AppError::Throttled { retry_after } => {
                Some(*retry_after)
            }
            _ => None,
        }
    }

    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            code: self.code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = self.retry_after();
        let mut response = (status, Json(self.to_error_body())).into_response();

        if let Some(secs) = retry_after
            && let Ok(value) = HeaderValue::from_str(&secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let message_for = |field: &str, fallback: &str| {
            field_errors
                .get(field)
                .and_then(|errs| errs.first())
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| fallback.to_string())
        };

        if field_errors.contains_key("url") {
            AppError::InvalidUrl(message_for("url", "Invalid URL"))
        } else {
            AppError::InvalidCode(message_for("code", "Invalid short code"))
        }
    }
}

/// Errors returned by repository implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violation ({constraint:?})")]
    Conflict { constraint: Option<String> },

    /// The call did not finish within the configured store timeout.
    #[error("store call timed out")]
    Timeout,

    /// The database was reachable in principle but could not serve the call
    /// right now (pool exhausted, busy, I/O).
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    /// Whether the failed call is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout | StoreError::Unavailable(_))
    }
}

/// SQLite result codes for `SQLITE_BUSY`, `SQLITE_LOCKED` and their extended
/// variants.
const SQLITE_BUSY_CODES: &[&str] = &["5", "6", "261", "262", "517"];

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                return StoreError::Conflict {
                    constraint: db.constraint().map(str::to_string),
                };
            }
            if db
                .code()
                .is_some_and(|code| SQLITE_BUSY_CODES.contains(&&*code))
            {
                return StoreError::Unavailable(e);
            }
            return StoreError::Database(e);
        }

        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e)
            }
            other => StoreError::Database(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout | StoreError::Unavailable(_) | StoreError::Conflict { .. } => {
                tracing::warn!(error = %e, "Transient store failure");
                AppError::TransientStoreFailure
            }
            StoreError::Database(_) => {
                tracing::error!(error = %e, "Database error");
                AppError::Internal
            }
        }
    }
}
