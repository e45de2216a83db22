//! HTTP request/response tracing middleware.

use axum::body::Body;
use axum::http::Request;
use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

/// Span constructor used by [`layer`].
pub type MakeRequestSpan = fn(&Request<Body>) -> Span;

/// Trace layer type installed on the router.
pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    MakeRequestSpan,
    DefaultOnRequest,
    DefaultOnResponse,
>;

/// Creates a tracing middleware for HTTP requests.
///
/// # Logging Behavior
///
/// **On Request:**
/// - Opens an `INFO` span with method, path and HTTP version. The query
///   string is left out of the span.
///
/// **On Response:**
/// - Logs status and latency in milliseconds at `INFO`
///
/// **On Failure:**
/// - 5xx responses are logged at `WARN`
///
/// # Example Logs
///
/// ```text
/// INFO request{method=POST path=/shorten version=HTTP/1.1}: finished processing request latency=3 ms status=201
/// INFO request{method=GET path=/aB3x_Z version=HTTP/1.1}: finished processing request latency=1 ms status=302
/// ```
pub fn layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(make_span as MakeRequestSpan)
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(DefaultOnFailure::new().level(Level::WARN))
}

fn make_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}
