//! Server spans for dispatched endpoints.

use axum::http::StatusCode;
use tracing::field::Empty;
use tracing::Span;

/// Span covering one dispatched call. Disabled when `enabled` is false.
pub fn server_span(endpoint: &str, enabled: bool) -> Span {
    if !enabled {
        return Span::none();
    }
    tracing::info_span!(
        "rpc-server",
        otel.name = %format!("{endpoint} rpc-server"),
        otel.kind = "server",
        endpoint = %endpoint,
        http.status_code = Empty,
        otel.status_code = Empty,
    )
}

/// Record the final status on `span`; statuses above 399 mark it failed.
pub fn record_status(span: &Span, status: StatusCode) {
    span.record("http.status_code", status.as_u16());
    if status.as_u16() > 399 {
        span.record("otel.status_code", "ERROR");
    }
}
