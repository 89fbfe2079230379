//! # Request/Response Tracing

use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Span builder used by [`layer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsrvMakeSpan;

impl<B> tower_http::trace::MakeSpan<B> for ClaimsrvMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

/// `TraceLayer` for both listeners. Each request gets a span with method
/// and path; responses are logged at `INFO` with status and latency.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, ClaimsrvMakeSpan> {
    TraceLayer::new_for_http()
        .make_span_with(ClaimsrvMakeSpan)
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}
