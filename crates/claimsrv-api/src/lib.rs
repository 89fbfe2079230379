//! # claimsrv-api — HTTP Services for the Claim Registry
//!
//! Two listeners share one [`AppState`]:
//!
//! ## Service API ([`app`])
//!
//! | Path                          | Module               |
//! |-------------------------------|----------------------|
//! | `POST /claims`                | [`routes::claims`]   |
//! | `GET  /claims/{handle}`       | [`routes::claims`]   |
//! | `GET  /claims/{handle}/proof` | [`routes::claims`]   |
//! | `POST /proofs/verify`         | [`routes::claims`]   |
//! | `GET  /root`                  | [`routes::roots`]    |
//! | `GET  /roots/{version}`       | [`routes::roots`]    |
//!
//! Each path is also served under `/api/unstable`. Health probes,
//! `/metrics` and `/openapi.json` are mounted alongside.
//!
//! ## Admin API ([`admin_app`])
//!
//! `/api/unstable/{info,claimsdump,import,stop}`, see [`routes::admin`].
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MetricsMiddleware → Handler
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use claimsrv_crypto::verify_root_signature;
use tower_http::cors::CorsLayer;

use crate::middleware::metrics::{metrics_middleware, ApiMetrics};
use crate::routes::API_PREFIX;
use crate::state::AppState;

/// Assemble the service router.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(routes::service_router())
        .nest(API_PREFIX, routes::service_router())
        .merge(openapi::router())
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if let Some(metrics) = state.metrics.clone() {
        router = router
            .route("/metrics", get(prometheus_metrics))
            .layer(from_fn(metrics_middleware))
            .layer(Extension(metrics));
    }

    router
        .layer(middleware::tracing_layer::layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Assemble the admin router.
pub fn admin_app(state: AppState) -> Router {
    Router::new()
        .nest(API_PREFIX, routes::admin::router())
        .layer(middleware::tracing_layer::layer())
        .with_state(state)
}

/// GET /metrics: refresh registry gauges, then encode.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics.set_registry_state(
        state.registry.len(),
        state.registry.version(),
        state.key_ephemeral,
    );
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: the registry answers and the latest root's signature
/// verifies with the published key.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let root = state.registry.root();
    let pk = state.registry.public_key();
    if let Err(e) = verify_root_signature(&pk, root.version, &root.root, &root.signature) {
        tracing::warn!(error = %e, "readiness check failed");
        return (StatusCode::SERVICE_UNAVAILABLE, "root signing degraded").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}
