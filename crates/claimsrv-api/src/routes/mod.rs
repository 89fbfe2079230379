//! # Route Modules
//!
//! Service routes ([`claims`], [`roots`]) are mounted at `/` and again
//! under `/api/unstable`. [`admin`] routes are served on the admin listener
//! only.

pub mod admin;
pub mod claims;
pub mod roots;

use axum::Router;

use crate::state::AppState;

/// Prefix shared by the service and admin APIs.
pub const API_PREFIX: &str = "/api/unstable";

/// Claim and root routes.
pub fn service_router() -> Router<AppState> {
    Router::new()
        .merge(claims::router())
        .merge(roots::router())
}
