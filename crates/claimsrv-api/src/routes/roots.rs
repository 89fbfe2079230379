//! # Root Routes
//!
//! - `GET /root`: latest signed root
//! - `GET /roots/{version}`: historical signed root

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use claimsrv_core::Hash;
use claimsrv_crypto::RootSignature;
use claimsrv_registry::RootInfo;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// Root routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/root", get(current_root))
        .route("/roots/{version}", get(root_at_version))
}

/// A published root with the service's signature over `(version, root)`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    /// Bagged accumulator root; all zeros for the empty registry.
    #[schema(value_type = String)]
    pub root: Hash,
    /// Root version (number of claims committed).
    pub version: u64,
    /// Number of claims covered by the root.
    pub size: u64,
    /// Ed25519 signature over `"claimsrv/root/v1" || u64be(version) || root`.
    #[schema(value_type = String)]
    pub signature: RootSignature,
}

impl From<RootInfo> for RootResponse {
    fn from(info: RootInfo) -> Self {
        Self {
            root: info.root,
            version: info.version,
            size: info.size,
            signature: info.signature,
        }
    }
}

/// GET /root: the latest published root.
#[utoipa::path(
    get,
    path = "/root",
    responses((status = 200, description = "Latest signed root", body = RootResponse)),
    tag = "roots"
)]
pub async fn current_root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(state.registry.root().into())
}

/// GET /roots/{version}: the root published at `version`.
#[utoipa::path(
    get,
    path = "/roots/{version}",
    params(("version" = u64, Path, description = "Root version")),
    responses(
        (status = 200, description = "Signed historical root", body = RootResponse),
        (status = 404, description = "Version not published", body = crate::error::ErrorBody),
    ),
    tag = "roots"
)]
pub async fn root_at_version(
    State(state): State<AppState>,
    version: Result<Path<u64>, PathRejection>,
) -> Result<Json<RootResponse>, AppError> {
    let Path(version) = version.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(Json(state.registry.root_at(version)?.into()))
}
