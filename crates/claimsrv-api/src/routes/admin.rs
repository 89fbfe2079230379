//! # Admin Routes
//!
//! Served on the admin listener under `/api/unstable`:
//!
//! - `GET  /info`: registry summary and root signing key
//! - `GET  /claimsdump`: every stored claim in leaf order
//! - `POST /import`: bulk insert, stopping at the first failure
//! - `POST /stop`: graceful shutdown of both listeners

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use claimsrv_core::Hash;
use claimsrv_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, Validate};
use crate::routes::claims::{ClaimBody, ClaimResponse};
use crate::state::AppState;

/// Admin routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/info", get(info))
        .route("/claimsdump", get(claims_dump))
        .route("/import", post(import_claims))
        .route("/stop", post(stop))
}

/// Registry summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    /// Latest root version.
    pub version: u64,
    /// Claims stored.
    pub size: u64,
    /// Latest root.
    #[schema(value_type = String)]
    pub root: Hash,
    /// Key that verifies root signatures.
    #[schema(value_type = String)]
    pub public_key: PublicKey,
    /// Whether that key was generated at startup.
    pub key_ephemeral: bool,
    /// Claim store backend.
    pub storage: String,
}

/// Result of a bulk import.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    /// Claims newly stored.
    pub inserted: usize,
    /// Claims that were already stored.
    pub duplicates: usize,
    /// Root version after the import.
    pub version: u64,
    /// Root after the import.
    #[schema(value_type = String)]
    pub root: Hash,
}

/// Acknowledgement of a stop request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StopResponse {
    /// Always `true`.
    pub stopping: bool,
}

#[utoipa::path(
    get,
    path = "/api/unstable/info",
    responses((status = 200, description = "Registry summary", body = InfoResponse)),
    tag = "admin"
)]
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let root = state.registry.root();
    Json(InfoResponse {
        version: root.version,
        size: root.size,
        root: root.root,
        public_key: state.registry.public_key(),
        key_ephemeral: state.key_ephemeral,
        storage: state.registry.store_kind().to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/unstable/claimsdump",
    responses((status = 200, description = "All stored claims", body = Vec<ClaimResponse>)),
    tag = "admin"
)]
pub async fn claims_dump(State(state): State<AppState>) -> Json<Vec<ClaimResponse>> {
    Json(
        state
            .registry
            .claims_dump()
            .into_iter()
            .map(ClaimResponse::from)
            .collect(),
    )
}

/// Every entry is validated before anything is inserted. Inserts then run
/// in order; the first registry error aborts the import and is returned,
/// with earlier entries left in place.
#[utoipa::path(
    post,
    path = "/api/unstable/import",
    request_body = Vec<ClaimBody>,
    responses(
        (status = 200, description = "Import complete", body = ImportResponse),
        (status = 400, description = "Unparseable body", body = crate::error::ErrorBody),
        (status = 409, description = "An entry conflicts with a stored claim", body = crate::error::ErrorBody),
        (status = 422, description = "An entry is malformed", body = crate::error::ErrorBody),
        (status = 500, description = "Claim store failure; message reports entries committed", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub async fn import_claims(
    State(state): State<AppState>,
    body: Result<Json<Vec<ClaimBody>>, JsonRejection>,
) -> Result<Json<ImportResponse>, AppError> {
    let bodies = extract_json(body)?;
    let claims = bodies
        .into_iter()
        .enumerate()
        .map(|(i, b)| {
            b.validate()
                .map_err(|e| AppError::MalformedInput(format!("entry {i}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let registry = state.registry.clone();
    let result = tokio::task::spawn_blocking(move || {
        let (mut inserted, mut duplicates) = (0usize, 0usize);
        for (i, claim) in claims.into_iter().enumerate() {
            match registry.insert(claim) {
                Ok(outcome) if outcome.is_duplicate() => duplicates += 1,
                Ok(_) => inserted += 1,
                Err(e) => {
                    tracing::error!(
                        entry = i,
                        inserted,
                        duplicates,
                        error = %e,
                        "import aborted"
                    );
                    return Err((i, inserted, e));
                }
            }
        }
        Ok((inserted, duplicates))
    })
    .await
    .map_err(|e| AppError::Internal(format!("import task failed: {e}")))?;

    let (inserted, duplicates) =
        result.map_err(|(entry, inserted, e)| AppError::ImportAborted {
            entry,
            inserted,
            cause: Box::new(e.into()),
        })?;

    let root = state.registry.root();
    tracing::info!(inserted, duplicates, version = root.version, "import complete");
    Ok(Json(ImportResponse {
        inserted,
        duplicates,
        version: root.version,
        root: root.root,
    }))
}

#[utoipa::path(
    post,
    path = "/api/unstable/stop",
    responses((status = 202, description = "Shutdown started", body = StopResponse)),
    tag = "admin"
)]
pub async fn stop(State(state): State<AppState>) -> (StatusCode, Json<StopResponse>) {
    tracing::info!("shutdown requested via admin API");
    state.request_shutdown();
    (StatusCode::ACCEPTED, Json(StopResponse { stopping: true }))
}
