//! # OpenAPI Specification
//!
//! Assembles the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json` on the service listener. Service paths are listed at
//! the root; they are also reachable under `/api/unstable`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// OpenAPI document for the service and admin APIs.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "claimsrv",
        version = "0.1.0",
        description = "Claim registry with a Merkle Mountain Range accumulator, signed versioned roots, and inclusion proofs.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::claims::submit_claim,
        crate::routes::claims::get_claim,
        crate::routes::claims::get_proof,
        crate::routes::claims::verify_proof,
        crate::routes::roots::current_root,
        crate::routes::roots::root_at_version,
        crate::routes::admin::info,
        crate::routes::admin::claims_dump,
        crate::routes::admin::import_claims,
        crate::routes::admin::stop,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::claims::ClaimBody,
        crate::routes::claims::SubmitClaimResponse,
        crate::routes::claims::ClaimResponse,
        crate::routes::claims::ProofResponse,
        crate::routes::claims::VerifyProofRequest,
        crate::routes::claims::VerifyProofResponse,
        crate::routes::roots::RootResponse,
        crate::routes::admin::InfoResponse,
        crate::routes::admin::ImportResponse,
        crate::routes::admin::StopResponse,
    )),
    tags(
        (name = "claims", description = "Claim submission and inclusion proofs"),
        (name = "roots", description = "Signed accumulator roots"),
        (name = "admin", description = "Admin listener"),
    )
)]
pub struct ApiDoc;

/// Serves `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_path() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/claims",
            "/claims/{handle}",
            "/claims/{handle}/proof",
            "/proofs/verify",
            "/root",
            "/roots/{version}",
            "/api/unstable/info",
            "/api/unstable/import",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }
}
