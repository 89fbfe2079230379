//! # Claim Routes
//!
//! - `POST /claims`: submit a claim
//! - `GET  /claims/{handle}`: fetch a stored claim
//! - `GET  /claims/{handle}/proof`: claim with inclusion proof (`?version=N`)
//! - `POST /proofs/verify`: check a proof against a root

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use claimsrv_core::{decode_hex, encode_hex, Claim, Handle, Hash, ValidationError};
use claimsrv_crypto::InclusionProof;
use claimsrv_registry::{verify_claim_proof, ClaimEntry, ClaimProof, InsertOutcome};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_query, extract_validated_json, parse_handle, Validate,
};
use crate::state::AppState;

/// Claim routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/claims", post(submit_claim))
        .route("/claims/{handle}", get(get_claim))
        .route("/claims/{handle}/proof", get(get_proof))
        .route("/proofs/verify", post(verify_proof))
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// A claim on the wire. Both fields are hex; the `0x` prefix is optional.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimBody {
    /// Index bytes. Determines the handle.
    #[schema(example = "0x61736466")]
    pub index_data: String,
    /// Payload bytes.
    #[schema(example = "0x61736466")]
    pub data: String,
}

impl From<&Claim> for ClaimBody {
    fn from(claim: &Claim) -> Self {
        Self {
            index_data: encode_hex(claim.index_data()),
            data: encode_hex(claim.data()),
        }
    }
}

impl Validate for ClaimBody {
    type Output = Claim;

    fn validate(self) -> Result<Claim, ValidationError> {
        Claim::new(decode_hex(&self.index_data)?, decode_hex(&self.data)?)
    }
}

/// Result of `POST /claims`.
///
/// `proof` is identical to `GET /claims/{handle}/proof?version={version}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitClaimResponse {
    /// Handle of the claim.
    #[schema(value_type = String)]
    pub handle: Handle,
    /// Root after the insert.
    #[schema(value_type = String)]
    pub root: Hash,
    /// Root version after the insert.
    pub version: u64,
    /// Leaf position of the claim.
    pub leaf_index: u64,
    /// `true` if the identical claim was already stored.
    pub duplicate: bool,
    /// The claim with its inclusion proof against `root`.
    pub proof: ProofResponse,
}

impl SubmitClaimResponse {
    fn new(outcome: &InsertOutcome, proof: ClaimProof) -> Self {
        Self {
            handle: outcome.handle(),
            root: outcome.root(),
            version: outcome.version(),
            leaf_index: outcome.leaf_index(),
            duplicate: outcome.is_duplicate(),
            proof: proof.into(),
        }
    }
}

/// A stored claim.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    /// Handle of the claim.
    #[schema(value_type = String)]
    pub handle: Handle,
    /// The claim.
    pub claim: ClaimBody,
    /// Leaf position.
    pub leaf_index: u64,
}

impl From<ClaimEntry> for ClaimResponse {
    fn from(entry: ClaimEntry) -> Self {
        Self {
            handle: entry.handle,
            claim: ClaimBody::from(&entry.claim),
            leaf_index: entry.leaf_index,
        }
    }
}

/// Query parameters for `GET /claims/{handle}/proof`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProofQuery {
    /// Root version to prove against. Latest when omitted.
    pub version: Option<u64>,
}

/// A claim with its inclusion proof.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    /// The claim.
    pub claim: ClaimBody,
    /// Its handle.
    #[schema(value_type = String)]
    pub handle: Handle,
    /// Inclusion proof: sibling path to the claim's peak plus all peaks.
    #[schema(value_type = Object)]
    pub proof: InclusionProof,
    /// Root the proof verifies against.
    #[schema(value_type = String)]
    pub root: Hash,
    /// Version of that root.
    pub version: u64,
}

impl From<ClaimProof> for ProofResponse {
    fn from(p: ClaimProof) -> Self {
        Self {
            claim: ClaimBody::from(&p.claim),
            handle: p.handle,
            proof: p.proof,
            root: p.root,
            version: p.version,
        }
    }
}

/// Body of `POST /proofs/verify`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyProofRequest {
    /// The claim being proven.
    pub claim: ClaimBody,
    /// Proof as returned by the proof endpoint.
    #[schema(value_type = Object)]
    pub proof: InclusionProof,
    /// Root to check against.
    #[schema(value_type = String)]
    pub root: Hash,
}

/// Result of `POST /proofs/verify`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyProofResponse {
    /// Whether the proof binds the claim to the root.
    pub valid: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /claims: Submit a claim.
///
/// Returns 201 for a new claim and 200 when the identical claim is
/// already stored. Either way the response carries the claim's proof
/// against the returned root.
#[utoipa::path(
    post,
    path = "/claims",
    request_body = ClaimBody,
    responses(
        (status = 201, description = "Claim stored, new root published", body = SubmitClaimResponse),
        (status = 200, description = "Identical claim already stored", body = SubmitClaimResponse),
        (status = 400, description = "Unparseable body", body = crate::error::ErrorBody),
        (status = 409, description = "Index slot holds different data", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed hex or field size", body = crate::error::ErrorBody),
        (status = 500, description = "Claim store failure", body = crate::error::ErrorBody),
    ),
    tag = "claims"
)]
pub async fn submit_claim(
    State(state): State<AppState>,
    body: Result<Json<ClaimBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let claim = extract_validated_json(body)?;
    let registry = state.registry.clone();
    let (outcome, proof) = tokio::task::spawn_blocking(move || {
        let outcome = registry.insert(claim)?;
        let proof = registry.proof(&outcome.handle(), Some(outcome.version()))?;
        Ok::<_, claimsrv_registry::RegistryError>((outcome, proof))
    })
    .await
    .map_err(|e| AppError::Internal(format!("insert task failed: {e}")))??;

    let status = if outcome.is_duplicate() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(SubmitClaimResponse::new(&outcome, proof))))
}

/// GET /claims/{handle}: Fetch a stored claim.
#[utoipa::path(
    get,
    path = "/claims/{handle}",
    params(("handle" = String, Path, description = "32-byte claim handle, hex")),
    responses(
        (status = 200, description = "Stored claim", body = ClaimResponse),
        (status = 404, description = "Unknown handle", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed handle", body = crate::error::ErrorBody),
    ),
    tag = "claims"
)]
pub async fn get_claim(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<ClaimResponse>, AppError> {
    let handle = parse_handle(&handle)?;
    let entry = state.registry.get(&handle)?;
    Ok(Json(entry.into()))
}

/// GET /claims/{handle}/proof: Claim with inclusion proof.
#[utoipa::path(
    get,
    path = "/claims/{handle}/proof",
    params(
        ("handle" = String, Path, description = "32-byte claim handle, hex"),
        ProofQuery,
    ),
    responses(
        (status = 200, description = "Claim and proof", body = ProofResponse),
        (status = 404, description = "Unknown handle or version, or claim not in version", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed handle", body = crate::error::ErrorBody),
    ),
    tag = "claims"
)]
pub async fn get_proof(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    query: Result<Query<ProofQuery>, QueryRejection>,
) -> Result<Json<ProofResponse>, AppError> {
    let handle = parse_handle(&handle)?;
    let query = extract_query(query)?;
    let proof = state.registry.proof(&handle, query.version)?;
    Ok(Json(proof.into()))
}

/// POST /proofs/verify: Check a proof against a root.
#[utoipa::path(
    post,
    path = "/proofs/verify",
    request_body = VerifyProofRequest,
    responses(
        (status = 200, description = "Verification result", body = VerifyProofResponse),
        (status = 400, description = "Unparseable body", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed claim", body = crate::error::ErrorBody),
    ),
    tag = "claims"
)]
pub async fn verify_proof(
    body: Result<Json<VerifyProofRequest>, JsonRejection>,
) -> Result<Json<VerifyProofResponse>, AppError> {
    let req = extract_json(body)?;
    let claim = req.claim.validate()?;
    let valid = verify_claim_proof(&claim, &req.proof, &req.root);
    Ok(Json(VerifyProofResponse { valid }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_body_round_trips_through_claim() {
        let claim = Claim::new(vec![0xab], vec![0xcd, 0xef]).unwrap();
        let body = ClaimBody::from(&claim);
        assert_eq!(body.index_data, "0xab");
        assert_eq!(body.data, "0xcdef");
        assert_eq!(body.validate().unwrap(), claim);
    }

    #[test]
    fn claim_body_accepts_bare_hex() {
        let body = ClaimBody {
            index_data: "ab".into(),
            data: "0Xcd".into(),
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn claim_body_rejects_bad_fields() {
        let bad_hex = ClaimBody {
            index_data: "0xg1".into(),
            data: "0x01".into(),
        };
        assert!(matches!(bad_hex.validate(), Err(ValidationError::InvalidHex(_))));
        let empty = ClaimBody {
            index_data: "0x01".into(),
            data: "0x".into(),
        };
        assert_eq!(empty.validate(), Err(ValidationError::EmptyField("data")));
    }

    #[test]
    fn submit_response_uses_camel_case() {
        use claimsrv_crypto::RootSigner;
        use claimsrv_registry::{ClaimRegistry, MemoryClaimStore};
        use std::sync::Arc;

        let reg =
            ClaimRegistry::open(Arc::new(MemoryClaimStore::new()), RootSigner::generate()).unwrap();
        let outcome = reg.insert(Claim::new(b"a".to_vec(), b"b".to_vec()).unwrap()).unwrap();
        let proof = reg.proof(&outcome.handle(), Some(outcome.version())).unwrap();
        let json = serde_json::to_value(SubmitClaimResponse::new(&outcome, proof)).unwrap();
        assert_eq!(json["leafIndex"], 0);
        assert_eq!(json["duplicate"], false);
        assert!(json["handle"].as_str().unwrap().starts_with("0x"));
        assert_eq!(json["proof"]["root"], json["root"]);
        assert_eq!(json["proof"]["version"], 1);
    }
}
