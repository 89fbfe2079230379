//! # API Error Types
//!
//! [`AppError`] maps registry and validation errors to HTTP status codes
//! and a uniform JSON body:
//!
//! ```json
//! {"error": {"code": "NOT_FOUND", "message": "..."}}
//! ```
//!
//! Storage and internal failures are logged and returned with a generic
//! message. [`AppError::ImportAborted`] keeps the status of the failure it
//! wraps and adds the entry position to the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use claimsrv_core::ValidationError;
use claimsrv_registry::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `NOT_FOUND`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Application-level error that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown handle or root version (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad hex, wrong length, or a field out of bounds (422).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The index slot holds a different claim (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Claim store failure (500). Details are logged, not returned.
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else (500). Details are logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// A bulk import stopped at `entry` after committing `inserted` claims.
    #[error("import aborted at entry {entry} after {inserted} inserts: {cause}")]
    ImportAborted {
        /// Zero-based position of the failing entry.
        entry: usize,
        /// Claims committed before the failure.
        inserted: usize,
        /// The failure itself.
        cause: Box<AppError>,
    },
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::MalformedInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_INPUT"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ImportAborted { cause, .. } => cause.status_and_code(),
        }
    }

    /// Message safe to return to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "claim storage is unavailable".to_string(),
            Self::Internal(_) => "an internal error occurred".to_string(),
            Self::ImportAborted {
                entry,
                inserted,
                cause,
            } => format!(
                "{} (entry {entry}, {inserted} inserted before failure)",
                cause.public_message()
            ),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }
        let message = self.public_message();

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::MalformedInput(err.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_)
            | RegistryError::UnknownVersion { .. }
            | RegistryError::ClaimNotInVersion { .. } => Self::NotFound(err.to_string()),
            RegistryError::IndexConflict { .. } => Self::Conflict(err.to_string()),
            RegistryError::Validation(e) => e.into(),
            RegistryError::Storage(e) => Self::Storage(e.to_string()),
            RegistryError::Crypto(e) => Self::Internal(e.to_string()),
        }
    }
}
