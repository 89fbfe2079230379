//! # Cryptographic Error Types
//!
//! Structured errors for accumulator and signing operations.

use claimsrv_core::ValidationError;
use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// MMR operation error (out-of-range index or size).
    #[error("MMR error: {0}")]
    Mmr(String),

    /// Invalid Ed25519 signing or verifying key material.
    #[error("invalid Ed25519 key: {0}")]
    InvalidKey(String),

    /// Root signature did not verify.
    #[error("root signature verification failed: {0}")]
    VerificationFailed(String),

    /// Malformed hex or length in key/signature input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
