//! # Registry Errors

use claimsrv_core::{Handle, ValidationError};
use claimsrv_crypto::CryptoError;
use thiserror::Error;

/// Errors from a [`ClaimStore`](crate::ClaimStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Persisted data is unreadable or inconsistent.
    #[error("corrupt claim log at line {line}: {reason}")]
    Corrupt {
        /// 1-based line number in the log.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A failed append could not be rolled back; the log no longer accepts
    /// writes.
    #[error("claim log refuses appends after a failed rollback")]
    Poisoned,
}

/// Errors from [`ClaimRegistry`](crate::ClaimRegistry) operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No claim is stored under this handle.
    #[error("no claim found for handle {0}")]
    NotFound(Handle),

    /// The index slot already holds a claim with different data.
    #[error("handle {handle} already holds a different claim")]
    IndexConflict {
        /// The contested handle.
        handle: Handle,
    },

    /// The requested root version has not been published.
    #[error("root version {requested} not published (current version {current})")]
    UnknownVersion {
        /// Version asked for.
        requested: u64,
        /// Latest published version.
        current: u64,
    },

    /// The claim was inserted after the requested version.
    #[error("claim {handle} is not included in root version {version}")]
    ClaimNotInVersion {
        /// The claim's handle.
        handle: Handle,
        /// Version asked for.
        version: u64,
    },

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Accumulator invariant violation.
    #[error("accumulator error: {0}")]
    Crypto(#[from] CryptoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let h = Handle::from_index_data(b"x");
        assert!(RegistryError::NotFound(h).to_string().contains(&h.to_hex()));
        let err = RegistryError::UnknownVersion {
            requested: 9,
            current: 3,
        };
        assert_eq!(
            err.to_string(),
            "root version 9 not published (current version 3)"
        );
        let corrupt = StoreError::Corrupt {
            line: 4,
            reason: "bad json".into(),
        };
        assert_eq!(corrupt.to_string(), "corrupt claim log at line 4: bad json");
    }

    #[test]
    fn store_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: RegistryError = StoreError::from(io).into();
        assert!(matches!(err, RegistryError::Storage(StoreError::Io(_))));
    }
}
