//! # Validation Errors
//!
//! Errors raised when untrusted input is turned into domain types. Each
//! variant carries enough context for a client to fix its request.

use thiserror::Error;

/// Validation errors for claims, hashes and hex-encoded input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The input is not valid hexadecimal.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    /// A fixed-length value decoded to the wrong number of bytes.
    #[error("{what} must be exactly {expected} bytes, got {actual}")]
    WrongLength {
        /// What was being decoded.
        what: &'static str,
        /// The required byte length.
        expected: usize,
        /// The decoded byte length.
        actual: usize,
    },

    /// A claim field is empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A claim field exceeds the maximum size.
    #[error("{field} must not exceed {max} bytes, got {actual}")]
    FieldTooLong {
        /// The offending field name as it appears on the wire.
        field: &'static str,
        /// The maximum permitted size.
        max: usize,
        /// The actual size.
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = ValidationError::WrongLength {
            what: "handle",
            expected: 32,
            actual: 31,
        };
        assert_eq!(err.to_string(), "handle must be exactly 32 bytes, got 31");

        let err = ValidationError::FieldTooLong {
            field: "indexData",
            max: 4096,
            actual: 5000,
        };
        assert!(err.to_string().contains("indexData"));
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn empty_field_names_the_field() {
        assert_eq!(
            ValidationError::EmptyField("data").to_string(),
            "data must not be empty"
        );
    }
}
