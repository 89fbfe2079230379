//! # Extraction & Validation Helpers
//!
//! Request bodies arrive as wire DTOs with hex strings. [`Validate`]
//! converts a DTO into its domain type; failures become
//! [`AppError::MalformedInput`]. Bodies that do not parse at all become
//! [`AppError::BadRequest`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use claimsrv_core::{Handle, ValidationError};

use crate::error::AppError;

/// Conversion from a wire DTO to a validated domain value.
pub trait Validate {
    /// The validated value.
    type Output;

    /// Check the DTO and build the domain value.
    fn validate(self) -> Result<Self::Output, ValidationError>;
}

/// Unwrap a JSON body, mapping rejections to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Unwrap a JSON body and convert it with [`Validate`].
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Output, AppError> {
    let value = extract_json(result)?;
    Ok(value.validate()?)
}

/// Unwrap a query string, mapping rejections to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a handle from a path segment.
pub fn parse_handle(raw: &str) -> Result<Handle, AppError> {
    Ok(Handle::from_hex(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Even(u32);

    impl Validate for Even {
        type Output = u32;

        fn validate(self) -> Result<u32, ValidationError> {
            if self.0 % 2 == 0 {
                Ok(self.0)
            } else {
                Err(ValidationError::InvalidHex("odd".into()))
            }
        }
    }

    #[test]
    fn validated_json_converts() {
        assert_eq!(extract_validated_json(Ok(Json(Even(4)))).unwrap(), 4);
        assert!(matches!(
            extract_validated_json(Ok(Json(Even(3)))),
            Err(AppError::MalformedInput(_))
        ));
    }

    #[test]
    fn parse_handle_accepts_prefix_optional() {
        let h = Handle::from_index_data(b"x");
        assert_eq!(parse_handle(&h.to_hex()).unwrap(), h);
        assert_eq!(parse_handle(&h.to_hex()[2..]).unwrap(), h);
    }

    #[test]
    fn parse_handle_rejects_bad_input() {
        assert!(matches!(parse_handle("0x1234"), Err(AppError::MalformedInput(_))));
        assert!(matches!(parse_handle("zz"), Err(AppError::MalformedInput(_))));
    }
}
