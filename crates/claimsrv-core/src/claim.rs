//! # Claims
//!
//! A [`Claim`] is an immutable `(indexData, data)` pair. `indexData`
//! determines the claim's [`Handle`] and therefore its storage slot; `data`
//! is the payload. Both fields are validated at construction and on
//! deserialization.
//!
//! ## Canonical Bytes
//!
//! ```text
//! u32be(len(indexData)) || indexData || u32be(len(data)) || data
//! ```
//!
//! The length prefixes make the encoding injective: moving bytes from one
//! field to the other always changes the digest.

use serde::{Deserialize, Serialize};

use crate::encoding::hex_bytes;
use crate::error::ValidationError;
use crate::hash::{tags, Handle, Hash};

/// Maximum size of `indexData` and of `data`, in bytes.
pub const MAX_FIELD_BYTES: usize = 4096;

/// An immutable claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawClaim")]
pub struct Claim {
    #[serde(with = "hex_bytes")]
    index_data: Vec<u8>,
    #[serde(with = "hex_bytes")]
    data: Vec<u8>,
}

/// Unvalidated wire form; converted through [`Claim::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaim {
    #[serde(with = "hex_bytes")]
    index_data: Vec<u8>,
    #[serde(with = "hex_bytes")]
    data: Vec<u8>,
}

impl TryFrom<RawClaim> for Claim {
    type Error = ValidationError;

    fn try_from(raw: RawClaim) -> Result<Self, Self::Error> {
        Claim::new(raw.index_data, raw.data)
    }
}

fn check_field(name: &'static str, value: &[u8]) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(name));
    }
    if value.len() > MAX_FIELD_BYTES {
        return Err(ValidationError::FieldTooLong {
            field: name,
            max: MAX_FIELD_BYTES,
            actual: value.len(),
        });
    }
    Ok(())
}

impl Claim {
    /// Build a claim, rejecting empty or oversized fields.
    pub fn new(index_data: Vec<u8>, data: Vec<u8>) -> Result<Self, ValidationError> {
        check_field("indexData", &index_data)?;
        check_field("data", &data)?;
        Ok(Self { index_data, data })
    }

    /// Index bytes.
    pub fn index_data(&self) -> &[u8] {
        &self.index_data
    }

    /// Payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The claim's handle, derived from `indexData` alone.
    pub fn handle(&self) -> Handle {
        Handle::from_index_data(&self.index_data)
    }

    /// Length-prefixed canonical encoding.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.index_data.len() + self.data.len());
        // Field lengths are bounded by MAX_FIELD_BYTES, well within u32.
        out.extend_from_slice(&(self.index_data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.index_data);
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// `SHA256(0x03 || canonical_bytes)`; the value committed in the accumulator leaf.
    pub fn digest(&self) -> Hash {
        Hash::tagged(tags::CLAIM, &[&self.canonical_bytes()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Claim {
        let aux = b"asdfasdfasdfasdfasdfasdfasdfasdfasdfasdfasdfasdfasdfasdfasdfasdf".to_vec();
        Claim::new(aux.clone(), aux).unwrap()
    }

    #[test]
    fn new_rejects_empty_fields() {
        assert_eq!(
            Claim::new(vec![], vec![1]),
            Err(ValidationError::EmptyField("indexData"))
        );
        assert_eq!(
            Claim::new(vec![1], vec![]),
            Err(ValidationError::EmptyField("data"))
        );
    }

    #[test]
    fn new_rejects_oversized_fields() {
        let big = vec![0u8; MAX_FIELD_BYTES + 1];
        assert!(matches!(
            Claim::new(big.clone(), vec![1]),
            Err(ValidationError::FieldTooLong { field: "indexData", .. })
        ));
        assert!(matches!(
            Claim::new(vec![1], big),
            Err(ValidationError::FieldTooLong { field: "data", .. })
        ));
        assert!(Claim::new(vec![0u8; MAX_FIELD_BYTES], vec![1]).is_ok());
    }

    #[test]
    fn canonical_bytes_layout() {
        let claim = Claim::new(vec![0xaa], vec![0xbb, 0xcc]).unwrap();
        assert_eq!(
            claim.canonical_bytes(),
            vec![0, 0, 0, 1, 0xaa, 0, 0, 0, 2, 0xbb, 0xcc]
        );
    }

    #[test]
    fn digest_changes_with_data_handle_does_not() {
        let a = Claim::new(b"idx".to_vec(), b"one".to_vec()).unwrap();
        let b = Claim::new(b"idx".to_vec(), b"two".to_vec()).unwrap();
        assert_eq!(a.handle(), b.handle());
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn serde_round_trip_uses_camel_case_hex() {
        let claim = sample();
        let json = serde_json::to_value(&claim).unwrap();
        let index = json["indexData"].as_str().unwrap();
        assert!(index.starts_with("0x6173646661736466"));
        assert_eq!(json["data"], json["indexData"]);
        let back: Claim = serde_json::from_value(json).unwrap();
        assert_eq!(back, claim);
    }

    #[test]
    fn deserialize_validates() {
        let empty = serde_json::json!({"indexData": "0x", "data": "0x01"});
        let err = serde_json::from_value::<Claim>(empty).unwrap_err();
        assert!(err.to_string().contains("indexData must not be empty"), "got: {err}");

        let bad_hex = serde_json::json!({"indexData": "0xzz", "data": "0x01"});
        assert!(serde_json::from_value::<Claim>(bad_hex).is_err());

        let missing = serde_json::json!({"indexData": "0x01"});
        assert!(serde_json::from_value::<Claim>(missing).is_err());
    }

    proptest! {
        #[test]
        fn moving_the_field_boundary_changes_the_digest(
            bytes in proptest::collection::vec(any::<u8>(), 3..64),
            a in 1usize..1000,
            b in 1usize..1000,
        ) {
            let n = bytes.len();
            let split_a = 1 + a % (n - 1);
            let split_b = 1 + b % (n - 1);
            prop_assume!(split_a != split_b);
            let ca = Claim::new(bytes[..split_a].to_vec(), bytes[split_a..].to_vec()).unwrap();
            let cb = Claim::new(bytes[..split_b].to_vec(), bytes[split_b..].to_vec()).unwrap();
            prop_assert_ne!(ca.digest(), cb.digest());
        }
    }
}
