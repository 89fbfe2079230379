//! # Hashes and Handles
//!
//! [`Hash`] is the 32-byte SHA-256 value used for roots, leaves, nodes and
//! claim digests. [`Handle`] is the content-derived identifier of a claim
//! (`hi`), a distinct newtype over `Hash`.
//!
//! ## Domain Separation
//!
//! Every hash in the registry is `SHA256(tag || parts...)` with a one-byte
//! tag from [`tags`]. The tags are part of the wire contract: two
//! independent implementations must use the same values to produce
//! byte-identical roots and proofs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::encoding::{decode_hex, encode_hex};
use crate::error::ValidationError;

/// Byte length of every hash in the registry.
pub const HASH_LEN: usize = 32;

/// Domain-separation tags prepended to every hash preimage.
pub mod tags {
    /// Accumulator leaf: `SHA256(0x00 || claim_digest)`.
    pub const LEAF: u8 = 0x00;
    /// Accumulator interior node: `SHA256(0x01 || left || right)`.
    pub const NODE: u8 = 0x01;
    /// Claim handle: `SHA256(0x02 || indexData)`.
    pub const HANDLE: u8 = 0x02;
    /// Claim digest: `SHA256(0x03 || canonical_claim_bytes)`.
    pub const CLAIM: u8 = 0x03;
}

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// The all-zero hash. Root of the empty accumulator.
    pub const ZERO: Hash = Hash([0u8; HASH_LEN]);

    /// Hash `tag || parts[0] || parts[1] || ...` with SHA-256.
    pub fn tagged(tag: u8, parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([tag]);
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Whether this is [`Hash::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// `0x`-prefixed lowercase hex (66 chars).
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    /// Parse from hex, `0x` prefix optional. Must decode to exactly 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; HASH_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ValidationError::WrongLength {
                    what: "hash",
                    expected: HASH_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; HASH_LEN]> for Hash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Content-derived identifier of a claim: `SHA256(0x02 || indexData)`.
///
/// The handle depends on the index slot only, so a claim's handle is known
/// to the client before submission.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(Hash);

impl Handle {
    /// Derive the handle for the given index data.
    pub fn from_index_data(index_data: &[u8]) -> Self {
        Self(Hash::tagged(tags::HANDLE, &[index_data]))
    }

    /// The underlying hash.
    pub fn as_hash(&self) -> &Hash {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Parse a handle from hex. Must decode to exactly 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        Hash::from_hex(s)
            .map(Self)
            .map_err(|e| match e {
                ValidationError::WrongLength {
                    expected, actual, ..
                } => ValidationError::WrongLength {
                    what: "handle",
                    expected,
                    actual,
                },
                other => other,
            })
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0.to_hex())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl FromStr for Handle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_hash_is_domain_separated() {
        let data = b"same bytes";
        let a = Hash::tagged(tags::LEAF, &[data]);
        let b = Hash::tagged(tags::NODE, &[data]);
        assert_ne!(a, b);
    }

    #[test]
    fn tagged_hash_concatenates_parts() {
        let split = Hash::tagged(tags::NODE, &[b"ab", b"cd"]);
        let joined = Hash::tagged(tags::NODE, &[b"abcd"]);
        assert_eq!(split, joined);
    }

    #[test]
    fn tagged_hash_matches_plain_sha256_of_preimage() {
        let expected: [u8; 32] = Sha256::digest([0x02u8, b'x']).into();
        assert_eq!(Hash::tagged(tags::HANDLE, &[b"x"]).0, expected);
    }

    #[test]
    fn hex_is_prefixed_and_parses_back() {
        let h = Hash::tagged(tags::CLAIM, &[b"claim"]);
        let hex = h.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(Hash::from_hex(&hex).unwrap(), h);
        assert_eq!(Hash::from_hex(&hex[2..]).unwrap(), h);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = Hash::from_hex("0xabcd").unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongLength {
                what: "hash",
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn handle_from_hex_reports_handle() {
        let err = Handle::from_hex("0x00").unwrap_err();
        assert!(err.to_string().starts_with("handle"), "got: {err}");
    }

    #[test]
    fn handle_depends_only_on_index_data() {
        let a = Handle::from_index_data(b"index");
        let b = Handle::from_index_data(b"index");
        let c = Handle::from_index_data(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn zero_hash() {
        assert!(Hash::ZERO.is_zero());
        assert!(!Hash::tagged(tags::LEAF, &[]).is_zero());
        assert_eq!(Hash::default(), Hash::ZERO);
    }

    #[test]
    fn serde_uses_hex_strings() {
        let handle = Handle::from_index_data(b"serde");
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{}\"", handle.to_hex()));
        let back: Handle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }

    #[test]
    fn serde_rejects_short_hash() {
        let result: Result<Hash, _> = serde_json::from_str("\"0x1234\"");
        assert!(result.is_err());
    }

    #[test]
    fn display_and_debug() {
        let h = Hash::ZERO;
        assert_eq!(format!("{h}"), format!("0x{}", "00".repeat(32)));
        assert!(format!("{h:?}").starts_with("Hash(0x"));
        let handle = Handle::from_index_data(b"d");
        assert!(format!("{handle:?}").starts_with("Handle(0x"));
    }
}
