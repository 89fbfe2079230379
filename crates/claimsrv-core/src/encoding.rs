//! # Hex Encoding
//!
//! Byte strings cross the API boundary as `0x`-prefixed lowercase hex.
//! Output always carries the prefix; input accepts it optionally.

use crate::error::ValidationError;

/// Longest input echoed back in an error message.
const MAX_ECHO: usize = 16;

/// Encode bytes as `0x`-prefixed lowercase hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with an optional `0x` / `0X` prefix.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, ValidationError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| {
        let shown: String = trimmed.chars().take(MAX_ECHO).collect();
        let ellipsis = if trimmed.chars().count() > MAX_ECHO { "..." } else { "" };
        ValidationError::InvalidHex(format!("{e} (input \"{shown}{ellipsis}\")"))
    })
}

/// Serde adapter for `Vec<u8>` fields carried as `0x` hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as `0x`-prefixed hex.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_hex(bytes))
    }

    /// Deserialize bytes from hex, prefix optional.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_hex(&s).map_err(serde::de::Error::custom)
    }
}
