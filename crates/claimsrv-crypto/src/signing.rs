//! # Root Signing
//!
//! Every published root is signed with the service's Ed25519 key over
//!
//! ```text
//! "claimsrv/root/v1" || u64be(version) || root
//! ```
//!
//! Binding the version into the message means a signature for one version
//! cannot be replayed for another version with the same root bytes.

use std::fmt;

use claimsrv_core::{decode_hex, encode_hex, Hash};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CryptoError;

/// Domain prefix of the signed root message.
pub const ROOT_SIGNATURE_DOMAIN: &[u8] = b"claimsrv/root/v1";

/// The exact bytes signed for `(version, root)`.
pub fn root_message(version: u64, root: &Hash) -> Vec<u8> {
    let mut msg = Vec::with_capacity(ROOT_SIGNATURE_DOMAIN.len() + 8 + 32);
    msg.extend_from_slice(ROOT_SIGNATURE_DOMAIN);
    msg.extend_from_slice(&version.to_be_bytes());
    msg.extend_from_slice(root.as_bytes());
    msg
}

fn decode_fixed<const N: usize>(what: &'static str, s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode_hex(s)?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::Validation(claimsrv_core::ValidationError::WrongLength {
            what,
            expected: N,
            actual: bytes.len(),
        })
    })
}

/// Ed25519 signing key for published roots.
pub struct RootSigner {
    key: SigningKey,
}

impl RootSigner {
    /// Fresh random key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Load a 32-byte secret key from hex.
    pub fn from_hex(secret_hex: &str) -> Result<Self, CryptoError> {
        let bytes: [u8; 32] = decode_fixed("signing key", secret_hex)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key: SigningKey::from_bytes(&bytes),
        })
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.key.verifying_key().to_bytes())
    }

    /// Sign `(version, root)`.
    pub fn sign_root(&self, version: u64, root: &Hash) -> RootSignature {
        RootSignature(self.key.sign(&root_message(version, root)).to_bytes())
    }
}

impl fmt::Debug for RootSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootSigner")
            .field("public_key", &self.public_key())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Ed25519 public key, serialized as hex.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        decode_fixed("public key", s).map(Self)
    }
}

/// Ed25519 signature over a root message, serialized as hex.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RootSignature(pub [u8; 64]);

impl RootSignature {
    /// `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        decode_fixed("signature", s).map(Self)
    }
}

macro_rules! hex_string_impls {
    ($ty:ident) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.to_hex())
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_string_impls!(PublicKey);
hex_string_impls!(RootSignature);

/// Check that `signature` is `public_key`'s signature over `(version, root)`.
pub fn verify_root_signature(
    public_key: &PublicKey,
    version: u64,
    root: &Hash,
    signature: &RootSignature,
) -> Result<(), CryptoError> {
    let vk = VerifyingKey::from_bytes(&public_key.0)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let sig = Signature::from_bytes(&signature.0);
    vk.verify(&root_message(version, root), &sig)
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimsrv_core::tags;

    fn root(n: u8) -> Hash {
        Hash::tagged(tags::NODE, &[&[n]])
    }

    #[test]
    fn sign_and_verify() {
        let signer = RootSigner::generate();
        let sig = signer.sign_root(3, &root(1));
        verify_root_signature(&signer.public_key(), 3, &root(1), &sig).unwrap();
    }

    #[test]
    fn wrong_version_or_root_fails() {
        let signer = RootSigner::generate();
        let sig = signer.sign_root(3, &root(1));
        let pk = signer.public_key();
        assert!(matches!(
            verify_root_signature(&pk, 4, &root(1), &sig),
            Err(CryptoError::VerificationFailed(_))
        ));
        assert!(verify_root_signature(&pk, 3, &root(2), &sig).is_err());
    }

    #[test]
    fn other_key_fails() {
        let a = RootSigner::generate();
        let b = RootSigner::generate();
        let sig = a.sign_root(1, &root(1));
        assert!(verify_root_signature(&b.public_key(), 1, &root(1), &sig).is_err());
    }

    #[test]
    fn from_hex_is_deterministic() {
        let hex = "0x".to_string() + &"11".repeat(32);
        let a = RootSigner::from_hex(&hex).unwrap();
        let b = RootSigner::from_hex(&hex[2..]).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign_root(7, &root(0)), b.sign_root(7, &root(0)));
    }

    #[test]
    fn from_hex_rejects_bad_keys() {
        assert!(matches!(
            RootSigner::from_hex("0x1234"),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            RootSigner::from_hex("not hex"),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn message_layout() {
        let msg = root_message(1, &Hash::ZERO);
        assert!(msg.starts_with(b"claimsrv/root/v1"));
        assert_eq!(msg.len(), 16 + 8 + 32);
        assert_eq!(&msg[16..24], &[0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn debug_redacts_secret() {
        let hex = "ab".repeat(32);
        let signer = RootSigner::from_hex(&hex).unwrap();
        let dbg = format!("{signer:?}");
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains(&hex));
    }

    #[test]
    fn signature_serde_round_trip() {
        let signer = RootSigner::generate();
        let sig = signer.sign_root(2, &root(9));
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json.len(), 2 + 2 + 128);
        let back: RootSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);

        let pk_json = serde_json::to_string(&signer.public_key()).unwrap();
        let pk: PublicKey = serde_json::from_str(&pk_json).unwrap();
        assert_eq!(pk, signer.public_key());
        assert!(serde_json::from_str::<PublicKey>("\"0x00\"").is_err());
    }
}
