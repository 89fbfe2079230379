//! # claimsrv-crypto — Cryptographic Primitives for the Claim Registry
//!
//! - **Merkle Mountain Range (MMR)**: the append-only accumulator over claim
//!   digests. Produces a single root per version and compact inclusion
//!   proofs against the current or any historical root.
//! - **Root signing**: Ed25519 signatures binding a root to its version, so
//!   clients can check that a root was published by this service.
//!
//! The hashing scheme (domain tags, sibling ordering, peak bagging) is fixed
//! and documented in [`mmr`] so independent implementations produce
//! byte-identical roots and proofs.

pub mod error;
pub mod mmr;
pub mod signing;

pub use error::CryptoError;
pub use mmr::{
    bag_peaks, build_peaks, leaf_hash, node_hash, verify_inclusion_proof, InclusionProof,
    MerkleMountainRange, PathStep, Peak, Side,
};
pub use signing::{verify_root_signature, PublicKey, RootSignature, RootSigner};
