//! # claimsrv-registry — Claim Store and Proof Service
//!
//! [`ClaimRegistry`] owns the registry's state: a [`ClaimStore`] for
//! durable claim records, a handle index for lookups, and the Merkle
//! Mountain Range whose bagged root is published after every insert.
//!
//! ## Write Path
//!
//! An insert validates the claim, checks the handle index for a duplicate
//! or conflicting claim, appends a [`ClaimRecord`] to the store, and only
//! then appends the leaf to the accumulator. If the store append fails the
//! accumulator is untouched, so the published root never covers a claim
//! that is not durable.
//!
//! ## Read Path
//!
//! Lookups and proofs take a read lock on the accumulator. Nodes are
//! immutable once created, so a proof for version `v` stays valid while
//! later inserts proceed.

pub mod error;
pub mod registry;
pub mod store;

pub use error::{RegistryError, StoreError};
pub use registry::{
    verify_claim_proof, ClaimEntry, ClaimProof, ClaimRegistry, InsertOutcome, RootInfo,
};
pub use store::{ClaimRecord, ClaimStore, FileClaimStore, MemoryClaimStore, CLAIM_LOG_FILE};
