#![deny(missing_docs)]

//! # claimsrv-core — Foundational Types for the Claim Registry
//!
//! Every other crate in the workspace depends on the types defined here.
//! There are no internal crate dependencies, only `serde`, `thiserror`,
//! `sha2` and `hex` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtypes for identifiers.** A [`Handle`] is not a [`Hash`]: a root
//!    cannot be passed where a claim handle is expected.
//!
//! 2. **Validation at construction.** A [`Claim`] can only be built through
//!    [`Claim::new`] (or deserialization, which routes through it), so every
//!    claim in the system satisfies the field-length invariants.
//!
//! 3. **Domain-separated hashing.** All hashes flow through
//!    [`Hash::tagged`] with one of the tags in [`tags`], so a leaf hash can
//!    never collide with a node hash or a handle.

pub mod claim;
pub mod encoding;
pub mod error;
pub mod hash;

pub use claim::{Claim, MAX_FIELD_BYTES};
pub use encoding::{decode_hex, encode_hex};
pub use error::ValidationError;
pub use hash::{tags, Handle, Hash, HASH_LEN};
