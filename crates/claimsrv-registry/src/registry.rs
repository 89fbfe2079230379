//! # Claim Registry
//!
//! Owns the versioned root state. A root version is the number of leaves
//! committed to the accumulator; version 0 is the empty tree with the
//! all-zero root. Every non-duplicate insert publishes exactly one new
//! version.
//!
//! ## Locking
//!
//! - `writer` serializes inserts end to end, so leaf indices are assigned
//!   without gaps and the store sees records in order.
//! - `state` guards the accumulator and handle index. Inserts hold its
//!   write lock only for the in-memory append, after the store append has
//!   returned. Reads never wait on disk I/O.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use claimsrv_core::{Claim, Handle, Hash};
use claimsrv_crypto::{
    leaf_hash, InclusionProof, MerkleMountainRange, PublicKey, RootSignature, RootSigner,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::error::{RegistryError, StoreError};
use crate::store::{ClaimRecord, ClaimStore};

/// A published root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootInfo {
    /// Bagged accumulator root.
    pub root: Hash,
    /// Root version (leaf count).
    pub version: u64,
    /// Number of claims covered; equal to `version`.
    pub size: u64,
    /// Service signature over `(version, root)`.
    pub signature: RootSignature,
}

/// A stored claim with its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEntry {
    /// Content-derived handle.
    pub handle: Handle,
    /// The claim.
    pub claim: Claim,
    /// Leaf position in the accumulator.
    pub leaf_index: u64,
}

/// A claim with its inclusion proof against a specific root version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimProof {
    /// The claim.
    pub claim: Claim,
    /// Its handle.
    pub handle: Handle,
    /// Inclusion proof.
    pub proof: InclusionProof,
    /// Root the proof verifies against.
    pub root: Hash,
    /// Version of that root.
    pub version: u64,
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The claim was new and a root version was published.
    Inserted {
        /// Handle of the claim.
        handle: Handle,
        /// Leaf position assigned.
        leaf_index: u64,
        /// New root version.
        version: u64,
        /// New root.
        root: Hash,
    },
    /// The identical claim was already stored; nothing changed.
    Duplicate {
        /// Handle of the claim.
        handle: Handle,
        /// Leaf position of the stored claim.
        leaf_index: u64,
        /// Current root version.
        version: u64,
        /// Current root.
        root: Hash,
    },
}

impl InsertOutcome {
    /// Handle of the claim.
    pub fn handle(&self) -> Handle {
        match self {
            Self::Inserted { handle, .. } | Self::Duplicate { handle, .. } => *handle,
        }
    }

    /// Leaf position of the claim.
    pub fn leaf_index(&self) -> u64 {
        match self {
            Self::Inserted { leaf_index, .. } | Self::Duplicate { leaf_index, .. } => *leaf_index,
        }
    }

    /// Root version after the insert.
    pub fn version(&self) -> u64 {
        match self {
            Self::Inserted { version, .. } | Self::Duplicate { version, .. } => *version,
        }
    }

    /// Root after the insert.
    pub fn root(&self) -> Hash {
        match self {
            Self::Inserted { root, .. } | Self::Duplicate { root, .. } => *root,
        }
    }

    /// Whether the claim was already present.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

#[derive(Default)]
struct State {
    mmr: MerkleMountainRange,
    claims: Vec<Claim>,
    by_handle: HashMap<Handle, u64>,
}

impl State {
    fn push(&mut self, claim: Claim) -> Hash {
        let handle = claim.handle();
        let root = self.mmr.append(leaf_hash(&claim.digest()));
        self.by_handle.insert(handle, self.claims.len() as u64);
        self.claims.push(claim);
        root
    }

    fn version(&self) -> u64 {
        self.mmr.size()
    }
}

/// The claim registry: store, handle index, and accumulator.
pub struct ClaimRegistry {
    store: Arc<dyn ClaimStore>,
    signer: RootSigner,
    writer: Mutex<()>,
    state: RwLock<State>,
}

impl std::fmt::Debug for ClaimRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimRegistry")
            .field("store", &self.store.kind())
            .field("version", &self.version())
            .field("signer", &self.signer)
            .finish()
    }
}

impl ClaimRegistry {
    /// Open a registry over `store`, replaying every persisted record.
    pub fn open(store: Arc<dyn ClaimStore>, signer: RootSigner) -> Result<Self, RegistryError> {
        let records = store.load_all()?;
        let mut state = State::default();
        for (i, record) in records.into_iter().enumerate() {
            if record.leaf_index != i as u64 {
                return Err(StoreError::Corrupt {
                    line: i + 1,
                    reason: format!(
                        "record {i} carries leaf index {}",
                        record.leaf_index
                    ),
                }
                .into());
            }
            let handle = record.claim.handle();
            if state.by_handle.contains_key(&handle) {
                return Err(StoreError::Corrupt {
                    line: i + 1,
                    reason: format!("handle {handle} stored twice"),
                }
                .into());
            }
            state.push(record.claim);
        }
        tracing::info!(
            store = store.kind(),
            claims = state.claims.len(),
            root = %state.mmr.root(),
            "claim registry opened"
        );
        Ok(Self {
            store,
            signer,
            writer: Mutex::new(()),
            state: RwLock::new(state),
        })
    }

    /// Insert a claim.
    ///
    /// Returns [`InsertOutcome::Duplicate`] if the identical claim is
    /// already stored, and [`RegistryError::IndexConflict`] if its index
    /// slot holds different data. On any error the root is unchanged.
    pub fn insert(&self, claim: Claim) -> Result<InsertOutcome, RegistryError> {
        let _writer = self.writer.lock();
        let handle = claim.handle();

        let leaf_index = {
            let state = self.state.read();
            if let Some(&existing) = state.by_handle.get(&handle) {
                if state.claims[existing as usize] == claim {
                    tracing::debug!(%handle, leaf_index = existing, "duplicate claim");
                    return Ok(InsertOutcome::Duplicate {
                        handle,
                        leaf_index: existing,
                        version: state.version(),
                        root: state.mmr.root(),
                    });
                }
                tracing::warn!(%handle, "rejected claim with conflicting data");
                return Err(RegistryError::IndexConflict { handle });
            }
            state.version()
        };

        let record = ClaimRecord {
            leaf_index,
            claim: claim.clone(),
            stored_at: Utc::now(),
        };
        self.store.append(&record).map_err(|e| {
            tracing::error!(%handle, error = %e, "claim store append failed");
            e
        })?;

        let mut state = self.state.write();
        let root = state.push(claim);
        let version = state.version();
        drop(state);

        tracing::info!(%handle, leaf_index, version, %root, "claim inserted");
        Ok(InsertOutcome::Inserted {
            handle,
            leaf_index,
            version,
            root,
        })
    }

    /// Look up a claim by handle.
    pub fn get(&self, handle: &Handle) -> Result<ClaimEntry, RegistryError> {
        let state = self.state.read();
        let leaf_index = *state
            .by_handle
            .get(handle)
            .ok_or(RegistryError::NotFound(*handle))?;
        Ok(ClaimEntry {
            handle: *handle,
            claim: state.claims[leaf_index as usize].clone(),
            leaf_index,
        })
    }

    /// The latest published root.
    pub fn root(&self) -> RootInfo {
        let (version, root) = {
            let state = self.state.read();
            (state.version(), state.mmr.root())
        };
        self.root_info(version, root)
    }

    /// The root published at `version`.
    pub fn root_at(&self, version: u64) -> Result<RootInfo, RegistryError> {
        let root = {
            let state = self.state.read();
            check_version(version, state.version())?;
            state.mmr.root_at(version)?
        };
        Ok(self.root_info(version, root))
    }

    /// Inclusion proof for `handle` against `version` (latest if `None`).
    pub fn proof(&self, handle: &Handle, version: Option<u64>) -> Result<ClaimProof, RegistryError> {
        let state = self.state.read();
        let leaf_index = *state
            .by_handle
            .get(handle)
            .ok_or(RegistryError::NotFound(*handle))?;
        let current = state.version();
        let version = version.unwrap_or(current);
        check_version(version, current)?;
        if leaf_index >= version {
            return Err(RegistryError::ClaimNotInVersion {
                handle: *handle,
                version,
            });
        }
        let proof = state.mmr.prove(leaf_index, version)?;
        Ok(ClaimProof {
            claim: state.claims[leaf_index as usize].clone(),
            handle: *handle,
            root: proof.root,
            version,
            proof,
        })
    }

    /// Every stored claim in leaf order.
    pub fn claims_dump(&self) -> Vec<ClaimEntry> {
        let state = self.state.read();
        state
            .claims
            .iter()
            .enumerate()
            .map(|(i, claim)| ClaimEntry {
                handle: claim.handle(),
                claim: claim.clone(),
                leaf_index: i as u64,
            })
            .collect()
    }

    /// Current root version.
    pub fn version(&self) -> u64 {
        self.state.read().version()
    }

    /// Number of stored claims.
    pub fn len(&self) -> usize {
        self.state.read().claims.len()
    }

    /// Whether no claims are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Public key that verifies published root signatures.
    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    /// Backend name of the underlying store.
    pub fn store_kind(&self) -> &'static str {
        self.store.kind()
    }

    fn root_info(&self, version: u64, root: Hash) -> RootInfo {
        RootInfo {
            root,
            version,
            size: version,
            signature: self.signer.sign_root(version, &root),
        }
    }
}

fn check_version(requested: u64, current: u64) -> Result<(), RegistryError> {
    if requested > current {
        return Err(RegistryError::UnknownVersion { requested, current });
    }
    Ok(())
}

/// Check that `proof` proves `claim` under `root`.
pub fn verify_claim_proof(claim: &Claim, proof: &InclusionProof, root: &Hash) -> bool {
    proof.verifies(&leaf_hash(&claim.digest()), root)
}
