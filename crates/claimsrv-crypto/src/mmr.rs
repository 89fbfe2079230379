//! # Merkle Mountain Range (MMR)
//!
//! Append-only accumulator over claim digests. Supports compact inclusion
//! proofs against the current root and against every historical root,
//! without disclosing the rest of the claim set.
//!
//! ## Hashing (Domain Separation)
//!
//! - Leaf: `SHA256(0x00 || claim_digest)`.
//! - Node: `SHA256(0x01 || left_hash || right_hash)`.
//! - Root: peaks bagged right-to-left,
//!   `bag = node(peak[i], bag)` starting from the last peak. The empty
//!   range has the all-zero root.
//!
//! ## Layout
//!
//! Leaves are appended left to right. A range of `n` leaves decomposes into
//! perfect binary trees ("peaks") whose sizes are the set bits of `n`, from
//! the largest on the left. Nodes are stored per level:
//! `levels[h][i]` covers leaves `[i * 2^h, (i + 1) * 2^h)`. A node is
//! created once both children exist and is never modified, so the root and
//! every proof for an earlier size can be recomputed from the same storage.
//!
//! ## Proofs
//!
//! A proof carries the sibling path from the leaf up to its peak (each step
//! tagged with the side the sibling is on), the full peak list for the size
//! the proof was built at, and that size's root.

use claimsrv_core::{tags, Hash};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Leaf hash for a claim digest: `SHA256(0x00 || claim_digest)`.
pub fn leaf_hash(claim_digest: &Hash) -> Hash {
    Hash::tagged(tags::LEAF, &[claim_digest.as_bytes()])
}

/// Parent hash: `SHA256(0x01 || left || right)`.
pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    Hash::tagged(tags::NODE, &[left.as_bytes(), right.as_bytes()])
}

// ---------------------------------------------------------------------------
// Peaks
// ---------------------------------------------------------------------------

/// The root of one perfect subtree of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peak {
    /// Height of the peak (0 = single leaf).
    pub height: u32,
    /// Peak hash.
    pub hash: Hash,
}

/// Build peaks for a list of leaf hashes, left-to-right.
///
/// Stateless reference construction; [`MerkleMountainRange`] produces the
/// same peaks incrementally.
pub fn build_peaks(leaf_hashes: &[Hash]) -> Vec<Peak> {
    let mut peaks: Vec<Peak> = Vec::new();
    for leaf in leaf_hashes {
        let mut cur = Peak {
            height: 0,
            hash: *leaf,
        };
        // Merge while the top peak has the same height.
        while let Some(top) = peaks.last().copied() {
            if top.height != cur.height {
                break;
            }
            peaks.pop();
            cur = Peak {
                height: cur.height + 1,
                hash: node_hash(&top.hash, &cur.hash),
            };
        }
        peaks.push(cur);
    }
    peaks
}

/// Bag peaks into a single root, folding right-to-left.
///
/// ```text
/// bag = peaks[-1]
/// for peak in reversed(peaks[:-1]):
///     bag = node_hash(peak, bag)
/// ```
pub fn bag_peaks(peaks: &[Peak]) -> Hash {
    let Some((last, rest)) = peaks.split_last() else {
        return Hash::ZERO;
    };
    rest.iter()
        .rev()
        .fold(last.hash, |bag, peak| node_hash(&peak.hash, &bag))
}

/// Peaks as `(height, leaf_count)` from left to right for `size` leaves.
fn peak_plan(size: u64) -> Vec<(u32, u64)> {
    let mut out = Vec::new();
    let mut n = size;
    while n > 0 {
        let h = u64::BITS - 1 - n.leading_zeros();
        let cnt = 1u64 << h;
        out.push((h, cnt));
        n -= cnt;
    }
    out
}

/// `(peak_index, peak_start, peak_height)` for `leaf_index` in a range of `size`.
fn find_peak_for_leaf(size: u64, leaf_index: u64) -> Result<(usize, u64, u32), CryptoError> {
    if leaf_index >= size {
        return Err(CryptoError::Mmr(format!(
            "leaf_index {leaf_index} out of range for size {size}"
        )));
    }
    let mut start = 0u64;
    for (i, (h, cnt)) in peak_plan(size).into_iter().enumerate() {
        if leaf_index < start + cnt {
            return Ok((i, start, h));
        }
        start += cnt;
    }
    Err(CryptoError::Mmr("unable to locate peak".into()))
}

// ---------------------------------------------------------------------------
// Inclusion proof
// ---------------------------------------------------------------------------

/// Which side of the current node a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Sibling is to the left: `parent = node(sibling, current)`.
    Left,
    /// Sibling is to the right: `parent = node(current, sibling)`.
    Right,
}

impl Side {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a sibling path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Which side the sibling is on.
    pub side: Side,
    /// Sibling hash.
    pub hash: Hash,
}

/// Inclusion proof for one leaf against the root of a given range size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    /// Number of leaves in the range the proof was built for.
    pub size: u64,
    /// Position of the leaf.
    pub leaf_index: u64,
    /// `SHA256(0x00 || claim_digest)`.
    pub leaf_hash: Hash,
    /// Index of the peak containing the leaf.
    pub peak_index: usize,
    /// Height of that peak; equals `path.len()`.
    pub peak_height: u32,
    /// Sibling path from the leaf to its peak, bottom-up.
    pub path: Vec<PathStep>,
    /// All peaks of the range, left to right.
    pub peaks: Vec<Peak>,
    /// Bagged root of the range.
    pub root: Hash,
}

impl InclusionProof {
    /// Verify the proof and check it binds `leaf_hash` to `root`.
    pub fn verifies(&self, leaf_hash: &Hash, root: &Hash) -> bool {
        self.leaf_hash == *leaf_hash && self.root == *root && verify_inclusion_proof(self)
    }
}

/// Verify an inclusion proof's internal consistency.
///
/// Recomputes the peak from the leaf and path, substitutes it into the peak
/// list, and checks that bagging yields `proof.root`. Also checks that the
/// peak selection matches what `size` and `leaf_index` imply, so a proof
/// cannot claim a different position than the one it proves.
pub fn verify_inclusion_proof(proof: &InclusionProof) -> bool {
    let Ok((exp_index, _, exp_height)) = find_peak_for_leaf(proof.size, proof.leaf_index) else {
        return false;
    };
    if exp_index != proof.peak_index || exp_height != proof.peak_height {
        return false;
    }
    if proof.peaks.len() != peak_plan(proof.size).len() {
        return false;
    }
    let Some(claimed_peak) = proof.peaks.get(proof.peak_index) else {
        return false;
    };
    if claimed_peak.height != proof.peak_height || proof.path.len() != proof.peak_height as usize {
        return false;
    }

    // Sides are determined by the leaf position; reject paths that disagree.
    let mut cur = proof.leaf_hash;
    for (level, step) in proof.path.iter().enumerate() {
        let pos = proof.leaf_index >> level;
        let expected_side = if pos & 1 == 1 { Side::Left } else { Side::Right };
        if step.side != expected_side {
            return false;
        }
        cur = match step.side {
            Side::Left => node_hash(&step.hash, &cur),
            Side::Right => node_hash(&cur, &step.hash),
        };
    }
    if cur != claimed_peak.hash {
        return false;
    }

    bag_peaks(&proof.peaks) == proof.root
}

// ---------------------------------------------------------------------------
// MerkleMountainRange (stateful)
// ---------------------------------------------------------------------------

/// Stateful, append-only Merkle Mountain Range.
///
/// Keeps every node, so roots and proofs for any earlier size are
/// available in `O(log n)`.
#[derive(Debug, Clone, Default)]
pub struct MerkleMountainRange {
    /// `levels[0]` holds leaf hashes; `levels[h]` holds height-`h` nodes.
    levels: Vec<Vec<Hash>>,
}

impl MerkleMountainRange {
    /// Create an empty range.
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    /// Number of leaves.
    pub fn size(&self) -> u64 {
        self.levels.first().map_or(0, |leaves| leaves.len() as u64)
    }

    /// Leaf hash at `index`, if present.
    pub fn leaf(&self, index: u64) -> Option<Hash> {
        self.levels
            .first()
            .and_then(|leaves| leaves.get(index as usize))
            .copied()
    }

    /// Append a leaf hash, returning the new root.
    pub fn append(&mut self, leaf: Hash) -> Hash {
        if self.levels.is_empty() {
            self.levels.push(Vec::new());
        }
        self.levels[0].push(leaf);

        // Complete every subtree the new leaf closes.
        let mut height = 0usize;
        let mut idx = self.levels[0].len() - 1;
        while idx % 2 == 1 {
            let parent = node_hash(&self.levels[height][idx - 1], &self.levels[height][idx]);
            height += 1;
            if self.levels.len() == height {
                self.levels.push(Vec::new());
            }
            self.levels[height].push(parent);
            idx /= 2;
        }
        self.root()
    }

    /// Current bagged root; [`Hash::ZERO`] when empty.
    pub fn root(&self) -> Hash {
        bag_peaks(&self.collect_peaks(self.size()))
    }

    /// Current peaks.
    pub fn peaks(&self) -> Vec<Peak> {
        self.collect_peaks(self.size())
    }

    /// Peaks of the range as it was when it held `size` leaves.
    pub fn peaks_at(&self, size: u64) -> Result<Vec<Peak>, CryptoError> {
        self.check_size(size)?;
        Ok(self.collect_peaks(size))
    }

    /// Root of the range as it was when it held `size` leaves.
    pub fn root_at(&self, size: u64) -> Result<Hash, CryptoError> {
        self.peaks_at(size).map(|peaks| bag_peaks(&peaks))
    }

    /// Build an inclusion proof for `leaf_index` against the root at `size`.
    pub fn prove(&self, leaf_index: u64, size: u64) -> Result<InclusionProof, CryptoError> {
        self.check_size(size)?;
        let (peak_index, _, peak_height) = find_peak_for_leaf(size, leaf_index)?;

        let mut path = Vec::with_capacity(peak_height as usize);
        for level in 0..peak_height as usize {
            let pos = (leaf_index >> level) as usize;
            let sibling = pos ^ 1;
            let side = if sibling < pos { Side::Left } else { Side::Right };
            let hash = self
                .levels
                .get(level)
                .and_then(|nodes| nodes.get(sibling))
                .copied()
                .ok_or_else(|| CryptoError::Mmr(format!("missing node at level {level}")))?;
            path.push(PathStep { side, hash });
        }

        let peaks = self.collect_peaks(size);
        let root = bag_peaks(&peaks);
        let leaf_hash = self.levels[0][leaf_index as usize];
        Ok(InclusionProof {
            size,
            leaf_index,
            leaf_hash,
            peak_index,
            peak_height,
            path,
            peaks,
            root,
        })
    }

    fn check_size(&self, size: u64) -> Result<(), CryptoError> {
        if size > self.size() {
            return Err(CryptoError::Mmr(format!(
                "size {size} exceeds current size {}",
                self.size()
            )));
        }
        Ok(())
    }

    /// Caller guarantees `size <= self.size()`.
    fn collect_peaks(&self, size: u64) -> Vec<Peak> {
        let mut start = 0u64;
        peak_plan(size)
            .into_iter()
            .map(|(h, cnt)| {
                let hash = self.levels[h as usize][(start >> h) as usize];
                start += cnt;
                Peak { height: h, hash }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
