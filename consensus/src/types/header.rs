//! Block header: the fields consensus depends on.
//!
//! The header is immutable once formed; its digest (via
//! [`crate::crypto::DomainTag::HeaderId`]) is the block hash used for
//! parent links and fork-choice bookkeeping.

use serde::{Deserialize, Serialize};

use super::{Hash256, MinerId, PolicyRoot};

/// Header: minimal fields needed to link, order, price, and attribute a
/// block, plus the commitments PoIES scoring and DA sampling depend on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Header {
    /// Hash of the parent header in the canonical chain.
    pub parent: Hash256,

    /// Height of this block. Genesis is height 0.
    pub height: u64,

    /// Wall-clock timestamp in seconds since Unix epoch.
    ///
    /// Used for observability and the mempool/fee-market EMA inputs, not
    /// for retargeting (difficulty retargeting is a pure function of
    /// canonical chain history per spec, never of wall-clock time).
    pub timestamp: u64,

    /// Identity commitment of the account/key that produced this block.
    pub miner: MinerId,

    /// Nonce searched by the producer to land `u` at or below the value
    /// implied by the acceptance threshold.
    pub nonce: u64,

    /// Digest of the active [`ParameterBundle`](super::ParameterBundle),
    /// pinning the caps, coefficients, and retarget parameters this block
    /// was produced and must be validated against.
    pub policy_root: PolicyRoot,

    /// Digest pinning the active set of PQ-signature and ZK algorithms
    /// permitted for receipts and transactions in this block.
    pub alg_policy_root: Hash256,

    /// Aggregated commitment over this block's verified proof receipts
    /// (`Σψ` inputs), committed so light clients can audit scoring
    /// without re-downloading every receipt.
    pub psi_receipt_commitment: Hash256,

    /// Namespaced Merkle Tree root over this block's committed DA blobs.
    pub da_root: Hash256,

    /// State root produced by the (external) execution engine after
    /// applying this block's transactions to the parent state.
    pub state_root: Hash256,

    /// Root of this block's transaction list.
    pub transactions_root: Hash256,

    /// Root of the per-transaction receipts produced by execution.
    pub receipts_root: Hash256,
}

impl Header {
    /// Returns the canonical byte representation of this header.
    ///
    /// Uses bincode 2 with the `standard()` configuration; this is the
    /// single canonical encoding used for hashing, signing, and
    /// persistence throughout the crate.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which would indicate a programming
    /// error since every field here is always serializable.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(self, cfg)
            .expect("Header should always be serializable with bincode 2 + serde")
    }
}
