//! Core domain types shared across the consensus core.
//!
//! This module defines strongly-typed hashes, identifiers, and the block
//! and transaction shapes that every other component (scorer, mempool, DA,
//! fork choice) operates on. The goal, as with the rest of this crate, is
//! to avoid "naked" byte buffers in public APIs and instead use
//! domain-specific newtypes.

pub mod block;
pub mod header;
pub mod policy;
pub mod receipt;
pub mod tx;

pub use block::{Block, BlockHash};
pub use header::Header;
pub use policy::{BundleError, ParameterBundle, PolicyCoefficient, PolicyRoot};
pub use receipt::{ProofKind, ProofReceipt};
pub use tx::Transaction;

use serde::{Deserialize, Serialize};

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit hash wrapper (BLAKE3-256).
///
/// This type is the backing representation for all fixed-size hashes in
/// the chain (miner identities, nullifiers, evidence hashes, NMT node
/// digests, etc.). It is always exactly [`HASH_LEN`] bytes long.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// The all-zero hash, used as the parent link of the genesis header.
    pub const ZERO: Hash256 = Hash256([0u8; HASH_LEN]);

    /// Computes a new [`Hash256`] as the BLAKE3-256 hash of `data`.
    ///
    /// The result is deterministic for a given byte slice. Callers that
    /// need domain separation should prepend a fixed tag byte string
    /// rather than calling this directly; see [`crate::crypto::hash`].
    pub fn compute(data: &[u8]) -> Self {
        let h = blake3::hash(data);
        Hash256(*h.as_bytes())
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Returns the hash encoded as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Identifier for the account/key that produced a block (miner / block
/// producer identity commitment).
///
/// Derived from a PQ public key by hashing its canonical encoding; the
/// consensus core never interprets the key material itself (signature
/// verification is delegated to [`crate::crypto::CryptoOracle`]).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MinerId(pub Hash256);

impl MinerId {
    /// Derives a [`MinerId`] from the canonical bytes of a public key.
    pub fn from_public_key(pk_bytes: &[u8]) -> Self {
        MinerId(Hash256::compute(pk_bytes))
    }
}

impl std::fmt::Debug for MinerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MinerId({})", self.0.to_hex())
    }
}

/// Sender/account identifier for transactions (mirrors [`MinerId`]'s shape
/// but kept distinct so the type system stops accounts and miners from
/// being accidentally interchanged).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Hash256);

impl AccountId {
    pub fn from_public_key(pk_bytes: &[u8]) -> Self {
        AccountId(Hash256::compute(pk_bytes))
    }
}

impl std::fmt::Debug for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountId({})", self.0.to_hex())
    }
}

/// Opaque PQ public key bytes, wrapped to avoid naked `Vec<u8>` in
/// signature-adjacent APIs. The encoding is scheme-specific and defined
/// by whatever PQ-signature primitive the node is configured with;
/// consensus treats it as opaque input to [`crate::crypto::CryptoOracle`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicKey(pub Vec<u8>);

/// Opaque detached PQ signature bytes, as consumed by
/// [`crate::crypto::CryptoOracle::verify_pq_sig`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
