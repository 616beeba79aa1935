//! Blocks: a header plus the transactions and proof receipts it commits.

use serde::{Deserialize, Serialize};

use super::{Header, ProofReceipt, Transaction};

/// Block hash: the domain-separated digest of a [`Header`]'s canonical
/// bytes. Used as the parent link, the fork-choice branch key, and the
/// block store's primary key.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub super::Hash256);

impl std::fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockHash({})", self.0.to_hex())
    }
}

impl std::fmt::Display for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A full block: header, transactions, and the proof receipts the
/// scorer evaluates against the active [`super::ParameterBundle`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub receipts: Vec<ProofReceipt>,
}

impl Block {
    /// Canonical bincode-2 encoding of the header only; block hashing is
    /// always over the header, never the body, so bodies can be
    /// fetched/pruned independently of the chain of header commitments.
    pub fn canonical_header_bytes(&self) -> Vec<u8> {
        self.header.canonical_bytes()
    }

    /// Canonical bincode-2 encoding of the full block (header, transactions,
    /// and receipts). Used by block stores that persist bodies; never used
    /// as a hashing input since that would make the hash depend on body
    /// contents a node may later prune.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(self, cfg).expect("Block encoding is infallible")
    }

    /// Computes this block's [`BlockHash`] via
    /// [`crate::crypto::DomainTag::HeaderId`].
    pub fn hash(&self) -> BlockHash {
        BlockHash(crate::crypto::hash(
            crate::crypto::DomainTag::HeaderId,
            &self.canonical_header_bytes(),
        ))
    }

    /// Returns `(kind, receipt)` pairs for every committed proof
    /// receipt, in the order they appear in the block body. The scorer
    /// consumes this directly; it is the block-level analogue of a
    /// per-receipt iterator that keeps scoring logic from reaching into
    /// `Block`'s internal field layout.
    pub fn receipt_pairs(&self) -> impl Iterator<Item = (super::ProofKind, &ProofReceipt)> {
        self.receipts.iter().map(|r| (r.kind, r))
    }

    /// Total count of receipts of a given kind, used by diagnostics and
    /// by the escort/diversity weighting in the scorer.
    pub fn receipt_count(&self, kind: super::ProofKind) -> usize {
        self.receipts.iter().filter(|r| r.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, Hash256, MinerId, PolicyRoot, ProofKind, Signature};

    fn sample_header() -> Header {
        Header {
            parent: Hash256::ZERO,
            height: 1,
            timestamp: 1_000,
            miner: MinerId(Hash256::compute(b"miner")),
            nonce: 42,
            policy_root: PolicyRoot(Hash256::compute(b"policy")),
            alg_policy_root: Hash256::compute(b"algs"),
            psi_receipt_commitment: Hash256::ZERO,
            da_root: Hash256::ZERO,
            state_root: Hash256::ZERO,
            transactions_root: Hash256::ZERO,
            receipts_root: Hash256::ZERO,
        }
    }

    fn sample_receipt(kind: ProofKind) -> ProofReceipt {
        ProofReceipt {
            kind,
            evidence_hash: Hash256::compute(b"evidence"),
            nullifier: Hash256::compute(b"nullifier"),
            account: AccountId(Hash256::compute(b"account")),
            metrics: vec![10, 20],
            psi_claim: 5,
            policy_tag: 0,
        }
    }

    #[test]
    fn hash_is_deterministic_for_identical_headers() {
        let b1 = Block {
            header: sample_header(),
            transactions: vec![],
            receipts: vec![],
        };
        let b2 = Block {
            header: sample_header(),
            transactions: vec![],
            receipts: vec![],
        };
        assert_eq!(b1.hash(), b2.hash());
    }

    #[test]
    fn hash_ignores_body_contents() {
        let b1 = Block {
            header: sample_header(),
            transactions: vec![],
            receipts: vec![],
        };
        let b2 = Block {
            header: sample_header(),
            transactions: vec![],
            receipts: vec![sample_receipt(ProofKind::Ai)],
        };
        assert_eq!(b1.hash(), b2.hash());
    }

    #[test]
    fn receipt_count_filters_by_kind() {
        let b = Block {
            header: sample_header(),
            transactions: vec![],
            receipts: vec![
                sample_receipt(ProofKind::Ai),
                sample_receipt(ProofKind::Ai),
                sample_receipt(ProofKind::Vdf),
            ],
        };
        assert_eq!(b.receipt_count(ProofKind::Ai), 2);
        assert_eq!(b.receipt_count(ProofKind::Vdf), 1);
        assert_eq!(b.receipt_count(ProofKind::Zk), 0);
    }

    #[test]
    fn canonical_bytes_roundtrips_through_bincode() {
        let block = Block {
            header: sample_header(),
            transactions: vec![],
            receipts: vec![sample_receipt(ProofKind::Zk)],
        };
        let bytes = block.canonical_bytes();
        let cfg = bincode::config::standard();
        let (decoded, _): (Block, usize) = bincode::serde::decode_from_slice(&bytes, cfg).unwrap();
        assert_eq!(decoded.hash(), block.hash());
        assert_eq!(decoded.receipts.len(), 1);
    }

    #[test]
    fn signature_type_roundtrips_through_bincode() {
        let sig = Signature(vec![9u8; 4]);
        let cfg = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&sig, cfg).unwrap();
        let (decoded, _): (Signature, usize) =
            bincode::serde::decode_from_slice(&bytes, cfg).unwrap();
        assert_eq!(decoded.as_bytes(), sig.as_bytes());
    }
}
