//! Transactions: opaque, fee-priced payload carriers.
//!
//! Execution semantics (what a transaction *does*) live outside this
//! crate; consensus only needs enough structure to order, price, and
//! replace transactions in the mempool and to commit them into a
//! block's `transactions_root`.

use serde::{Deserialize, Serialize};

use super::{AccountId, Hash256, Signature};

/// A transaction as consensus sees it: sender, replay-protection nonce,
/// fee, size accounting, an opaque payload, and a signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: AccountId,

    /// Strictly increasing per-sender sequence number; also the RBF key
    /// (a resubmission at the same nonce replaces the pending entry).
    pub nonce: u64,

    /// Fee offered, in the chain's base fee unit. Mempool admission and
    /// ordering are driven entirely by this field plus `size_bytes`.
    pub fee: u64,

    /// Size of the transaction's non-blob payload, in bytes; drives
    /// fee-rate (`fee / size_bytes`) comparisons.
    pub size_bytes: u32,

    /// Size of any attached data-availability blob, in bytes, prior to
    /// erasure coding. Zero for transactions that carry no blob.
    pub blob_size: u32,

    /// Opaque execution payload; the consensus core never interprets
    /// this beyond measuring its length.
    pub payload: Vec<u8>,

    pub signature: Signature,
}

/// The fields a sender signs over: everything but the signature itself,
/// with the chain id folded in so a signature from one network can never
/// be replayed against another.
#[derive(Serialize)]
struct SigningPreimage<'a> {
    chain_id: u64,
    sender: &'a AccountId,
    nonce: u64,
    fee: u64,
    size_bytes: u32,
    blob_size: u32,
    payload: &'a [u8],
}

impl Transaction {
    /// Canonical bincode-2 encoding of this transaction.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(self, cfg)
            .expect("Transaction should always be serializable with bincode 2 + serde")
    }

    /// Canonical bytes a sender signs and a verifier checks the
    /// signature against: every field except `signature`, with
    /// `chain_id` bound in so the same signature can't be replayed on a
    /// different network.
    pub fn signing_bytes(&self, chain_id: u64) -> Vec<u8> {
        let cfg = bincode::config::standard();
        let preimage = SigningPreimage {
            chain_id,
            sender: &self.sender,
            nonce: self.nonce,
            fee: self.fee,
            size_bytes: self.size_bytes,
            blob_size: self.blob_size,
            payload: &self.payload,
        };
        bincode::serde::encode_to_vec(&preimage, cfg)
            .expect("SigningPreimage should always be serializable with bincode 2 + serde")
    }

    /// Transaction identifier, domain-separated from header/nullifier
    /// hashing via [`crate::crypto::DomainTag::TxId`].
    pub fn id(&self) -> Hash256 {
        crate::crypto::hash(crate::crypto::DomainTag::TxId, &self.canonical_bytes())
    }

    /// Effective fee rate in fee-units per byte, used to rank mempool
    /// entries and to compare against the EMA min-fee threshold.
    ///
    /// Returns 0 for a zero-size transaction rather than dividing by
    /// zero; such a transaction is rejected earlier by admission checks.
    pub fn fee_rate(&self) -> u64 {
        if self.size_bytes == 0 {
            return 0;
        }
        self.fee / self.size_bytes as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx(nonce: u64, fee: u64, size_bytes: u32) -> Transaction {
        Transaction {
            sender: AccountId(Hash256::compute(b"alice")),
            nonce,
            fee,
            size_bytes,
            blob_size: 0,
            payload: vec![1, 2, 3],
            signature: Signature(vec![0u8; 64]),
        }
    }

    #[test]
    fn fee_rate_divides_fee_by_size() {
        let tx = sample_tx(0, 1000, 250);
        assert_eq!(tx.fee_rate(), 4);
    }

    #[test]
    fn fee_rate_is_zero_for_zero_size() {
        let tx = sample_tx(0, 1000, 0);
        assert_eq!(tx.fee_rate(), 0);
    }

    #[test]
    fn id_is_deterministic_for_identical_transactions() {
        let a = sample_tx(3, 500, 100);
        let b = sample_tx(3, 500, 100);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn id_changes_with_nonce() {
        let a = sample_tx(3, 500, 100);
        let b = sample_tx(4, 500, 100);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn signing_bytes_differ_across_chain_ids() {
        let tx = sample_tx(0, 100, 10);
        assert_ne!(tx.signing_bytes(1), tx.signing_bytes(2));
    }

    #[test]
    fn signing_bytes_are_stable_regardless_of_signature_field() {
        let mut a = sample_tx(0, 100, 10);
        let mut b = a.clone();
        b.signature = Signature(vec![0xffu8; 64]);
        assert_eq!(a.signing_bytes(1), b.signing_bytes(1));
        a.signature = Signature(vec![]);
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }
}
