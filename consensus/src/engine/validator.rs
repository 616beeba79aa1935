//! Block validity predicates.
//!
//! A [`StructuralValidator`] covers the cheap, context-free checks, and
//! a [`ReceiptConsistencyValidator`] covers the PoIES-specific checks
//! that need the active parameter bundle and nullifier index.
//! [`ConsensusEngine`](super::ConsensusEngine) runs both, then layers
//! the crypto-oracle-backed admission gates ([`TxAdmissionGate`],
//! [`ReceiptAttestationGate`]) and the score/DA checks on top, since
//! those need data (chain id, witness bytes, the committed DA tree)
//! that doesn't fit the trait's `&Block`-only signature.

use std::collections::HashSet;

use crate::crypto::CryptoOracle;
use crate::types::{Block, ParameterBundle, PublicKey, Transaction};

use super::error::ValidationError;

/// Everything a [`BlockValidator`] needs besides the candidate block
/// itself: the parent's height (to check sequencing) and the bundle
/// active at the candidate's height (to check pinning).
pub struct ValidationContext<'a> {
    pub parent_height: u64,
    pub bundle: &'a ParameterBundle,
}

/// Pluggable block validity predicate. Implementations must be
/// deterministic and side-effect free.
pub trait BlockValidator: Send + Sync {
    fn validate(&self, block: &Block, ctx: &ValidationContext) -> Result<(), ValidationError>;
}

/// Cheap, context-light structural checks: height sequencing and
/// parameter-bundle pinning. Every other check (crypto, nullifier
/// non-membership, score, DA root) needs data this trait's signature
/// doesn't carry and is run directly by the engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralValidator;

impl BlockValidator for StructuralValidator {
    fn validate(&self, block: &Block, ctx: &ValidationContext) -> Result<(), ValidationError> {
        let found_height = block.header.height;
        let expected_height = ctx.parent_height + 1;
        if found_height != expected_height {
            return Err(ValidationError::NonSequentialHeight {
                parent: ctx.parent_height,
                found: found_height,
            });
        }

        let expected_root = ctx.bundle.policy_root();
        if block.header.policy_root != expected_root {
            return Err(ValidationError::PolicyRootMismatch {
                expected: expected_root,
                found: block.header.policy_root,
            });
        }

        let expected_alg_root = alg_policy_root(ctx.bundle);
        if block.header.alg_policy_root != expected_alg_root {
            return Err(ValidationError::AlgPolicyViolation {
                expected: expected_alg_root,
                found: block.header.alg_policy_root,
            });
        }

        Ok(())
    }
}

/// Derives the header's `alg_policy_root` from the active bundle.
///
/// This reference implementation pins exactly one algorithm set per
/// bundle (dilithium3 PQ signatures, the BN254 Pedersen ZK check,
/// iterated-BLAKE3 VDF) rather than maintaining a separate registry of
/// interchangeable algorithm choices, so the alg policy root is just
/// the bundle's own [`PolicyRoot`] re-hashed under a distinct domain
/// separation tag. A deployment that actually offers a choice of
/// signature/ZK schemes would replace this with a real lookup keyed by
/// an `alg_policy_id` field on the bundle; see DESIGN.md.
pub fn alg_policy_root(bundle: &ParameterBundle) -> crate::types::Hash256 {
    crate::crypto::hash(crate::crypto::DomainTag::Address, &bundle.policy_root().0.0)
}

/// Checks the receipt set for in-block nullifier duplicates before the
/// nullifier index itself is consulted — a cheap, read-only pass so a
/// block with an internally duplicated nullifier is rejected without
/// ever touching the index's mutable state.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReceiptConsistencyValidator;

impl BlockValidator for ReceiptConsistencyValidator {
    fn validate(&self, block: &Block, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(block.receipts.len());
        for receipt in &block.receipts {
            if !seen.insert(receipt.nullifier) {
                return Err(ValidationError::DuplicateNullifierInBlock {
                    nullifier: receipt.nullifier,
                });
            }
        }
        Ok(())
    }
}

/// Composes two validators, running `first` then `second` and failing
/// fast on the first error, generalized to any pair of
/// [`BlockValidator`]s so the engine can chain [`StructuralValidator`]
/// and [`ReceiptConsistencyValidator`] (and, in tests, an accept-all
/// stub) uniformly.
pub struct CombinedValidator<B, C> {
    pub first: B,
    pub second: C,
}

impl<B, C> CombinedValidator<B, C> {
    pub fn new(first: B, second: C) -> Self {
        Self { first, second }
    }
}

impl<B, C> BlockValidator for CombinedValidator<B, C>
where
    B: BlockValidator,
    C: BlockValidator,
{
    fn validate(&self, block: &Block, ctx: &ValidationContext) -> Result<(), ValidationError> {
        self.first.validate(block, ctx)?;
        self.second.validate(block, ctx)?;
        Ok(())
    }
}

/// Verifies a transaction's signature before it is admitted into a
/// [`crate::mempool::TxPool`], folding the chain id into the signed
/// pre-image (see [`Transaction::signing_bytes`]) so a signature can
/// never be replayed across networks.
pub struct TxAdmissionGate<'a> {
    pub oracle: &'a dyn CryptoOracle,
    pub chain_id: u64,
}

impl<'a> TxAdmissionGate<'a> {
    pub fn new(oracle: &'a dyn CryptoOracle, chain_id: u64) -> Self {
        Self { oracle, chain_id }
    }

    /// Checks that `public_key` both derives `tx.sender` and produced
    /// `tx.signature` over this transaction's signing bytes.
    pub fn verify(
        &self,
        tx: &Transaction,
        public_key: &PublicKey,
    ) -> Result<(), ValidationError> {
        let derived = crate::types::AccountId::from_public_key(&public_key.0);
        if derived != tx.sender {
            return Err(ValidationError::SigVerifyFailed {
                miner: tx.sender.0,
            });
        }

        let message = tx.signing_bytes(self.chain_id);
        let ok = self
            .oracle
            .verify_pq_sig(public_key, &message, &tx.signature)?;
        if !ok {
            return Err(ValidationError::SigVerifyFailed {
                miner: tx.sender.0,
            });
        }
        Ok(())
    }
}

/// The off-chain evidence a [`crate::types::ProofReceipt`] commits to
/// via `evidence_hash`, carried alongside the block as witness data
/// (never hashed into the header) so a receipt's cryptographic proof
/// can be independently re-verified without being part of the
/// consensus-critical block body.
pub enum ReceiptEvidence {
    /// The `Hash` kind carries no extra evidence to verify; its ψ is
    /// the baseline entropy draw alone.
    None,
    Zk {
        proof: Vec<u8>,
        public_inputs: Vec<u8>,
    },
    Vdf {
        challenge: Vec<u8>,
        iterations: u64,
        output: Vec<u8>,
        proof: Vec<u8>,
    },
}

/// Re-verifies a receipt's off-chain evidence against the crypto
/// oracle. `Ai`/`Quantum`/`Storage` attestations are all checked as
/// zero-knowledge proofs over their respective claims (a zkML /
/// zk-storage-proof pattern), sharing the same `verify_zk` entry point
/// as the `Zk` kind itself; `Vdf` receipts replay the iterated-hash
/// checkpoint chain via `verify_vdf`.
pub struct ReceiptAttestationGate<'a> {
    pub oracle: &'a dyn CryptoOracle,
}

impl<'a> ReceiptAttestationGate<'a> {
    pub fn new(oracle: &'a dyn CryptoOracle) -> Self {
        Self { oracle }
    }

    pub fn verify(
        &self,
        receipt: &crate::types::ProofReceipt,
        evidence: &ReceiptEvidence,
    ) -> Result<(), ValidationError> {
        use crate::types::ProofKind;

        match (receipt.kind, evidence) {
            (ProofKind::Hash, ReceiptEvidence::None) => Ok(()),
            (ProofKind::Ai | ProofKind::Quantum | ProofKind::Storage | ProofKind::Zk,
                ReceiptEvidence::Zk {
                    proof,
                    public_inputs,
                },
            ) => {
                let ok = self.oracle.verify_zk(proof, public_inputs)?;
                if ok {
                    Ok(())
                } else {
                    Err(ValidationError::ZkVerifyFailed {
                        nullifier: receipt.nullifier,
                    })
                }
            }
            (
                ProofKind::Vdf,
                ReceiptEvidence::Vdf {
                    challenge,
                    iterations,
                    output,
                    proof,
                },
            ) => {
                let ok = self
                    .oracle
                    .verify_vdf(challenge, *iterations, output, proof)?;
                if ok {
                    Ok(())
                } else {
                    Err(ValidationError::VdfVerifyFailed {
                        nullifier: receipt.nullifier,
                    })
                }
            }
            _ => Err(ValidationError::ZkVerifyFailed {
                nullifier: receipt.nullifier,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, Hash256, MinerId, PolicyRoot};
    use std::collections::BTreeMap;

    fn bundle() -> ParameterBundle {
        ParameterBundle {
            theta_genesis: 100,
            gamma_total_cap: 1000,
            per_type_caps: BTreeMap::new(),
            escort_q_numerator: 0,
            escort_q_denominator: 1,
            policy_table: BTreeMap::new(),
            ema_alpha_numerator: 8,
            ema_alpha_denominator: 10,
            lambda_target_secs: 10,
            epoch_length: 2016,
            clamp_down_numerator: 20,
            clamp_down_denominator: 100,
            clamp_up_numerator: 15,
            clamp_up_denominator: 100,
            nullifier_ttl_blocks: 200,
            reorg_limit: 100,
            activation_timelock: 1000,
            fee_ema_alpha_numerator: 1,
            fee_ema_alpha_denominator: 8,
            fee_surge_utilization_bp: 8000,
            fee_surge_multiplier_bp: 20000,
            rbf_bump_pct: 10,
            da_k: 4,
            da_n: 8,
            blob_size_cap_bytes: 1 << 20,
            das_target_failure_numerator: 1,
            das_target_failure_denominator: 1_000_000,
        }
    }

    fn block_with(height: u64, policy_root: PolicyRoot, alg_root: Hash256) -> Block {
        Block {
            header: crate::types::Header {
                parent: Hash256::ZERO,
                height,
                timestamp: 0,
                miner: MinerId(Hash256::compute(b"m")),
                nonce: 0,
                policy_root,
                alg_policy_root: alg_root,
                psi_receipt_commitment: Hash256::ZERO,
                da_root: Hash256::ZERO,
                state_root: Hash256::ZERO,
                transactions_root: Hash256::ZERO,
                receipts_root: Hash256::ZERO,
            },
            transactions: vec![],
            receipts: vec![],
        }
    }

    #[test]
    fn structural_validator_rejects_skipped_height() {
        let b = bundle();
        let block = block_with(5, b.policy_root(), alg_policy_root(&b));
        let ctx = ValidationContext {
            parent_height: 1,
            bundle: &b,
        };
        let err = StructuralValidator.validate(&block, &ctx).unwrap_err();
        assert!(matches!(err, ValidationError::NonSequentialHeight { .. }));
    }

    #[test]
    fn structural_validator_rejects_policy_root_mismatch() {
        let b = bundle();
        let block = block_with(1, PolicyRoot(Hash256::ZERO), alg_policy_root(&b));
        let ctx = ValidationContext {
            parent_height: 0,
            bundle: &b,
        };
        let err = StructuralValidator.validate(&block, &ctx).unwrap_err();
        assert!(matches!(err, ValidationError::PolicyRootMismatch { .. }));
    }

    #[test]
    fn structural_validator_accepts_well_formed_header() {
        let b = bundle();
        let block = block_with(1, b.policy_root(), alg_policy_root(&b));
        let ctx = ValidationContext {
            parent_height: 0,
            bundle: &b,
        };
        assert!(StructuralValidator.validate(&block, &ctx).is_ok());
    }

    #[test]
    fn receipt_consistency_rejects_in_block_duplicate_nullifier() {
        let b = bundle();
        let mut block = block_with(1, b.policy_root(), alg_policy_root(&b));
        let receipt = crate::types::ProofReceipt {
            kind: crate::types::ProofKind::Hash,
            evidence_hash: Hash256::ZERO,
            nullifier: Hash256::compute(b"n"),
            account: AccountId(Hash256::ZERO),
            metrics: vec![],
            psi_claim: 0,
            policy_tag: 0,
        };
        block.receipts = vec![receipt.clone(), receipt];
        let ctx = ValidationContext {
            parent_height: 0,
            bundle: &b,
        };
        let err = ReceiptConsistencyValidator
            .validate(&block, &ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::DuplicateNullifierInBlock { .. }
        ));
    }

    #[test]
    fn combined_validator_runs_both_checks() {
        let b = bundle();
        let block = block_with(1, b.policy_root(), alg_policy_root(&b));
        let ctx = ValidationContext {
            parent_height: 0,
            bundle: &b,
        };
        let combined = CombinedValidator::new(StructuralValidator, ReceiptConsistencyValidator);
        assert!(combined.validate(&block, &ctx).is_ok());
    }
}
