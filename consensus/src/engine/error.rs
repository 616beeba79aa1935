//! Errors raised validating blocks and driving the consensus engine.

use crate::crypto::CryptoError;
use crate::da::DaError;
use crate::difficulty::DifficultyError;
use crate::engine::fork_choice::ForkChoiceError;
use crate::mempool::MempoolError;
use crate::nullifier::NullifierError;
use crate::scorer::ScoreError;
use crate::types::{BlockHash, Hash256, PolicyRoot};

/// Why a candidate block failed validation.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("parent block {parent} is not known to this node")]
    ParentNotFound { parent: BlockHash },

    #[error("header's policy_root {found:?} does not match the active bundle's {expected:?}")]
    PolicyRootMismatch {
        expected: PolicyRoot,
        found: PolicyRoot,
    },

    #[error("score {score} is below the acceptance threshold {threshold}")]
    ScoreBelowThreshold { score: u64, threshold: u64 },

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("nullifier reuse: {0}")]
    NullifierReuse(#[from] NullifierError),

    #[error("data availability: {0}")]
    DataAvailability(#[from] DaError),

    #[error("signature verification failed for miner {miner}")]
    SigVerifyFailed { miner: Hash256 },

    #[error("zero-knowledge proof verification failed for receipt nullifier {nullifier}")]
    ZkVerifyFailed { nullifier: Hash256 },

    #[error("verifiable delay function proof verification failed for receipt nullifier {nullifier}")]
    VdfVerifyFailed { nullifier: Hash256 },

    #[error("oversize proof: {0}")]
    OversizeProof(#[from] CryptoError),

    #[error("mempool rejected a transaction during revalidation: {0}")]
    Mempool(#[from] MempoolError),

    #[error("block height {found} is not exactly one greater than parent height {parent}")]
    NonSequentialHeight { parent: u64, found: u64 },

    #[error("header's alg_policy_root {found:?} does not match the active bundle's {expected:?}")]
    AlgPolicyViolation { expected: Hash256, found: Hash256 },

    #[error("block contains a duplicate nullifier within its own receipt set")]
    DuplicateNullifierInBlock { nullifier: Hash256 },
}

/// Errors surfaced by the consensus engine's top-level operations
/// (block submission, fork choice, reorg).
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("block validation failed: {0}")]
    Invalid(#[from] ValidationError),

    #[error("reorg depth {depth} exceeds the configured limit of {limit}")]
    ReorgLimitExceeded { depth: u64, limit: u64 },

    #[error("block {hash} is already known")]
    AlreadyKnown { hash: BlockHash },

    #[error("fork choice bookkeeping failed: {0}")]
    ForkChoice(#[from] ForkChoiceError),

    #[error("policy bundle validation failed: {0}")]
    Bundle(#[from] crate::types::BundleError),

    #[error("difficulty retargeting failed: {0}")]
    Difficulty(#[from] DifficultyError),
}
