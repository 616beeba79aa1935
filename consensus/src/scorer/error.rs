//! Errors raised while scoring a block's proof receipts.

use crate::types::ProofKind;

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("hash draw is zero; u == 0 is a hard rejection, never a score of +infinity")]
    ZeroU,

    #[error("hash draw {hash_value} exceeds max_value {max_value}; u must lie in (0, 1]")]
    HashExceedsMax { hash_value: u64, max_value: u64 },

    #[error("receipt of kind {kind:?} carries policy_tag {tag}, which is not pinned by the active parameter bundle")]
    UnknownPolicyTag { kind: ProofKind, tag: u32 },

    #[error("receipt of kind {kind:?} references metric index {index}, but only {len} metrics were supplied")]
    MetricIndexOutOfRange {
        kind: ProofKind,
        index: usize,
        len: usize,
    },
}
