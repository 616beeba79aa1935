//! Proof receipts: the tagged, evidence-bearing records the PoIES scorer
//! consumes.
//!
//! A [`ProofReceipt`] is created by producers and validated by the
//! scorer; per spec it is never mutated once formed. `ProofKind` is an
//! exhaustively-matched compile-time enum rather than a runtime string
//! tag, per the "pervasive dynamic dictionaries -> tagged variants"
//! design note: every `match` over it is required to be exhaustive, so
//! adding a new proof kind is a compile error everywhere it matters
//! (scorer policy table, per-type caps, metrics) until it is handled.

use serde::{Deserialize, Serialize};

use super::{AccountId, Hash256};

/// The kinds of verifiable "useful work" the scorer recognizes.
///
/// `Hash` is the baseline entropy-only case (a receipt purely restating
/// the header's own hash draw, carrying no additional ψ); the others are
/// the external attestation types named in the spec.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum ProofKind {
    Hash,
    Ai,
    Quantum,
    Storage,
    Vdf,
    Zk,
}

impl ProofKind {
    /// All kinds, in the fixed canonical order used for per-type caps and
    /// escort-weight enumeration (diversity only counts types that have a
    /// receipt in the block, but when iterating all *possible* kinds this
    /// is the order used, keeping policy tables and metrics stable).
    pub const ALL: [ProofKind; 6] = [
        ProofKind::Hash,
        ProofKind::Ai,
        ProofKind::Quantum,
        ProofKind::Storage,
        ProofKind::Vdf,
        ProofKind::Zk,
    ];

    /// Short, stable tag used in metrics and policy-table keys.
    pub fn tag(self) -> &'static str {
        match self {
            ProofKind::Hash => "hash",
            ProofKind::Ai => "ai",
            ProofKind::Quantum => "quantum",
            ProofKind::Storage => "storage",
            ProofKind::Vdf => "vdf",
            ProofKind::Zk => "zk",
        }
    }
}

/// A tagged, verified (or claimed, prior to verification) proof record.
///
/// `evidence_hash` is an opaque handle to the off-chain verification
/// material (e.g. the AI attestation transcript, the VDF proof bytes);
/// the consensus core never stores or interprets that material directly,
/// only its commitment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofReceipt {
    pub kind: ProofKind,

    /// Hash of the off-chain evidence payload (attestation transcript,
    /// VDF proof bytes, storage challenge-response, etc.).
    pub evidence_hash: Hash256,

    /// One-time identifier derived from `(kind, evidence, account,
    /// epoch_tag)`; see [`crate::nullifier`]. Consumed exactly once.
    pub nullifier: Hash256,

    /// Account claiming credit for this receipt (reward/accounting
    /// attribution; opaque to scoring itself).
    pub account: AccountId,

    /// Raw metrics the policy map will turn into a ψ contribution, e.g.
    /// an AI attestation's claimed accuracy/latency tuple, a storage
    /// proof's claimed capacity, or a VDF proof's claimed iteration
    /// count. Kept as a small fixed-point vector so the policy map stays
    /// a pure table lookup plus arithmetic, never floating point.
    pub metrics: Vec<u64>,

    /// Producer-claimed ψ (µ-nats) prior to independent recomputation by
    /// the scorer's policy map. The scorer never trusts this value; it
    /// is carried for diagnostics/metrics only and the scorer always
    /// recomputes `ψ_raw` itself from `metrics`.
    pub psi_claim: u64,

    /// Tag of the policy coefficient table entry this receipt expects to
    /// be scored against; mismatches against the active
    /// [`ParameterBundle`](super::ParameterBundle) are a
    /// `PolicyRootMismatch`.
    pub policy_tag: u32,
}
