//! Proof-of-Informative-Epistemic-Stake scoring: `S = H(u) + Σψ`.
//!
//! Scoring runs in three fixed stages, in this order — per-type cap,
//! then escort/diversity weighting, then the total Γ cap — so that
//! diversity is rewarded only among work that already cleared its own
//! per-type ceiling, and the global cap always has the final word:
//!
//! 1. **Per-type cap.** Each [`ProofKind`]'s raw ψ contributions (after
//!    the policy-table lookup) are summed and clipped to that type's
//!    `per_type_cap`.
//! 2. **Escort/diversity weighting.** The capped per-type sums are
//!    scaled up according to how many distinct proof kinds appear in
//!    the block, so a block backed by several kinds of useful work
//!    outscores a block of the same raw magnitude backed by only one.
//! 3. **Γ-scale.** The diversity-weighted total is clipped to the
//!    bundle's `gamma_total_cap`.
//!
//! The result is added to the hash-entropy term `H(u)` computed by
//! [`entropy::shortfall_micronats`] to produce the final score `S`,
//! which is accepted iff `S >= Θ`.

pub mod entropy;
pub mod error;

pub use error::ScoreError;

use std::collections::BTreeMap;

use crate::types::{ParameterBundle, ProofKind, ProofReceipt};

/// Breakdown of a computed score, kept around for metrics and
/// diagnostics rather than discarded after the accept/reject decision.
#[derive(Clone, Debug)]
pub struct Score {
    /// `H(u)`, in µ-nats.
    pub entropy_micronats: u64,
    /// `Σψ` after capping, escort weighting, and Γ-scaling, in µ-nats.
    pub psi_total_micronats: u64,
    /// `S = H(u) + Σψ`, in µ-nats.
    pub total_micronats: u64,
    /// Per-kind contribution after per-type capping but before escort
    /// weighting, for diagnostics.
    pub per_type_micronats: BTreeMap<ProofKind, u64>,
}

impl Score {
    /// Whether this score clears `threshold` (µ-nats).
    pub fn accepted(&self, threshold: u64) -> bool {
        self.total_micronats >= threshold
    }
}

/// Stateless PoIES scorer: a pure function of `(hash draw, receipts,
/// parameter bundle)`, composed into block validation the same way the
/// crypto oracle and fork-choice weight function are — as an injected,
/// independently testable dependency.
#[derive(Default)]
pub struct PoiesScorer;

impl PoiesScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores a block's proof receipts against the active parameter
    /// bundle.
    ///
    /// `hash_value` and `max_value` define `u = hash_value / max_value`,
    /// which must lie in `(0, 1]`: `hash_value == 0` is rejected as
    /// [`ScoreError::ZeroU`] and `hash_value > max_value` is rejected as
    /// [`ScoreError::HashExceedsMax`], both as typed rejections rather
    /// than a panic, since this is a public entry point any producer or
    /// alternate implementation can call with an out-of-range draw.
    pub fn score(
        &self,
        hash_value: u64,
        max_value: u64,
        receipts: &[ProofReceipt],
        bundle: &ParameterBundle,
    ) -> Result<Score, ScoreError> {
        if hash_value == 0 {
            return Err(ScoreError::ZeroU);
        }
        if hash_value > max_value {
            return Err(ScoreError::HashExceedsMax {
                hash_value,
                max_value,
            });
        }

        let entropy_micronats = entropy::shortfall_micronats(hash_value, max_value);

        // Stage 1: per-kind raw sum, then per-type cap.
        let mut raw_sum: BTreeMap<ProofKind, u64> = BTreeMap::new();
        for receipt in receipts {
            let coeff = bundle
                .coefficient(receipt.kind, receipt.policy_tag)
                .ok_or(ScoreError::UnknownPolicyTag {
                    kind: receipt.kind,
                    tag: receipt.policy_tag,
                })?;
            let metric = *receipt.metrics.get(coeff.metric_id).ok_or(
                ScoreError::MetricIndexOutOfRange {
                    kind: receipt.kind,
                    index: coeff.metric_id,
                    len: receipt.metrics.len(),
                },
            )?;

            let weighted = metric
                .saturating_mul(coeff.weight_num)
                .checked_div(coeff.weight_den.max(1))
                .unwrap_or(0);
            let psi_raw = weighted.min(coeff.ceiling);

            let entry = raw_sum.entry(receipt.kind).or_insert(0);
            *entry = entry.saturating_add(psi_raw);
        }

        let mut per_type_micronats: BTreeMap<ProofKind, u64> = BTreeMap::new();
        for (kind, sum) in &raw_sum {
            let cap = bundle.per_type_cap(*kind);
            per_type_micronats.insert(*kind, (*sum).min(cap));
        }

        // Stage 2: escort/diversity weighting. A block backed by more
        // distinct kinds of useful work gets its capped total scaled up
        // linearly in the number of distinct kinds present, by a factor
        // controlled by the bundle's escort_q fraction: at q=0 there is
        // no diversity bonus, at q=1 the bonus scales to double weight
        // at full diversity across all known proof kinds.
        let distinct_kinds = per_type_micronats.values().filter(|v| **v > 0).count() as u64;
        let max_kinds = ProofKind::ALL.len() as u64;
        let capped_sum: u64 = per_type_micronats.values().sum();

        let escort_scale_bp: u128 = if max_kinds <= 1 || distinct_kinds <= 1 {
            10_000
        } else {
            let q_num = bundle.escort_q_numerator as u128;
            let q_den = bundle.escort_q_denominator.max(1) as u128;
            let diversity_frac = ((distinct_kinds - 1) as u128 * 10_000) / (max_kinds - 1) as u128;
            10_000 + (diversity_frac * q_num) / q_den
        };

        let diversity_weighted = ((capped_sum as u128) * escort_scale_bp / 10_000) as u64;

        // Stage 3: Γ-scale.
        let psi_total_micronats = diversity_weighted.min(bundle.gamma_total_cap);

        let total_micronats = entropy_micronats.saturating_add(psi_total_micronats);

        Ok(Score {
            entropy_micronats,
            psi_total_micronats,
            total_micronats,
            per_type_micronats,
        })
    }
}
