//! Parameter bundle: the immutable, pinned snapshot of every tunable
//! consensus knob.
//!
//! A [`ParameterBundle`] is bound to blocks via its [`PolicyRoot`]
//! digest (the header's `policy_root` field). New bundles activate at a
//! height `>= current_height + timelock`, never retroactively, so that
//! replaying history always uses the bundle that was actually active at
//! each height.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::receipt::ProofKind;
use super::Hash256;

/// Digest pinning a [`ParameterBundle`]; this is what the header's
/// `policy_root` field carries, and what `PolicyRootMismatch` compares
/// against.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PolicyRoot(pub Hash256);

impl std::fmt::Debug for PolicyRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PolicyRoot({})", self.0.to_hex())
    }
}

/// Coefficients the PoIES scorer's policy map uses to turn a receipt's
/// raw `metrics` into a ψ_raw value, keyed by `(ProofKind, metric_id)`.
///
/// `metric_id` indexes into [`crate::types::ProofReceipt::metrics`]; the
/// policy map is `ψ_raw = min(metrics[metric_id] * weight_num /
/// weight_den, ceiling)`, a pure fixed-point table lookup plus
/// multiplication — no floating point, no runtime-mutable state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PolicyCoefficient {
    pub metric_id: usize,
    pub weight_num: u64,
    pub weight_den: u64,
    pub ceiling: u64,
}

/// Immutable snapshot of every consensus parameter, pinned to blocks via
/// [`PolicyRoot`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterBundle {
    /// Acceptance threshold Θ at the time this bundle was snapshotted;
    /// the live value tracked by [`crate::difficulty::DifficultyController`]
    /// supersedes this once retargeting has run, but this is the
    /// genesis/bootstrap value.
    pub theta_genesis: u64,

    /// Total cap Γ on `Σψ_adj` per block, in µ-nats.
    pub gamma_total_cap: u64,

    /// Per-proof-kind cap on `ψ_raw` before escort weighting, in µ-nats.
    pub per_type_caps: BTreeMap<ProofKind, u64>,

    /// Escort/diversity weighting exponent `q ∈ [0, 1]`, represented as
    /// a fixed-point numerator over a fixed denominator of 1_000_000 so
    /// the diversity function stays exact across implementations.
    pub escort_q_numerator: u64,
    pub escort_q_denominator: u64,

    /// Policy coefficient table, keyed by `(kind, policy_tag)`.
    pub policy_table: BTreeMap<(ProofKind, u32), PolicyCoefficient>,

    /// EMA smoothing factor α for the difficulty controller, represented
    /// as a fixed-point fraction; spec requires α clamped to [0.6, 0.98].
    pub ema_alpha_numerator: u64,
    pub ema_alpha_denominator: u64,

    /// Target inter-block interval, in seconds.
    pub lambda_target_secs: u64,

    /// Number of blocks per retarget epoch.
    pub epoch_length: u64,

    /// Maximum per-epoch downward adjustment, as a fixed-point fraction
    /// (e.g. 20% => numerator 20, denominator 100).
    pub clamp_down_numerator: u64,
    pub clamp_down_denominator: u64,

    /// Maximum per-epoch upward adjustment.
    pub clamp_up_numerator: u64,
    pub clamp_up_denominator: u64,

    /// Nullifier time-to-live, in blocks. Must satisfy
    /// `ttl_blocks >= 2 * reorg_limit` (validated at bundle construction
    /// and again at node startup).
    pub nullifier_ttl_blocks: u64,

    /// Maximum accepted reorg depth.
    pub reorg_limit: u64,

    /// Number of blocks an activated bundle must wait before taking
    /// effect, counted from the height at which it was accepted.
    pub activation_timelock: u64,

    /// Fee-market coefficients (see [`crate::mempool::config::FeeMarketConfig`]
    /// for the runtime-facing mirror of these).
    pub fee_ema_alpha_numerator: u64,
    pub fee_ema_alpha_denominator: u64,
    pub fee_surge_utilization_bp: u32,
    pub fee_surge_multiplier_bp: u32,
    pub rbf_bump_pct: u32,

    /// DA erasure-coding profile: reconstruct from any `k` of `n` shares.
    pub da_k: u32,
    pub da_n: u32,

    /// Maximum blob payload size, in bytes, before erasure coding.
    pub blob_size_cap_bytes: u64,

    /// Target failure probability for light-client sampling; the sample
    /// count is derived from this and `(k, n)` per spec §4.6.
    pub das_target_failure_numerator: u64,
    pub das_target_failure_denominator: u64,
}

impl ParameterBundle {
    /// Computes this bundle's [`PolicyRoot`] as the BLAKE3 hash of its
    /// canonical bincode-2 encoding.
    pub fn policy_root(&self) -> PolicyRoot {
        let cfg = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(self, cfg)
            .expect("ParameterBundle should always be serializable");
        PolicyRoot(Hash256::compute(&bytes))
    }

    /// Validates the bundle's internal invariants, matching the
    /// constraints spec.md places on parameter bundles: `ttl >=
    /// 2*reorg_limit`, `k <= n`, `k >= 1`, α in range, caps non-zero.
    pub fn validate(&self) -> Result<(), BundleError> {
        if self.nullifier_ttl_blocks < 2 * self.reorg_limit {
            return Err(BundleError::TtlTooShort {
                ttl: self.nullifier_ttl_blocks,
                reorg_limit: self.reorg_limit,
            });
        }
        if self.da_k == 0 || self.da_k > self.da_n {
            return Err(BundleError::BadErasureProfile {
                k: self.da_k,
                n: self.da_n,
            });
        }
        if self.ema_alpha_denominator == 0 || self.ema_alpha_numerator > self.ema_alpha_denominator
        {
            return Err(BundleError::BadAlpha);
        }
        let alpha_bp = self.ema_alpha_numerator * 100 / self.ema_alpha_denominator;
        if !(60..=98).contains(&alpha_bp) {
            return Err(BundleError::AlphaOutOfRange);
        }
        if self.gamma_total_cap == 0 {
            return Err(BundleError::ZeroGamma);
        }
        Ok(())
    }

    /// Looks up the policy coefficient for `(kind, tag)`, if pinned by
    /// this bundle.
    pub fn coefficient(&self, kind: ProofKind, tag: u32) -> Option<&PolicyCoefficient> {
        self.policy_table.get(&(kind, tag))
    }

    /// Per-type cap for `kind`, defaulting to 0 (i.e. unknown proof kinds
    /// contribute nothing, never "uncapped").
    pub fn per_type_cap(&self, kind: ProofKind) -> u64 {
        self.per_type_caps.get(&kind).copied().unwrap_or(0)
    }
}

/// Errors raised validating a [`ParameterBundle`]'s internal invariants.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("nullifier ttl {ttl} is shorter than 2 * reorg_limit ({reorg_limit})")]
    TtlTooShort { ttl: u64, reorg_limit: u64 },

    #[error("erasure profile k={k} n={n} is invalid (need 1 <= k <= n)")]
    BadErasureProfile { k: u32, n: u32 },

    #[error("EMA alpha numerator/denominator is malformed")]
    BadAlpha,

    #[error("EMA alpha must be within [0.6, 0.98]")]
    AlphaOutOfRange,

    #[error("gamma_total_cap must be non-zero")]
    ZeroGamma,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> ParameterBundle {
        let mut per_type_caps = BTreeMap::new();
        per_type_caps.insert(ProofKind::Ai, 200);
        per_type_caps.insert(ProofKind::Storage, 100);

        ParameterBundle {
            theta_genesis: 100,
            gamma_total_cap: 500,
            per_type_caps,
            escort_q_numerator: 5,
            escort_q_denominator: 10,
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

    #[test]
    fn valid_bundle_passes_validation() {
        assert!(sample_bundle().validate().is_ok());
    }

    #[test]
    fn ttl_shorter_than_twice_reorg_limit_is_rejected() {
        let mut b = sample_bundle();
        b.nullifier_ttl_blocks = 150; // < 2*100
        assert!(matches!(
            b.validate(),
            Err(BundleError::TtlTooShort { .. })
        ));
    }

    #[test]
    fn k_greater_than_n_is_rejected() {
        let mut b = sample_bundle();
        b.da_k = 9;
        b.da_n = 8;
        assert!(matches!(
            b.validate(),
            Err(BundleError::BadErasureProfile { .. })
        ));
    }

    #[test]
    fn policy_root_is_deterministic() {
        let b = sample_bundle();
        assert_eq!(b.policy_root().0, b.policy_root().0);
    }

    #[test]
    fn per_type_cap_defaults_to_zero_for_unknown_kind() {
        let b = sample_bundle();
        assert_eq!(b.per_type_cap(ProofKind::Quantum), 0);
        assert_eq!(b.per_type_cap(ProofKind::Ai), 200);
    }
}
