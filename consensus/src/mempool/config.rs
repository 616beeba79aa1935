//! Runtime-facing mempool configuration.
//!
//! Mirrors the fee-market coefficients pinned in
//! [`crate::types::ParameterBundle`], plus the purely-local knobs (pool
//! capacity, per-sender quota) that are an operator choice rather than a
//! consensus-critical parameter.

#[derive(Clone, Debug)]
pub struct MempoolConfig {
    /// Maximum number of entries the pool holds before it must evict to
    /// admit a new, more competitive transaction.
    pub capacity: usize,

    /// Maximum pending (Admitted or Ready) entries per sender.
    pub per_sender_quota: usize,

    /// EMA smoothing factor for the minimum fee rate, as a fixed-point
    /// fraction.
    pub fee_ema_alpha_numerator: u64,
    pub fee_ema_alpha_denominator: u64,

    /// Pool utilization (as basis points of `capacity`) above which the
    /// surge multiplier applies to the minimum fee rate.
    pub surge_utilization_bp: u32,

    /// Multiplier (basis points, 10_000 = 1.0x) applied to the EMA
    /// minimum fee rate once utilization crosses `surge_utilization_bp`.
    pub surge_multiplier_bp: u32,

    /// Minimum percentage a replacement's fee rate must exceed the
    /// existing entry's by to replace it (RBF bump threshold).
    pub rbf_bump_pct: u32,

    /// Blocks after which a still-pending entry expires out of the
    /// pool.
    pub expiry_blocks: u64,
}

impl MempoolConfig {
    /// Derives a [`MempoolConfig`] from the consensus-pinned fee-market
    /// coefficients in a [`crate::types::ParameterBundle`], combined
    /// with locally-chosen pool sizing.
    pub fn from_bundle(
        bundle: &crate::types::ParameterBundle,
        capacity: usize,
        per_sender_quota: usize,
        expiry_blocks: u64,
    ) -> Self {
        Self {
            capacity,
            per_sender_quota,
            fee_ema_alpha_numerator: bundle.fee_ema_alpha_numerator,
            fee_ema_alpha_denominator: bundle.fee_ema_alpha_denominator,
            surge_utilization_bp: bundle.fee_surge_utilization_bp,
            surge_multiplier_bp: bundle.fee_surge_multiplier_bp,
            rbf_bump_pct: bundle.rbf_bump_pct,
            expiry_blocks,
        }
    }
}
