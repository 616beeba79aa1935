//! Engine-level configuration: operator-chosen limits layered on top of
//! the consensus-pinned [`crate::types::ParameterBundle`].
//!
//! These knobs govern how a local producer assembles a block template;
//! they are never consensus-critical themselves (two nodes with
//! different `max_block_txs` still agree on whether a received block is
//! valid), which is why they live beside the bundle rather than inside
//! it.

/// Local block-template and chain-identity configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Chain identifier folded into every transaction signature's
    /// pre-image, so a signature from one network can't be replayed on
    /// another.
    pub chain_id: u64,

    /// Soft limit on the number of transactions a locally-assembled
    /// block template includes.
    pub max_block_txs: usize,

    /// Soft limit on the total serialized size of a block template, in
    /// bytes.
    pub max_block_size_bytes: usize,

    /// Maximum number of `ready()` entries drawn from a single sender
    /// into one block template, enforcing per-sender fairness
    /// independently of the mempool's own per-sender pending quota.
    pub max_ready_per_sender: usize,

    /// Target block interval in seconds, used only to space out a local
    /// producer loop; retargeting itself reads `lambda_target_secs` off
    /// the active [`crate::types::ParameterBundle`].
    pub block_time_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            max_block_txs: 10_000,
            max_block_size_bytes: 1_000_000,
            max_ready_per_sender: 16,
            block_time_secs: 10,
        }
    }
}
