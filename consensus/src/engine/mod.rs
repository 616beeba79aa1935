//! Consensus engine and related abstractions.
//!
//! This module provides a modular, testable consensus layer consisting of:
//!
//! - engine-level configuration ([`config::EngineConfig`]),
//! - errors raised validating blocks and driving the engine ([`error`]),
//! - a cumulative-weight branch DAG fork-choice rule ([`fork_choice`]),
//! - a pluggable block storage seam ([`store::BlockStore`]),
//! - block validity predicates ([`validator`]), and
//! - the [`ConsensusEngine`] itself, which wires all of the above together
//!   with the [`crate::scorer::PoiesScorer`], [`crate::difficulty::DifficultyController`],
//!   and [`crate::nullifier::NullifierIndex`] to run the full per-block
//!   accept/reject/reorg pipeline.

pub mod config;
pub mod error;
pub mod fork_choice;
pub mod store;
pub mod validator;

pub use config::EngineConfig;
pub use error::{ConsensusError, ValidationError};
pub use fork_choice::{BranchDag, BranchEntry, ForkChoiceError};
pub use store::BlockStore;
pub use validator::{
    BlockValidator, CombinedValidator, ReceiptAttestationGate, ReceiptConsistencyValidator,
    ReceiptEvidence, StructuralValidator, TxAdmissionGate, ValidationContext,
};

use std::collections::BTreeMap;

use crate::crypto::CryptoOracle;
use crate::difficulty::DifficultyController;
use crate::mempool::TxPool;
use crate::nullifier::NullifierIndex;
use crate::scorer::PoiesScorer;
use crate::types::{Block, BlockHash, Hash256, ParameterBundle};

/// `ln(2^64)` expressed in µ-nats: the largest value
/// [`crate::scorer::entropy::shortfall_micronats`] can ever return, since
/// `u` is always drawn as a ratio bounded below by `1 / u64::MAX`. Used as
/// the `entropy_ceiling` term in [`fork_choice::cap_weight`] so a branch's
/// cumulative weight has a fixed, bundle-independent upper bound per
/// block on top of the bundle's own `gamma_total_cap`.
pub const ENTROPY_CEILING_MICRONATS: u64 = 44_361_419;

/// Fully wired consensus engine: owns chain storage, the live nullifier
/// index, the Θ retargeting controller, the branch DAG, and the schedule
/// of activated parameter bundles, and drives every accepted block through
/// validation, scoring, nullifier bookkeeping, and fork choice.
///
/// Generic over:
/// - `S`: storage backend implementing [`BlockStore`],
/// - `V`: block validator implementing [`BlockValidator`].
pub struct ConsensusEngine<S, V> {
    pub engine_config: EngineConfig,
    store: S,
    validator: V,
    oracle: Box<dyn CryptoOracle>,
    scorer: PoiesScorer,
    difficulty: DifficultyController,
    nullifiers: NullifierIndex,
    fork_choice: BranchDag,
    /// Parameter bundles keyed by the height at which they become active;
    /// [`Self::active_bundle_at`] looks up the latest entry not exceeding
    /// a given height.
    bundles: BTreeMap<u64, ParameterBundle>,
}

impl<S, V> ConsensusEngine<S, V>
where
    S: BlockStore,
    V: BlockValidator,
{
    /// Bootstraps a new engine from a genesis block already known to
    /// `store` (i.e. `store.tip()` is `Some(genesis_hash)` and
    /// `store.get_block(&genesis_hash)` returns it) and the bundle active
    /// from height 0.
    pub fn new(
        engine_config: EngineConfig,
        store: S,
        validator: V,
        oracle: Box<dyn CryptoOracle>,
        genesis_bundle: ParameterBundle,
        genesis_hash: BlockHash,
        genesis_height: u64,
    ) -> Self {
        let nullifiers = NullifierIndex::new(genesis_bundle.nullifier_ttl_blocks);
        let difficulty = DifficultyController::new(genesis_bundle.clone());

        let mut fork_choice = BranchDag::new();
        fork_choice.insert_root(genesis_hash, genesis_height, 0);

        let mut bundles = BTreeMap::new();
        bundles.insert(0, genesis_bundle);

        Self {
            engine_config,
            store,
            validator,
            oracle,
            scorer: PoiesScorer::new(),
            difficulty,
            nullifiers,
            fork_choice,
            bundles,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn tip(&self) -> Option<BlockHash> {
        self.store.tip()
    }

    pub fn tip_block(&self) -> Option<Block> {
        self.tip().and_then(|h| self.store.get_block(&h))
    }

    pub fn theta(&self) -> u64 {
        self.difficulty.theta()
    }

    pub fn nullifiers(&self) -> &NullifierIndex {
        &self.nullifiers
    }

    pub fn fork_choice(&self) -> &BranchDag {
        &self.fork_choice
    }

    /// Schedules `bundle` to become active at `activation_height`, after
    /// validating its internal invariants. Per spec, activation heights
    /// are timelocked in advance (`activation_height` should be at least
    /// `current_height + bundle.activation_timelock` for a live chain);
    /// that distance check is left to the caller (typically a governance
    /// module outside this crate) since the engine itself has no opinion
    /// on how a new bundle is proposed or approved.
    pub fn schedule_bundle(
        &mut self,
        activation_height: u64,
        bundle: ParameterBundle,
    ) -> Result<(), ConsensusError> {
        bundle.validate()?;
        self.bundles.insert(activation_height, bundle);
        Ok(())
    }

    /// The bundle active at `height`: the value at the greatest scheduled
    /// activation height not exceeding `height`.
    pub fn active_bundle_at(&self, height: u64) -> &ParameterBundle {
        self.bundles
            .range(..=height)
            .next_back()
            .map(|(_, bundle)| bundle)
            .expect("a genesis bundle is always scheduled at height 0")
    }

    /// Draws the `(hash_value, max_value)` pair [`PoiesScorer::score`]
    /// treats as `u`, from the low 8 bytes of the candidate's own header
    /// hash. `hash_value` is clamped to be at least 1 so a hash draw that
    /// happens to start with eight zero bytes is scored as the minimum
    /// nonzero `u` rather than hitting the hard `ZeroU` rejection — an
    /// astronomically unlikely event the protocol still defines behavior
    /// for.
    fn draw_u(block_hash: &BlockHash) -> (u64, u64) {
        let bytes = block_hash.0.as_bytes();
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[0..8]);
        let raw = u64::from_be_bytes(buf);
        (raw.max(1), u64::MAX)
    }

    /// Validates, scores, and (if accepted) imports `block`, applying the
    /// full PoIES pipeline:
    ///
    /// 1. parent lookup and active-bundle resolution,
    /// 2. structural + receipt-consistency validation,
    /// 3. exact nullifier non-membership and insertion,
    /// 4. PoIES scoring and `S >= Θ` acceptance,
    /// 5. branch DAG insertion and fork-choice head update,
    /// 6. reorg application, bounded by the active bundle's `reorg_limit`.
    ///
    /// DA root matching is the caller's responsibility: a node recomputes
    /// the NMT root from the blob shares it actually holds and passes it
    /// in as `da_root_computed`, since the engine itself never holds raw
    /// blob data (only the header's committed `da_root`).
    pub fn submit_block(
        &mut self,
        block: Block,
        da_root_computed: Hash256,
    ) -> Result<BlockHash, ConsensusError> {
        let new_hash = block.hash();
        if self.store.get_block(&new_hash).is_some() {
            return Err(ConsensusError::AlreadyKnown { hash: new_hash });
        }

        let parent_hash = BlockHash(block.header.parent);
        let parent = self
            .store
            .get_block(&parent_hash)
            .ok_or(ValidationError::ParentNotFound {
                parent: parent_hash,
            })?;

        let bundle = self.active_bundle_at(block.header.height).clone();
        self.difficulty.set_bundle(bundle.clone());

        let ctx = ValidationContext {
            parent_height: parent.header.height,
            bundle: &bundle,
        };
        self.validator.validate(&block, &ctx)?;

        if block.header.da_root != da_root_computed {
            return Err(ConsensusError::Invalid(ValidationError::DataAvailability(
                crate::da::DaError::DaRootMismatch {
                    committed: block.header.da_root,
                    computed: da_root_computed,
                },
            )));
        }

        let nullifiers: Vec<Hash256> = block.receipts.iter().map(|r| r.nullifier).collect();
        for n in &nullifiers {
            if self.nullifiers.contains(n) {
                return Err(ConsensusError::Invalid(ValidationError::NullifierReuse(
                    crate::nullifier::NullifierError::AlreadySpent { nullifier: *n },
                )));
            }
        }

        let (hash_value, max_value) = Self::draw_u(&new_hash);
        let score = self
            .scorer
            .score(hash_value, max_value, &block.receipts, &bundle)
            .map_err(ValidationError::from)?;
        let theta = self.difficulty.theta();
        if !score.accepted(theta) {
            return Err(ConsensusError::Invalid(
                ValidationError::ScoreBelowThreshold {
                    score: score.total_micronats,
                    threshold: theta,
                },
            ));
        }

        self.nullifiers
            .insert_batch(block.header.height, &nullifiers)
            .map_err(ValidationError::from)?;

        let weight = fork_choice::cap_weight(
            score.total_micronats,
            bundle.gamma_total_cap,
            ENTROPY_CEILING_MICRONATS,
        );

        let previous_head = self.fork_choice.head().map(|e| e.block_hash);
        self.fork_choice
            .insert(new_hash, parent_hash, block.header.height, weight)?;

        self.store.put_block(block.clone());

        let new_head = self.fork_choice.head().map(|e| e.block_hash);
        if new_head == Some(new_hash) && previous_head != new_head {
            self.apply_reorg(previous_head, new_hash, &bundle)?;
        }

        self.difficulty
            .observe_interval(block.header.timestamp.saturating_sub(parent.header.timestamp));
        if bundle.epoch_length != 0 && block.header.height % bundle.epoch_length == 0 {
            self.difficulty.retarget()?;
        }

        Ok(new_hash)
    }

    /// Rewinds the nullifier index and moves the store's tip when the
    /// branch DAG's head changes to a block outside the previous head's
    /// direct ancestry, bounded by `bundle.reorg_limit`.
    fn apply_reorg(
        &mut self,
        previous_head: Option<BlockHash>,
        new_head: BlockHash,
        bundle: &ParameterBundle,
    ) -> Result<(), ConsensusError> {
        let Some(previous_head) = previous_head else {
            self.store.set_tip(new_head);
            return Ok(());
        };

        let (_fork_hash, rewind, _apply) = self.fork_choice.reorg_path(previous_head, new_head)?;
        let depth = rewind.len() as u64;
        if depth > bundle.reorg_limit {
            return Err(ConsensusError::ReorgLimitExceeded {
                depth,
                limit: bundle.reorg_limit,
            });
        }

        if let Some(fork_entry) = rewind.last().and_then(|h| self.fork_choice.get(h)) {
            let rewind_to_height = fork_entry.height.saturating_sub(1);
            self.nullifiers.rewind(rewind_to_height);
        }

        self.store.set_tip(new_head);
        Ok(())
    }

    /// Expires nullifier entries and mempool entries that have aged past
    /// their TTL relative to the current tip height, and assembles a
    /// fairness-capped, fee-ordered transaction batch for a new block
    /// template.
    pub fn build_template<P: TxPool>(&mut self, pool: &mut P, tip_height: u64) -> Vec<crate::types::Transaction> {
        self.nullifiers.expire(tip_height);
        pool.expire(tip_height);
        pool.ready()
            .into_iter()
            .take(self.engine_config.max_block_txs)
            .collect()
    }
}
