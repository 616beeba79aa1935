//! Consensus core for an Animica node.
//!
//! This crate provides the building blocks described by the
//! Proof-of-Informative-Epistemic-Stake consensus core:
//!
//! - strongly-typed domain types (`types`),
//! - the cryptographic oracle surface (`crypto`),
//! - an exact, reorg-aware nullifier index (`nullifier`),
//! - the PoIES scorer and its fixed-point entropy term (`scorer`),
//! - EMA-based difficulty retargeting (`difficulty`),
//! - the mempool and fee market (`mempool`),
//! - data-availability commitment and light-client sampling (`da`),
//! - the block validator, fork choice, and top-level engine (`engine`),
//! - pluggable block storage backends (`storage`),
//! - and Prometheus-based metrics (`metrics`).
//!
//! The `node` binary crate composes these pieces into an operator-facing
//! process: CLI, block production loop, and the metrics HTTP exporter.

pub mod crypto;
pub mod da;
pub mod difficulty;
pub mod engine;
pub mod mempool;
pub mod metrics;
pub mod nullifier;
pub mod scorer;
pub mod storage;
pub mod types;

// Re-export the crypto oracle surface.
pub use crypto::{CryptoError, CryptoOracle, DomainTag, NativeOracle};

// Re-export the nullifier index.
pub use nullifier::{NullifierError, NullifierIndex};

// Re-export the PoIES scorer.
pub use scorer::{PoiesScorer, Score, ScoreError};

// Re-export the difficulty controller.
pub use difficulty::{DifficultyController, DifficultyError};

// Re-export the mempool / fee market.
pub use mempool::{Entry, EntryState, MemPool, MempoolConfig, MempoolError, TxPool};

// Re-export the data-availability subsystem.
pub use da::{
    DaError, ErasureCoder, LightClientSampler, NamespaceId, NamespaceProof, NmtNode, NmtTree,
    Sample, required_sample_count,
};

// Re-export the consensus engine and related abstractions.
pub use engine::{
    BlockStore, BlockValidator, BranchDag, BranchEntry, CombinedValidator, ConsensusError,
    ConsensusEngine, EngineConfig, ForkChoiceError, ReceiptAttestationGate,
    ReceiptConsistencyValidator, ReceiptEvidence, StructuralValidator, TxAdmissionGate,
    ValidationContext, ValidationError,
};

// Re-export storage backends.
pub use storage::InMemoryBlockStore;
pub use storage::rocksdb::{RocksDbBlockStore, RocksDbConfig, StorageError};

// Re-export metrics registry and consensus metrics.
pub use metrics::{ConsensusMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the default block validator stack used by a "typical"
/// node: cheap structural checks composed with PoIES receipt
/// consistency checks. Crypto-oracle-backed gates
/// ([`TxAdmissionGate`], [`ReceiptAttestationGate`]) and the score/DA
/// checks are run directly by [`ConsensusEngine::submit_block`] rather
/// than folded into this alias, since they need data this trait's
/// `&Block`-only signature doesn't carry.
pub type DefaultBlockValidator = CombinedValidator<StructuralValidator, ReceiptConsistencyValidator>;

/// Type alias for the default block store backend.
pub type DefaultBlockStore = RocksDbBlockStore;

/// Type alias for the default consensus engine stack.
pub type DefaultConsensusEngine = ConsensusEngine<DefaultBlockStore, DefaultBlockValidator>;
