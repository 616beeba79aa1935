//! Top-level node error type and its mapping onto process exit codes.
//!
//! Exit codes: `0` success, `2` configuration error, `3` corruption
//! detected, `4` incompatible on-disk format version.

use animica_consensus::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("data directory not initialized; run `node reset` or `node start` first")]
    Uninitialized,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parameter bundle error: {0}")]
    Bundle(#[from] animica_consensus::BundleError),

    #[error("consensus engine error: {0}")]
    Consensus(#[from] animica_consensus::ConsensusError),

    #[error("snapshot file is malformed: {0}")]
    MalformedSnapshot(String),

    #[error("no running node found (missing or stale pid file at {0})")]
    NoRunningNode(String),
}

impl NodeError {
    /// Maps this error onto the process exit code spec §6 pins:
    /// `2` configuration error, `3` corruption detected, `4`
    /// incompatible format version. Every other case exits `2`, since
    /// it is reachable only through an operator-facing misconfiguration
    /// (bad path, missing data directory, stale pid file) rather than
    /// on-disk corruption.
    pub fn exit_code(&self) -> i32 {
        match self {
            NodeError::Storage(StorageError::IncompatibleFormatVersion { .. }) => 4,
            NodeError::Storage(StorageError::CorruptedMeta(_)) => 3,
            NodeError::MalformedSnapshot(_) => 3,
            _ => 2,
        }
    }
}
