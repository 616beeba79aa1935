//! Errors raised by the data-availability subsystem.

use crate::types::Hash256;

#[derive(Debug, thiserror::Error)]
pub enum DaError {
    #[error("recomputed NMT root {computed} does not match the committed root {committed}")]
    DaRootMismatch {
        committed: Hash256,
        computed: Hash256,
    },

    #[error("blob of {size} bytes exceeds the cap of {cap} bytes")]
    BlobTooLarge { size: usize, cap: usize },

    #[error("erasure profile requires at least k={k} shares to reconstruct, got {got}")]
    InsufficientShares { k: usize, got: usize },

    #[error("namespace range proof does not cover the requested namespace")]
    NamespaceNotCovered,

    #[error("light-client sample at index {index} failed to verify against the committed root")]
    SampleFailed { index: usize },
}
