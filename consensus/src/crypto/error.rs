//! Errors surfaced by [`super::CryptoOracle`] implementations.

/// Rejections a [`super::CryptoOracle`] can raise. These are
/// distinguished from a plain `Ok(false)` verification failure: `Ok(false)`
/// means "the oracle ran and the proof did not check out", while these
/// variants mean the oracle could not run the check at all.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("input of {size} bytes exceeds the oracle's maximum of {max} bytes")]
    OversizeInput { size: usize, max: usize },

    #[error("proof bytes are malformed: {reason}")]
    MalformedProof { reason: String },

    #[error("verification backend failed: {reason}")]
    Failed { reason: String },
}
