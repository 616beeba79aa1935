//! Errors raised by [`super::pool::TxPool`] admission and replacement.

use crate::types::Hash256;

#[derive(Debug, thiserror::Error)]
pub enum MempoolError {
    #[error("fee rate {offered} is below the current EMA minimum of {minimum}")]
    Underpriced { offered: u64, minimum: u64 },

    #[error("replacement fee rate {offered} does not exceed the existing entry's {existing} by the required bump")]
    ReplacementUnderpriced { offered: u64, existing: u64 },

    #[error("sender has {count} pending transactions, at or above the per-sender quota of {quota}")]
    SenderQuotaExceeded { count: usize, quota: usize },

    #[error("pool is full ({size}/{capacity}) and the incoming transaction does not outrank the cheapest evictable entry")]
    PoolFull { size: usize, capacity: usize },

    #[error("transaction {id} is already pending at this nonce")]
    DuplicateNonce { id: Hash256 },
}
