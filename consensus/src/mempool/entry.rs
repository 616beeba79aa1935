//! Mempool entry state machine: `Admitted -> Ready -> {Included, Evicted,
//! Expired}`.

use crate::types::Transaction;

/// Lifecycle state of a pooled transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryState {
    /// Passed admission but still waiting on an ordering dependency
    /// (e.g. a lower nonce from the same sender not yet seen).
    Admitted,
    /// Eligible for inclusion in the next block a producer assembles.
    Ready,
    /// Included in a block that became canonical.
    Included,
    /// Displaced by eviction (pool pressure) or replacement (RBF).
    Evicted,
    /// Aged out after `expiry_blocks` without being included.
    Expired,
}

/// A pooled transaction plus its lifecycle and bookkeeping metadata.
#[derive(Clone, Debug)]
pub struct Entry {
    pub tx: Transaction,
    pub state: EntryState,
    /// Height at which this entry was admitted, used for expiry.
    pub admitted_height: u64,
}

impl Entry {
    pub fn new(tx: Transaction, admitted_height: u64) -> Self {
        Self {
            tx,
            state: EntryState::Admitted,
            admitted_height,
        }
    }

    pub fn mark_ready(&mut self) {
        if self.state == EntryState::Admitted {
            self.state = EntryState::Ready;
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            EntryState::Included | EntryState::Evicted | EntryState::Expired
        )
    }
}
