//! Exact nullifier index.
//!
//! A nullifier is a one-time identifier derived from `(kind, evidence,
//! account, epoch_tag)`. Consuming the same nullifier twice is a
//! double-spend of the same proof of work, and must be rejected exactly
//! — a Bloom-filter-style probabilistic index is not acceptable here,
//! since a false negative would let a duplicate receipt through.
//!
//! Entries expire after `ttl_blocks` so the index does not grow without
//! bound; expiry is height-indexed rather than time-indexed so it stays
//! a pure function of chain height, and is reversible on reorg via
//! [`NullifierIndex::rewind`].

pub mod error;

pub use error::NullifierError;

use std::collections::{BTreeMap, HashSet};

use crate::types::Hash256;

/// Height-indexed, exactly-tracked index of spent nullifiers.
///
/// Internally this is a `BTreeMap<height, HashSet<Hash256>>` segmented
/// by the height at which each nullifier was inserted, plus a flat
/// `HashSet` mirroring the union of all segments for O(1) membership
/// tests. The segmentation exists solely to make `expire` an O(segment
/// size) operation instead of an O(total size) scan.
#[derive(Default)]
pub struct NullifierIndex {
    segments: BTreeMap<u64, HashSet<Hash256>>,
    all: HashSet<Hash256>,
    ttl_blocks: u64,
}

impl NullifierIndex {
    /// Creates an empty index with the given time-to-live, in blocks.
    pub fn new(ttl_blocks: u64) -> Self {
        Self {
            segments: BTreeMap::new(),
            all: HashSet::new(),
            ttl_blocks,
        }
    }

    /// Returns `true` if `nullifier` is currently spent (present and not
    /// yet expired).
    pub fn contains(&self, nullifier: &Hash256) -> bool {
        self.all.contains(nullifier)
    }

    /// Inserts every nullifier in `batch` at `height`, rejecting the
    /// whole batch if any member is already spent.
    ///
    /// Validation happens before any mutation: either all of `batch`
    /// lands, or none of it does, so a rejected block never leaves the
    /// index partially updated.
    pub fn insert_batch(
        &mut self,
        height: u64,
        batch: &[Hash256],
    ) -> Result<(), NullifierError> {
        for nullifier in batch {
            if self.all.contains(nullifier) {
                return Err(NullifierError::AlreadySpent {
                    nullifier: *nullifier,
                });
            }
        }
        // Reject in-batch duplicates too; two receipts in the same block
        // both claiming the same nullifier are just as invalid as a
        // cross-block replay.
        let mut seen_in_batch = HashSet::with_capacity(batch.len());
        for nullifier in batch {
            if !seen_in_batch.insert(*nullifier) {
                return Err(NullifierError::AlreadySpent {
                    nullifier: *nullifier,
                });
            }
        }

        let segment = self.segments.entry(height).or_default();
        for nullifier in batch {
            segment.insert(*nullifier);
            self.all.insert(*nullifier);
        }
        Ok(())
    }

    /// Drops every segment at or below `height.saturating_sub(ttl_blocks)`,
    /// i.e. every nullifier whose TTL has elapsed relative to the new
    /// canonical tip height `height`.
    pub fn expire(&mut self, height: u64) {
        let cutoff = height.saturating_sub(self.ttl_blocks);
        let stale_heights: Vec<u64> = self
            .segments
            .range(..=cutoff)
            .map(|(h, _)| *h)
            .collect();
        for h in stale_heights {
            if let Some(segment) = self.segments.remove(&h) {
                for nullifier in segment {
                    self.all.remove(&nullifier);
                }
            }
        }
    }

    /// Removes every nullifier inserted at a height strictly greater
    /// than `new_tip_height`, undoing the effect of `insert_batch` for
    /// the blocks a reorg discarded.
    ///
    /// This only reverses insertions still held in a live segment;
    /// nullifiers whose segment already expired via [`Self::expire`]
    /// are gone for good, which is why the reorg limit and the TTL are
    /// required to satisfy `ttl_blocks >= 2 * reorg_limit` — a rewind
    /// can never need to reach further back than a segment that is
    /// still live.
    pub fn rewind(&mut self, new_tip_height: u64) {
        let stale_heights: Vec<u64> = self
            .segments
            .range((new_tip_height + 1)..)
            .map(|(h, _)| *h)
            .collect();
        for h in stale_heights {
            if let Some(segment) = self.segments.remove(&h) {
                for nullifier in segment {
                    self.all.remove(&nullifier);
                }
            }
        }
    }

    /// Total number of currently-tracked (unexpired) nullifiers.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(byte: u8) -> Hash256 {
        Hash256([byte; 32])
    }

    #[test]
    fn insert_then_contains() {
        let mut idx = NullifierIndex::new(100);
        idx.insert_batch(10, &[n(1), n(2)]).unwrap();
        assert!(idx.contains(&n(1)));
        assert!(idx.contains(&n(2)));
        assert!(!idx.contains(&n(3)));
    }

    #[test]
    fn duplicate_across_batches_is_rejected() {
        let mut idx = NullifierIndex::new(100);
        idx.insert_batch(10, &[n(1)]).unwrap();
        let err = idx.insert_batch(11, &[n(1)]).unwrap_err();
        assert!(matches!(err, NullifierError::AlreadySpent { .. }));
    }

    #[test]
    fn duplicate_within_batch_is_rejected() {
        let mut idx = NullifierIndex::new(100);
        let err = idx.insert_batch(10, &[n(1), n(1)]).unwrap_err();
        assert!(matches!(err, NullifierError::AlreadySpent { .. }));
    }

    #[test]
    fn rejected_batch_leaves_no_partial_state() {
        let mut idx = NullifierIndex::new(100);
        idx.insert_batch(10, &[n(1)]).unwrap();
        let _ = idx.insert_batch(11, &[n(2), n(1)]);
        assert!(!idx.contains(&n(2)));
    }

    #[test]
    fn expire_drops_entries_past_ttl() {
        let mut idx = NullifierIndex::new(10);
        idx.insert_batch(5, &[n(1)]).unwrap();
        idx.expire(14);
        assert!(idx.contains(&n(1)));
        idx.expire(15);
        assert!(!idx.contains(&n(1)));
    }

    #[test]
    fn rewind_undoes_insertions_above_new_tip() {
        let mut idx = NullifierIndex::new(100);
        idx.insert_batch(10, &[n(1)]).unwrap();
        idx.insert_batch(11, &[n(2)]).unwrap();
        idx.rewind(10);
        assert!(idx.contains(&n(1)));
        assert!(!idx.contains(&n(2)));
    }

    #[test]
    fn rewound_nullifier_can_be_reinserted() {
        let mut idx = NullifierIndex::new(100);
        idx.insert_batch(11, &[n(2)]).unwrap();
        idx.rewind(10);
        idx.insert_batch(11, &[n(2)]).unwrap();
        assert!(idx.contains(&n(2)));
    }
}
