//! Fork choice: a cumulative-weight branch DAG with deterministic
//! tie-break.
//!
//! Branches are compared by their accumulated PoIES score rather than
//! by height alone, backed by an arena-indexed DAG (`Vec<BranchEntry>`
//! plus `parent_idx` links) instead of walking the block store, so
//! reorg bookkeeping (finding a fork point, the rewind/apply path) is a
//! pointer-chasing operation over a small in-memory structure rather
//! than repeated store lookups.

use std::collections::HashMap;

use crate::types::BlockHash;

/// One node in the branch DAG.
#[derive(Clone, Debug)]
pub struct BranchEntry {
    pub block_hash: BlockHash,
    pub parent_idx: Option<usize>,
    pub height: u64,
    /// This block's own capped weight, `min(S, Γ_total_cap + H_max)`.
    pub weight: u64,
    /// Sum of `weight` over this block and every ancestor back to the
    /// root the DAG was seeded with.
    pub cumulative_weight: u128,
}

/// Errors raised inserting into or querying a [`BranchDag`].
#[derive(Debug, thiserror::Error)]
pub enum ForkChoiceError {
    #[error("parent block {parent} is not present in the branch DAG")]
    ParentNotFound { parent: BlockHash },

    #[error("block {0} is not present in the branch DAG")]
    UnknownBranch(BlockHash),
}

/// Caps a block's raw score at `gamma_total_cap + entropy_ceiling`, the
/// maximum weight any single block can contribute to a branch's
/// cumulative weight — without this cap a single block with an
/// unusually favorable hash draw could dominate fork choice on its own,
/// defeating the purpose of accumulating weight over a whole branch.
pub fn cap_weight(score_total: u64, gamma_total_cap: u64, entropy_ceiling: u64) -> u64 {
    score_total.min(gamma_total_cap.saturating_add(entropy_ceiling))
}

/// Arena-indexed DAG of known branches, tracking the current best head
/// by cumulative weight.
#[derive(Default)]
pub struct BranchDag {
    entries: Vec<BranchEntry>,
    index: HashMap<BlockHash, usize>,
    head_idx: Option<usize>,
}

impl BranchDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the DAG with a root block (the genesis block, or the
    /// node's current tip when bootstrapping from storage) that has no
    /// parent tracked in this DAG.
    pub fn insert_root(&mut self, block_hash: BlockHash, height: u64, weight: u64) -> usize {
        let idx = self.entries.len();
        self.entries.push(BranchEntry {
            block_hash,
            parent_idx: None,
            height,
            weight,
            cumulative_weight: weight as u128,
        });
        self.index.insert(block_hash, idx);
        self.maybe_update_head(idx);
        idx
    }

    /// Inserts a block whose parent is already tracked in this DAG.
    pub fn insert(
        &mut self,
        block_hash: BlockHash,
        parent_hash: BlockHash,
        height: u64,
        weight: u64,
    ) -> Result<usize, ForkChoiceError> {
        let parent_idx = *self
            .index
            .get(&parent_hash)
            .ok_or(ForkChoiceError::ParentNotFound {
                parent: parent_hash,
            })?;
        let parent_cumulative = self.entries[parent_idx].cumulative_weight;

        let idx = self.entries.len();
        self.entries.push(BranchEntry {
            block_hash,
            parent_idx: Some(parent_idx),
            height,
            weight,
            cumulative_weight: parent_cumulative + weight as u128,
        });
        self.index.insert(block_hash, idx);
        self.maybe_update_head(idx);
        Ok(idx)
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.index.contains_key(hash)
    }

    pub fn get(&self, hash: &BlockHash) -> Option<&BranchEntry> {
        self.index.get(hash).map(|&idx| &self.entries[idx])
    }

    pub fn head(&self) -> Option<&BranchEntry> {
        self.head_idx.map(|idx| &self.entries[idx])
    }

    /// Whether `candidate` should replace the current head: strictly
    /// greater cumulative weight, or an equal weight broken by the
    /// lower block hash — a fixed, content-derived tie-break so every
    /// node observing the same two branches converges on the same head
    /// without favoring whichever arrived first.
    fn is_better(&self, candidate_idx: usize) -> bool {
        match self.head_idx {
            None => true,
            Some(head_idx) => {
                let candidate = &self.entries[candidate_idx];
                let head = &self.entries[head_idx];
                match candidate.cumulative_weight.cmp(&head.cumulative_weight) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Equal => candidate.block_hash < head.block_hash,
                    std::cmp::Ordering::Less => false,
                }
            }
        }
    }

    fn maybe_update_head(&mut self, idx: usize) {
        if self.is_better(idx) {
            self.head_idx = Some(idx);
        }
    }

    fn ancestors(&self, hash: &BlockHash) -> Result<Vec<usize>, ForkChoiceError> {
        let mut idx = *self
            .index
            .get(hash)
            .ok_or_else(|| ForkChoiceError::UnknownBranch(*hash))?;
        let mut path = vec![idx];
        while let Some(parent_idx) = self.entries[idx].parent_idx {
            path.push(parent_idx);
            idx = parent_idx;
        }
        Ok(path)
    }

    /// Finds the fork point between `from` and `to` and returns `(fork
    /// point hash, rewind path, apply path)`: `rewind` lists blocks
    /// still on `from`'s branch above the fork point, highest first (the
    /// order an engine should undo them in); `apply` lists blocks on
    /// `to`'s branch above the fork point, lowest first (the order an
    /// engine should re-apply them in).
    pub fn reorg_path(
        &self,
        from: BlockHash,
        to: BlockHash,
    ) -> Result<(BlockHash, Vec<BlockHash>, Vec<BlockHash>), ForkChoiceError> {
        let from_path = self.ancestors(&from)?;
        let to_path = self.ancestors(&to)?;

        let to_set: HashMap<usize, usize> = to_path
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (idx, pos))
            .collect();

        let (from_pos, to_pos) = from_path
            .iter()
            .enumerate()
            .find_map(|(pos, idx)| to_set.get(idx).map(|&tp| (pos, tp)))
            .expect("two branches in the same DAG always share at least the root");

        let fork_idx = from_path[from_pos];
        let fork_hash = self.entries[fork_idx].block_hash;

        let rewind: Vec<BlockHash> = from_path[..from_pos]
            .iter()
            .map(|&idx| self.entries[idx].block_hash)
            .collect();
        let apply: Vec<BlockHash> = to_path[..to_pos]
            .iter()
            .rev()
            .map(|&idx| self.entries[idx].block_hash)
            .collect();

        Ok((fork_hash, rewind, apply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash256;

    fn h(byte: u8) -> BlockHash {
        BlockHash(Hash256([byte; 32]))
    }

    #[test]
    fn higher_cumulative_weight_wins() {
        let mut dag = BranchDag::new();
        dag.insert_root(h(0), 0, 100);
        dag.insert(h(1), h(0), 1, 50).unwrap();
        dag.insert(h(2), h(0), 1, 80).unwrap();

        assert_eq!(dag.head().unwrap().block_hash, h(2));
    }

    #[test]
    fn equal_weight_ties_break_on_lower_hash() {
        let mut dag = BranchDag::new();
        dag.insert_root(h(0), 0, 100);
        dag.insert(h(5), h(0), 1, 50).unwrap();
        dag.insert(h(3), h(0), 1, 50).unwrap();

        assert_eq!(dag.head().unwrap().block_hash, h(3));
    }

    #[test]
    fn cap_weight_clips_at_gamma_plus_entropy_ceiling() {
        assert_eq!(cap_weight(1_000, 200, 50), 250);
        assert_eq!(cap_weight(100, 200, 50), 100);
    }

    #[test]
    fn reorg_path_finds_common_ancestor() {
        let mut dag = BranchDag::new();
        dag.insert_root(h(0), 0, 10);
        dag.insert(h(1), h(0), 1, 10).unwrap();
        dag.insert(h(2), h(1), 2, 10).unwrap();

        dag.insert(h(10), h(0), 1, 5).unwrap();
        dag.insert(h(11), h(10), 2, 5).unwrap();

        let (fork, rewind, apply) = dag.reorg_path(h(2), h(11)).unwrap();
        assert_eq!(fork, h(0));
        assert_eq!(rewind, vec![h(2), h(1)]);
        assert_eq!(apply, vec![h(10), h(11)]);
    }

    #[test]
    fn parent_not_found_is_rejected() {
        let mut dag = BranchDag::new();
        dag.insert_root(h(0), 0, 10);
        let err = dag.insert(h(1), h(99), 1, 10).unwrap_err();
        assert!(matches!(err, ForkChoiceError::ParentNotFound { .. }));
    }
}
