//! Block storage seam.

use crate::types::{Block, BlockHash};

/// Pluggable block storage. [`crate::storage::mem::InMemoryBlockStore`]
/// and [`crate::storage::rocksdb::RocksDbBlockStore`] both implement
/// this; a [`super::ConsensusEngine`] is generic over it so tests can
/// run against the in-memory backend while a live node runs against
/// RocksDB.
pub trait BlockStore: Send + Sync {
    fn get_block(&self, hash: &BlockHash) -> Option<Block>;
    fn put_block(&mut self, block: Block);
    fn tip(&self) -> Option<BlockHash>;
    fn set_tip(&mut self, hash: BlockHash);
}
