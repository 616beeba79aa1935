//! `export-snapshot` / `verify-snapshot`: a flat, canonical dump of
//! every block held by a node's [`animica_consensus::RocksDbBlockStore`],
//! plus its tip pointer.
//!
//! Snapshots use the same canonical-bincode-2 + leading format-version
//! byte discipline as the block store itself, so a version mismatch is
//! caught the same way (`StorageError`-style, mapped to exit code 4)
//! rather than panicking on a malformed decode.

use std::path::Path;

use animica_consensus::{Block, BlockHash, BlockStore, RocksDbBlockStore};
use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// On-disk encoding version for snapshot files. Independent of
/// [`animica_consensus::storage::rocksdb::FORMAT_VERSION`] since a
/// snapshot's own envelope (this struct's shape) can change without the
/// per-block record format changing and vice versa.
pub const SNAPSHOT_FORMAT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    format_version: u8,
    tip: Option<BlockHash>,
    blocks: Vec<Block>,
}

/// Walks every block in `store` and writes a snapshot file to `out_path`.
pub fn export(store: &RocksDbBlockStore, out_path: &Path) -> Result<usize, NodeError> {
    let blocks: Vec<Block> = store
        .iter_blocks()?
        .collect::<Result<Vec<_>, _>>()?;
    let count = blocks.len();

    let snapshot = Snapshot {
        format_version: SNAPSHOT_FORMAT_VERSION,
        tip: store.tip(),
        blocks,
    };

    let cfg = bincode::config::standard();
    let bytes = bincode::serde::encode_to_vec(&snapshot, cfg)
        .map_err(|e| NodeError::MalformedSnapshot(format!("failed to encode snapshot: {e}")))?;
    std::fs::write(out_path, bytes)?;
    Ok(count)
}

/// Reads a snapshot file back, checking its format version and that
/// every non-genesis block's parent is present among the snapshot's own
/// blocks (an elementary structural soundness check; full consensus
/// re-validation of a snapshot is out of scope for this CLI command).
///
/// Returns the number of blocks found to be well-formed.
pub fn verify(path: &Path) -> Result<usize, NodeError> {
    let bytes = std::fs::read(path)?;
    let cfg = bincode::config::standard();
    let (snapshot, _): (Snapshot, usize) = bincode::serde::decode_from_slice(&bytes, cfg)
        .map_err(|e| NodeError::MalformedSnapshot(format!("{path:?}: {e}")))?;

    if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
        return Err(NodeError::Storage(
            animica_consensus::StorageError::IncompatibleFormatVersion {
                found: snapshot.format_version,
                supported: SNAPSHOT_FORMAT_VERSION,
            },
        ));
    }

    let known: std::collections::HashSet<BlockHash> =
        snapshot.blocks.iter().map(|b| b.hash()).collect();

    for block in &snapshot.blocks {
        if block.header.height == 0 {
            continue;
        }
        let parent = BlockHash(block.header.parent);
        if !known.contains(&parent) {
            return Err(NodeError::MalformedSnapshot(format!(
                "block at height {} references parent {parent} which is not present in the snapshot",
                block.header.height
            )));
        }
    }

    if let Some(tip) = snapshot.tip {
        if !known.contains(&tip) && !snapshot.blocks.is_empty() {
            return Err(NodeError::MalformedSnapshot(format!(
                "recorded tip {tip} is not present among the snapshot's blocks"
            )));
        }
    }

    Ok(snapshot.blocks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis;
    use animica_consensus::RocksDbConfig;

    fn temp_store() -> (tempfile::TempDir, RocksDbBlockStore) {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = RocksDbConfig {
            path: tmp.path().join("db").to_string_lossy().into_owned(),
            create_if_missing: true,
        };
        let store = RocksDbBlockStore::open(&cfg).unwrap();
        (tmp, store)
    }

    #[test]
    fn export_then_verify_roundtrips_an_empty_store() {
        let (tmp, store) = temp_store();
        let out = tmp.path().join("snapshot.bin");

        let exported = export(&store, &out).unwrap();
        assert_eq!(exported, 0);

        let verified = verify(&out).unwrap();
        assert_eq!(verified, 0);
    }

    #[test]
    fn export_then_verify_roundtrips_a_genesis_only_store() {
        let (tmp, mut store) = temp_store();
        let bundle = genesis::default_genesis_bundle();
        let block = genesis::genesis_block(&bundle);
        let hash = block.hash();

        store.put_block(block);
        store.set_tip(hash);

        let out = tmp.path().join("snapshot.bin");
        let exported = export(&store, &out).unwrap();
        assert_eq!(exported, 1);

        let verified = verify(&out).unwrap();
        assert_eq!(verified, 1);
    }

    #[test]
    fn verify_rejects_a_snapshot_with_a_future_format_version() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("snapshot.bin");

        let snapshot = Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION + 1,
            tip: None,
            blocks: Vec::new(),
        };
        let cfg = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&snapshot, cfg).unwrap();
        std::fs::write(&out, bytes).unwrap();

        let err = verify(&out).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Storage(animica_consensus::StorageError::IncompatibleFormatVersion { .. })
        ));
    }

    #[test]
    fn verify_rejects_malformed_bytes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("snapshot.bin");
        std::fs::write(&out, b"not a snapshot").unwrap();

        let err = verify(&out).unwrap_err();
        assert!(matches!(err, NodeError::MalformedSnapshot(_)));
    }
}
