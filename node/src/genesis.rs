//! Genesis bundle and genesis block bootstrapping.
//!
//! Parameter bundles are pinned into headers only by their
//! [`animica_consensus::PolicyRoot`] digest; the bundles themselves are
//! never persisted by [`animica_consensus::RocksDbBlockStore`]. This
//! module owns a small JSON-on-disk store for bundles, keyed by the
//! height at which each becomes active, under `<data-dir>/params/`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use animica_consensus::{
    Block, BlockHash, Hash256, Header, MinerId, ParameterBundle, ProofKind, PolicyCoefficient,
};

use crate::error::NodeError;

/// The activation height every node bootstraps at.
pub const GENESIS_HEIGHT: u64 = 0;

/// A conservative, safe-by-default parameter bundle. An operator
/// running a real network replaces this by writing a new file into
/// `params/` before `node start` is ever run against that data
/// directory; once a genesis bundle has been written it is immutable
/// for the life of the chain (changing it after the fact would not
/// match what any already-produced block was validated against).
pub fn default_genesis_bundle() -> ParameterBundle {
    let mut per_type_caps = BTreeMap::new();
    per_type_caps.insert(ProofKind::Hash, 0);
    per_type_caps.insert(ProofKind::Ai, 200_000);
    per_type_caps.insert(ProofKind::Quantum, 150_000);
    per_type_caps.insert(ProofKind::Storage, 150_000);
    per_type_caps.insert(ProofKind::Vdf, 100_000);
    per_type_caps.insert(ProofKind::Zk, 150_000);

    let mut policy_table = BTreeMap::new();
    for kind in ProofKind::ALL {
        policy_table.insert(
            (kind, 0u32),
            PolicyCoefficient {
                metric_id: 0,
                weight_num: 1,
                weight_den: 1,
                ceiling: 200_000,
            },
        );
    }

    ParameterBundle {
        theta_genesis: 30_000_000,
        gamma_total_cap: 750_000,
        per_type_caps,
        escort_q_numerator: 5,
        escort_q_denominator: 10,
        policy_table,
        ema_alpha_numerator: 9,
        ema_alpha_denominator: 10,
        lambda_target_secs: 10,
        epoch_length: 2_016,
        clamp_down_numerator: 25,
        clamp_down_denominator: 100,
        clamp_up_numerator: 25,
        clamp_up_denominator: 100,
        nullifier_ttl_blocks: 4_032,
        reorg_limit: 2_000,
        activation_timelock: 10_000,
        fee_ema_alpha_numerator: 1,
        fee_ema_alpha_denominator: 8,
        fee_surge_utilization_bp: 8_000,
        fee_surge_multiplier_bp: 20_000,
        rbf_bump_pct: 10,
        da_k: 4,
        da_n: 8,
        blob_size_cap_bytes: 1 << 20,
        das_target_failure_numerator: 1,
        das_target_failure_denominator: 1_000_000,
    }
}

/// Deterministic genesis-block header derived from `bundle` alone, so
/// every node bootstrapping from the same genesis bundle agrees on the
/// genesis block hash without any external coordination.
pub fn genesis_block(bundle: &ParameterBundle) -> Block {
    let policy_root = bundle.policy_root();
    let alg_policy_root = animica_consensus::engine::validator::alg_policy_root(bundle);

    let header = Header {
        parent: Hash256::ZERO,
        height: GENESIS_HEIGHT,
        timestamp: 0,
        miner: MinerId(Hash256::compute(b"animica/genesis-miner/v1")),
        nonce: 0,
        policy_root,
        alg_policy_root,
        psi_receipt_commitment: Hash256::ZERO,
        da_root: Hash256::ZERO,
        state_root: Hash256::ZERO,
        transactions_root: Hash256::ZERO,
        receipts_root: Hash256::ZERO,
    };

    Block {
        header,
        transactions: Vec::new(),
        receipts: Vec::new(),
    }
}

pub fn genesis_bundle_path(params_dir: &Path) -> PathBuf {
    bundle_path_for_height(params_dir, GENESIS_HEIGHT)
}

pub fn bundle_path_for_height(params_dir: &Path, height: u64) -> PathBuf {
    params_dir.join(format!("{height:020}.json"))
}

/// Writes `bundle` as the activation record for `height`, creating
/// `params_dir` if needed. Fails closed (does not overwrite) if a
/// bundle is already scheduled at that height, since bundles are
/// pinned by block headers and must never silently change underfoot.
pub fn write_bundle(
    params_dir: &Path,
    height: u64,
    bundle: &ParameterBundle,
) -> Result<(), NodeError> {
    std::fs::create_dir_all(params_dir)?;
    let path = bundle_path_for_height(params_dir, height);
    if path.exists() {
        return Err(NodeError::Config(format!(
            "a parameter bundle is already scheduled at height {height} ({path:?})"
        )));
    }
    let json = serde_json::to_vec_pretty(bundle)
        .map_err(|e| NodeError::Config(format!("failed to encode parameter bundle: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

fn read_bundle(path: &Path) -> Result<ParameterBundle, NodeError> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| NodeError::MalformedSnapshot(format!("{path:?}: {e}")))
}

/// Loads every scheduled bundle under `params_dir`, keyed by the
/// activation height encoded in its filename.
pub fn load_all_bundles(params_dir: &Path) -> Result<BTreeMap<u64, ParameterBundle>, NodeError> {
    let mut out = BTreeMap::new();
    if !params_dir.is_dir() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(params_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| NodeError::MalformedSnapshot(format!("{path:?}: bad filename")))?;
        let height: u64 = stem
            .parse()
            .map_err(|_| NodeError::MalformedSnapshot(format!("{path:?}: bad height in filename")))?;
        let bundle = read_bundle(&path)?;
        bundle.validate()?;
        out.insert(height, bundle);
    }
    Ok(out)
}

/// Loads the bundle scheduled at exactly [`GENESIS_HEIGHT`], the one
/// used to bootstrap [`animica_consensus::ConsensusEngine::new`].
pub fn load_genesis_bundle(params_dir: &Path) -> Result<ParameterBundle, NodeError> {
    let path = genesis_bundle_path(params_dir);
    if !path.is_file() {
        return Err(NodeError::Uninitialized);
    }
    let bundle = read_bundle(&path)?;
    bundle.validate()?;
    Ok(bundle)
}

/// Returns the genesis block's hash without constructing a full engine,
/// for `show-head`/`show-params` style read-only queries.
pub fn genesis_hash(bundle: &ParameterBundle) -> BlockHash {
    genesis_block(bundle).hash()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_genesis_bundle_passes_validation() {
        assert!(default_genesis_bundle().validate().is_ok());
    }

    #[test]
    fn genesis_block_is_height_zero_with_zero_parent() {
        let bundle = default_genesis_bundle();
        let block = genesis_block(&bundle);
        assert_eq!(block.header.height, 0);
        assert_eq!(block.header.parent, Hash256::ZERO);
    }

    #[test]
    fn genesis_hash_is_deterministic_given_the_same_bundle() {
        let bundle = default_genesis_bundle();
        assert_eq!(genesis_hash(&bundle), genesis_hash(&bundle));
    }

    #[test]
    fn write_then_load_genesis_bundle_roundtrips() {
        let tmp = tempfile::TempDir::new().unwrap();
        let params_dir = tmp.path().join("params");
        let bundle = default_genesis_bundle();

        write_bundle(&params_dir, GENESIS_HEIGHT, &bundle).unwrap();
        let loaded = load_genesis_bundle(&params_dir).unwrap();

        assert_eq!(loaded.theta_genesis, bundle.theta_genesis);
        assert_eq!(loaded.policy_root().0, bundle.policy_root().0);
    }

    #[test]
    fn writing_a_second_bundle_at_the_same_height_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let params_dir = tmp.path().join("params");
        let bundle = default_genesis_bundle();

        write_bundle(&params_dir, GENESIS_HEIGHT, &bundle).unwrap();
        let err = write_bundle(&params_dir, GENESIS_HEIGHT, &bundle).unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn load_genesis_bundle_without_bootstrap_is_uninitialized() {
        let tmp = tempfile::TempDir::new().unwrap();
        let params_dir = tmp.path().join("params");
        let err = load_genesis_bundle(&params_dir).unwrap_err();
        assert!(matches!(err, NodeError::Uninitialized));
    }

    #[test]
    fn load_all_bundles_finds_every_scheduled_activation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let params_dir = tmp.path().join("params");
        let bundle = default_genesis_bundle();

        write_bundle(&params_dir, GENESIS_HEIGHT, &bundle).unwrap();
        write_bundle(&params_dir, 10_000, &bundle).unwrap();

        let all = load_all_bundles(&params_dir).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key(&0));
        assert!(all.contains_key(&10_000));
    }
}
