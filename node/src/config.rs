//! Node-level configuration: aggregates the consensus crate's
//! component configs with the purely operator-facing knobs (data
//! directory, metrics listen address, chain id) that live outside of
//! it.
//!
//! Loaded from defaults for now (no external file format is mandated);
//! the CLI's global flags layer on top of [`NodeConfig::default`] via
//! struct-update syntax in `main`. A TOML/env loader is a natural next
//! step but is not required by anything this node currently does.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use animica_consensus::{EngineConfig, MempoolConfig, ParameterBundle, RocksDbConfig};

use crate::genesis;

#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Root directory holding the RocksDB database, the `params/`
    /// directory, and the pid file.
    pub data_dir: PathBuf,

    /// Address the Prometheus `/metrics` exporter listens on.
    pub metrics_addr: SocketAddr,

    /// Whether to run the metrics HTTP exporter at all.
    pub metrics_enabled: bool,

    pub engine: EngineConfig,

    /// Local mempool sizing knobs, combined with the genesis bundle's
    /// fee-market coefficients at startup (see [`crate::genesis`]).
    pub mempool_capacity: usize,
    pub mempool_per_sender_quota: usize,
    pub mempool_expiry_blocks: u64,
}

impl NodeConfig {
    pub fn storage(&self) -> RocksDbConfig {
        RocksDbConfig {
            path: self.db_path().to_string_lossy().to_string(),
            create_if_missing: true,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("db")
    }

    pub fn params_dir(&self) -> PathBuf {
        self.data_dir.join("params")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.data_dir.join("node.pid")
    }

    pub fn mempool_config(&self, bundle: &ParameterBundle) -> MempoolConfig {
        MempoolConfig::from_bundle(
            bundle,
            self.mempool_capacity,
            self.mempool_per_sender_quota,
            self.mempool_expiry_blocks,
        )
    }

    /// Whether a data directory at this config's path has already been
    /// initialized (i.e. `reset`/`start` has bootstrapped a genesis
    /// bundle into `params/`).
    pub fn is_initialized(&self) -> bool {
        genesis::genesis_bundle_path(&self.params_dir()).is_file()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/animica-node"),
            metrics_addr: "127.0.0.1:9898".parse().unwrap(),
            metrics_enabled: true,
            engine: EngineConfig::default(),
            mempool_capacity: 10_000,
            mempool_per_sender_quota: 16,
            mempool_expiry_blocks: 200,
        }
    }
}

/// Rewrites `data_dir` to an absolute-ish, already-created root; callers
/// still go through [`NodeConfig::db_path`]/[`NodeConfig::params_dir`]
/// for the actual subdirectories.
pub fn ensure_data_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis;

    #[test]
    fn is_initialized_is_false_before_a_genesis_bundle_is_written() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = NodeConfig {
            data_dir: tmp.path().to_path_buf(),
            ..NodeConfig::default()
        };
        assert!(!config.is_initialized());
    }

    #[test]
    fn is_initialized_is_true_once_a_genesis_bundle_exists() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = NodeConfig {
            data_dir: tmp.path().to_path_buf(),
            ..NodeConfig::default()
        };
        genesis::write_bundle(
            &config.params_dir(),
            genesis::GENESIS_HEIGHT,
            &genesis::default_genesis_bundle(),
        )
        .unwrap();
        assert!(config.is_initialized());
    }

    #[test]
    fn mempool_config_carries_the_bundles_fee_market_coefficients() {
        let config = NodeConfig::default();
        let bundle = genesis::default_genesis_bundle();
        let mempool_config = config.mempool_config(&bundle);
        assert_eq!(mempool_config.capacity, config.mempool_capacity);
        assert_eq!(
            mempool_config.fee_ema_alpha_numerator,
            bundle.fee_ema_alpha_numerator
        );
    }

    #[test]
    fn storage_and_subpaths_are_rooted_under_data_dir() {
        let config = NodeConfig {
            data_dir: PathBuf::from("/tmp/example-data-dir"),
            ..NodeConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/example-data-dir/db"));
        assert_eq!(
            config.params_dir(),
            PathBuf::from("/tmp/example-data-dir/params")
        );
        assert_eq!(config.storage().path, config.db_path().to_string_lossy());
    }
}
