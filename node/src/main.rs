//! Operator-facing CLI for an Animica consensus node.
//!
//! Subcommands: `start`, `stop`, `reset`, `show-head`, `show-params`,
//! `export-snapshot`, `verify-snapshot`. Exit codes: `0` success, `2`
//! configuration error, `3` corruption detected, `4` incompatible
//! on-disk format version (see [`error::NodeError::exit_code`]).

mod config;
mod error;
mod genesis;
mod pidfile;
mod producer;
mod snapshot;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use animica_consensus::{
    BlockStore, CombinedValidator, ConsensusEngine, MetricsRegistry, MinerId, NativeOracle,
    ReceiptConsistencyValidator, RocksDbBlockStore, StructuralValidator, run_prometheus_http_server,
};

use config::NodeConfig;
use error::NodeError;

#[derive(Parser)]
#[command(name = "animica-node", version, about = "Animica consensus node")]
struct Cli {
    /// Root directory for the node's database, parameter bundles, and
    /// pid file.
    #[arg(long, global = true, env = "ANIMICA_DATA_DIR", default_value = "data/animica-node")]
    data_dir: PathBuf,

    /// Address the Prometheus `/metrics` exporter listens on.
    #[arg(long, global = true, env = "ANIMICA_METRICS_ADDR", default_value = "127.0.0.1:9898")]
    metrics_addr: SocketAddr,

    /// Disable the metrics HTTP exporter entirely.
    #[arg(long, global = true)]
    no_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bootstrap (if needed) and run the node's block production loop.
    Start {
        /// Block interval in seconds; overrides the engine default.
        #[arg(long)]
        block_time_secs: Option<u64>,
    },
    /// Signal a running `start`ed node to shut down.
    Stop,
    /// Wipe the data directory and re-bootstrap an empty chain.
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Print the current chain head.
    ShowHead,
    /// Print every scheduled parameter bundle.
    ShowParams,
    /// Write every stored block to a snapshot file.
    ExportSnapshot {
        #[arg(long, default_value = "snapshot.bin")]
        out: PathBuf,
    },
    /// Check a snapshot file's structural soundness.
    VerifySnapshot {
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut node_config = NodeConfig {
        data_dir: cli.data_dir.clone(),
        metrics_addr: cli.metrics_addr,
        metrics_enabled: !cli.no_metrics,
        ..NodeConfig::default()
    };

    let result = match cli.command {
        Command::Start { block_time_secs } => {
            if let Some(secs) = block_time_secs {
                node_config.engine.block_time_secs = secs;
            }
            run_start(node_config)
        }
        Command::Stop => run_stop(node_config),
        Command::Reset { yes } => run_reset(node_config, yes),
        Command::ShowHead => run_show_head(node_config),
        Command::ShowParams => run_show_params(node_config),
        Command::ExportSnapshot { out } => run_export_snapshot(node_config, &out),
        Command::VerifySnapshot { path } => run_verify_snapshot(&path),
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "node command failed");
        std::process::exit(err.exit_code());
    }
}

fn run_start(node_config: NodeConfig) -> Result<(), NodeError> {
    config::ensure_data_dir(&node_config.data_dir)?;

    if !node_config.is_initialized() {
        tracing::info!("no genesis bundle found, bootstrapping a default one");
        genesis::write_bundle(
            &node_config.params_dir(),
            genesis::GENESIS_HEIGHT,
            &genesis::default_genesis_bundle(),
        )?;
    }

    let bundle = genesis::load_genesis_bundle(&node_config.params_dir())?;
    let genesis_block = genesis::genesis_block(&bundle);
    let genesis_hash = genesis_block.hash();

    let mut store = RocksDbBlockStore::open(&node_config.storage())?;
    if store.tip().is_none() {
        store.put_block(genesis_block);
        store.set_tip(genesis_hash);
    }

    let validator = CombinedValidator::new(StructuralValidator, ReceiptConsistencyValidator);
    let oracle = Box::new(NativeOracle::new());

    let mut engine = ConsensusEngine::new(
        node_config.engine.clone(),
        store,
        validator,
        oracle,
        bundle.clone(),
        genesis_hash,
        genesis::GENESIS_HEIGHT,
    );

    for (height, scheduled) in genesis::load_all_bundles(&node_config.params_dir())? {
        if height != genesis::GENESIS_HEIGHT {
            engine.schedule_bundle(height, scheduled)?;
        }
    }

    let pool = producer::empty_pool(node_config.mempool_config(&bundle));

    let miner = MinerId(animica_consensus::Hash256::compute(b"animica/local-node-miner/v1"));

    pidfile::write(&node_config.pid_file())?;

    let pid_file_for_signal = node_config.pid_file();
    let data_dir_note = node_config.data_dir.clone();
    tracing::info!(?data_dir_note, "node starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| NodeError::Config(format!("failed to start async runtime: {e}")))?;

    runtime.block_on(async move {
        let metrics = Arc::new(MetricsRegistry::new().map_err(|e| {
            NodeError::Config(format!("failed to initialize metrics registry: {e}"))
        })?);

        if node_config.metrics_enabled {
            let metrics_http = metrics.clone();
            let addr = node_config.metrics_addr;
            tokio::spawn(async move {
                if let Err(e) = run_prometheus_http_server(metrics_http, addr).await {
                    tracing::warn!(error = %e, "metrics HTTP server exited");
                }
            });
            tracing::info!(%addr, "metrics exporter listening");
        }

        let block_time_secs = node_config.engine.block_time_secs;
        let producer_task = tokio::spawn(producer::run_loop(
            engine,
            pool,
            miner,
            block_time_secs,
            metrics,
        ));

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .map_err(NodeError::Io)?;
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, shutting down");
                }
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.map_err(NodeError::Io)?;
            tracing::info!("received ctrl-c, shutting down");
        }

        producer_task.abort();
        Ok::<(), NodeError>(())
    })?;

    pidfile::remove(&pid_file_for_signal);
    Ok(())
}

fn run_stop(node_config: NodeConfig) -> Result<(), NodeError> {
    pidfile::stop(&node_config.pid_file())?;
    tracing::info!("stop signal sent");
    Ok(())
}

fn run_reset(node_config: NodeConfig, confirmed: bool) -> Result<(), NodeError> {
    if !confirmed {
        return Err(NodeError::Config(
            "refusing to reset without --yes".to_string(),
        ));
    }
    if node_config.data_dir.exists() {
        std::fs::remove_dir_all(&node_config.data_dir)?;
    }
    config::ensure_data_dir(&node_config.data_dir)?;
    genesis::write_bundle(
        &node_config.params_dir(),
        genesis::GENESIS_HEIGHT,
        &genesis::default_genesis_bundle(),
    )?;
    tracing::info!(data_dir = %node_config.data_dir.display(), "data directory reset");
    Ok(())
}

fn run_show_head(node_config: NodeConfig) -> Result<(), NodeError> {
    if !node_config.is_initialized() {
        return Err(NodeError::Uninitialized);
    }
    let store = RocksDbBlockStore::open(&node_config.storage())?;
    match store.tip() {
        Some(hash) => {
            let block = store.try_get_block(&hash)?.ok_or_else(|| {
                NodeError::MalformedSnapshot("tip hash has no matching block record".to_string())
            })?;
            println!("height={} hash={}", block.header.height, hash);
        }
        None => println!("(no head; chain not yet bootstrapped)"),
    }
    Ok(())
}

fn run_show_params(node_config: NodeConfig) -> Result<(), NodeError> {
    if !node_config.is_initialized() {
        return Err(NodeError::Uninitialized);
    }
    let bundles = genesis::load_all_bundles(&node_config.params_dir())?;
    for (height, bundle) in bundles {
        let json = serde_json::to_string_pretty(&bundle)
            .map_err(|e| NodeError::Config(format!("failed to encode bundle: {e}")))?;
        println!("# activation_height={height} policy_root={:?}", bundle.policy_root());
        println!("{json}");
    }
    Ok(())
}

fn run_export_snapshot(node_config: NodeConfig, out: &PathBuf) -> Result<(), NodeError> {
    if !node_config.is_initialized() {
        return Err(NodeError::Uninitialized);
    }
    let store = RocksDbBlockStore::open(&node_config.storage())?;
    let count = snapshot::export(&store, out)?;
    println!("exported {count} blocks to {}", out.display());
    Ok(())
}

fn run_verify_snapshot(path: &PathBuf) -> Result<(), NodeError> {
    let count = snapshot::verify(path)?;
    println!("snapshot at {} is structurally sound ({count} blocks)", path.display());
    Ok(())
}
