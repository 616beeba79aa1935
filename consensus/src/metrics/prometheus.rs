//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed consensus metrics, and an
//! async HTTP exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Consensus-related Prometheus metrics.
///
/// These are registered into a [`Registry`] and can be updated from
/// engine, mempool, and data-availability code.
#[derive(Clone)]
pub struct ConsensusMetrics {
    /// Latency of full block validation, in seconds.
    pub block_validation_seconds: Histogram,
    /// The PoIES score `S` of the most recently accepted block.
    pub last_block_score: IntGauge,
    /// The current acceptance threshold `Θ`.
    pub current_theta: IntGauge,
    /// Number of blocks accepted, by outcome (`accepted`, `rejected`).
    pub blocks_processed_total: IntCounterVec,
    /// Number of chain reorganizations observed.
    pub reorgs_total: IntCounter,
    /// Depth (number of blocks rewound) of the most recent reorg.
    pub last_reorg_depth: IntGauge,
    /// Current number of live entries in the nullifier index.
    pub nullifier_index_size: IntGauge,
    /// Current number of transactions sitting in the mempool.
    pub mempool_size: IntGauge,
    /// Transactions admitted to, or rejected from, the mempool, by outcome.
    pub mempool_admission_total: IntCounterVec,
    /// Transactions evicted from the mempool to make room for higher-fee
    /// entries.
    pub mempool_evictions_total: IntCounter,
    /// Current EMA-based minimum fee rate the mempool is enforcing.
    pub mempool_min_fee_rate: Gauge,
    /// Light-client data-availability samples, by outcome (`available`,
    /// `unavailable`).
    pub da_samples_total: IntCounterVec,
}

impl ConsensusMetrics {
    /// Registers consensus metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let block_validation_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consensus_block_validation_seconds",
                "Time to validate a block in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(block_validation_seconds.clone()))?;

        let last_block_score = IntGauge::with_opts(Opts::new(
            "consensus_last_block_score",
            "PoIES score S of the most recently accepted block, in micro-nats",
        ))?;
        registry.register(Box::new(last_block_score.clone()))?;

        let current_theta = IntGauge::with_opts(Opts::new(
            "consensus_current_theta",
            "Current PoIES acceptance threshold Theta, in micro-nats",
        ))?;
        registry.register(Box::new(current_theta.clone()))?;

        let blocks_processed_total = IntCounterVec::new(
            Opts::new(
                "consensus_blocks_processed_total",
                "Total number of blocks processed by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(blocks_processed_total.clone()))?;

        let reorgs_total = IntCounter::with_opts(Opts::new(
            "consensus_reorgs_total",
            "Total number of chain reorganizations observed",
        ))?;
        registry.register(Box::new(reorgs_total.clone()))?;

        let last_reorg_depth = IntGauge::with_opts(Opts::new(
            "consensus_last_reorg_depth",
            "Depth, in blocks, of the most recent reorganization",
        ))?;
        registry.register(Box::new(last_reorg_depth.clone()))?;

        let nullifier_index_size = IntGauge::with_opts(Opts::new(
            "consensus_nullifier_index_size",
            "Current number of live entries in the nullifier index",
        ))?;
        registry.register(Box::new(nullifier_index_size.clone()))?;

        let mempool_size = IntGauge::with_opts(Opts::new(
            "consensus_mempool_size",
            "Current number of transactions held in the mempool",
        ))?;
        registry.register(Box::new(mempool_size.clone()))?;

        let mempool_admission_total = IntCounterVec::new(
            Opts::new(
                "consensus_mempool_admission_total",
                "Total mempool admission attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(mempool_admission_total.clone()))?;

        let mempool_evictions_total = IntCounter::with_opts(Opts::new(
            "consensus_mempool_evictions_total",
            "Total number of transactions evicted from the mempool",
        ))?;
        registry.register(Box::new(mempool_evictions_total.clone()))?;

        let mempool_min_fee_rate = Gauge::with_opts(Opts::new(
            "consensus_mempool_min_fee_rate",
            "Current EMA-based minimum fee rate enforced by the mempool",
        ))?;
        registry.register(Box::new(mempool_min_fee_rate.clone()))?;

        let da_samples_total = IntCounterVec::new(
            Opts::new(
                "consensus_da_samples_total",
                "Total light-client data-availability samples by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(da_samples_total.clone()))?;

        Ok(Self {
            block_validation_seconds,
            last_block_score,
            current_theta,
            blocks_processed_total,
            reorgs_total,
            last_reorg_depth,
            nullifier_index_size,
            mempool_size,
            mempool_admission_total,
            mempool_evictions_total,
            mempool_min_fee_rate,
            da_samples_total,
        })
    }
}

/// Wrapper around a Prometheus registry and the consensus metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub consensus: ConsensusMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the consensus metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("animica".to_string()), None)?;
        let consensus = ConsensusMetrics::register(&registry)?;
        Ok(Self {
            registry,
            consensus,
        })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics HTTP server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!(error = %err, "metrics HTTP connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn consensus_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = ConsensusMetrics::register(&registry).expect("register metrics");

        metrics.block_validation_seconds.observe(0.123);
        metrics.last_block_score.set(12_345);
        metrics.current_theta.set(10_000);
        metrics
            .blocks_processed_total
            .with_label_values(&["accepted"])
            .inc();
        metrics.reorgs_total.inc();
        metrics.nullifier_index_size.set(42);
        metrics.mempool_size.set(7);
        metrics
            .mempool_admission_total
            .with_label_values(&["rejected"])
            .inc();
        metrics.mempool_evictions_total.inc();
        metrics.mempool_min_fee_rate.set(1.5);
        metrics
            .da_samples_total
            .with_label_values(&["available"])
            .inc();

        let metric_families = registry.gather();
        assert!(!metric_families.is_empty());
    }

    #[test]
    fn metrics_registry_gather_text_works() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.consensus.block_validation_seconds.observe(0.01);
        let text = registry.gather_text();
        assert!(text.contains("animica_consensus_block_validation_seconds"));
    }
}
