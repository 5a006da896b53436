//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the dispatcher and launcher report.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    files_detected_total: IntCounter,
    files_quarantined_total: IntCounter,
    pairs_deferred_total: IntCounter,
    runs_dispatched_total: IntCounterVec,
    ingest_failures_total: IntCounterVec,
    launches_total: IntCounterVec,
    last_tick_new_files: IntGauge,
    runs_dispatched_sum: AtomicU64,
    ingest_failures_sum: AtomicU64,
}

/// Snapshot of selected gauges and counters for summaries and tests.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Files seen as new across all ticks.
    pub files_detected_total: u64,
    /// Files moved to the error area.
    pub files_quarantined_total: u64,
    /// Pair halves deferred to a later tick.
    pub pairs_deferred_total: u64,
    /// Runs handed to the launcher, across all prefixes.
    pub runs_dispatched_total: u64,
    /// Per-file or per-run failures, across all kinds.
    pub ingest_failures_total: u64,
    /// New files observed by the most recent tick.
    pub last_tick_new_files: i64,
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let files_detected_total = counter(
            "seqwatch_files_detected_total",
            "Files newly present in the watched directory",
        )?;
        let files_quarantined_total = counter(
            "seqwatch_files_quarantined_total",
            "Unclassifiable files moved to the error area",
        )?;
        let pairs_deferred_total = counter(
            "seqwatch_pairs_deferred_total",
            "Paired-read halves deferred until their partner arrives",
        )?;
        let runs_dispatched_total = counter_vec(
            "seqwatch_runs_dispatched_total",
            "Runs handed to the launcher by pipeline prefix",
            &["prefix"],
        )?;
        let ingest_failures_total = counter_vec(
            "seqwatch_ingest_failures_total",
            "Per-file and per-run failures by kind",
            &["kind"],
        )?;
        let launches_total = counter_vec(
            "seqwatch_launches_total",
            "Processes launched by kind",
            &["kind"],
        )?;
        let last_tick_new_files = IntGauge::with_opts(Opts::new(
            "seqwatch_last_tick_new_files",
            "New files observed by the most recent tick",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "seqwatch_last_tick_new_files",
            source,
        })?;

        register(&registry, "seqwatch_files_detected_total", &files_detected_total)?;
        register(
            &registry,
            "seqwatch_files_quarantined_total",
            &files_quarantined_total,
        )?;
        register(&registry, "seqwatch_pairs_deferred_total", &pairs_deferred_total)?;
        register(&registry, "seqwatch_runs_dispatched_total", &runs_dispatched_total)?;
        register(&registry, "seqwatch_ingest_failures_total", &ingest_failures_total)?;
        register(&registry, "seqwatch_launches_total", &launches_total)?;
        register(&registry, "seqwatch_last_tick_new_files", &last_tick_new_files)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                files_detected_total,
                files_quarantined_total,
                pairs_deferred_total,
                runs_dispatched_total,
                ingest_failures_total,
                launches_total,
                last_tick_new_files,
                runs_dispatched_sum: AtomicU64::new(0),
                ingest_failures_sum: AtomicU64::new(0),
            }),
        })
    }

    /// Record the number of new files seen by a tick.
    pub fn observe_tick(&self, new_files: usize) {
        let count = i64::try_from(new_files).unwrap_or(i64::MAX);
        self.inner.last_tick_new_files.set(count);
        self.inner
            .files_detected_total
            .inc_by(u64::try_from(new_files).unwrap_or(u64::MAX));
    }

    /// Increment the quarantine counter.
    pub fn inc_quarantined(&self) {
        self.inner.files_quarantined_total.inc();
    }

    /// Increment the deferred pair counter.
    pub fn inc_pair_deferred(&self) {
        self.inner.pairs_deferred_total.inc();
    }

    /// Increment the dispatched run counter for a pipeline prefix (`unknown` when none matched).
    pub fn inc_run_dispatched(&self, prefix: &str) {
        self.inner
            .runs_dispatched_total
            .with_label_values(&[prefix])
            .inc();
        self.inner.runs_dispatched_sum.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the failure counter for a failure kind.
    pub fn inc_ingest_failure(&self, kind: &str) {
        self.inner
            .ingest_failures_total
            .with_label_values(&[kind])
            .inc();
        self.inner.ingest_failures_sum.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the launch counter (`pipeline`, `diagnostic`, `placeholder`).
    pub fn inc_launch(&self, kind: &str) {
        self.inner.launches_total.with_label_values(&[kind]).inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Rewrite `path` with the current exposition, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the file cannot be written.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        let staging = path.with_extension("prom.tmp");
        fs::write(&staging, rendered).map_err(|source| TelemetryError::MetricsWrite {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, path).map_err(|source| TelemetryError::MetricsWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_detected_total: self.inner.files_detected_total.get(),
            files_quarantined_total: self.inner.files_quarantined_total.get(),
            pairs_deferred_total: self.inner.pairs_deferred_total.get(),
            runs_dispatched_total: self.inner.runs_dispatched_sum.load(Ordering::Relaxed),
            ingest_failures_total: self.inner.ingest_failures_sum.load(Ordering::Relaxed),
            last_tick_new_files: self.inner.last_tick_new_files.get(),
        }
    }
}
