//! Prometheus metrics for indexing runs, lyric lookups and searches.
//!
//! Collectors live in a dedicated registry that `init_metrics` populates once at
//! startup; `/metrics` renders it with `gather_metrics`.

use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

const NAMESPACE: &str = "versefind";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Indexing runs started
    pub static ref RUNS_STARTED_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("runs_started_total", "Total number of indexing runs started")
            .namespace(NAMESPACE)
    ).expect("Failed to create RUNS_STARTED_TOTAL metric");

    /// Indexing runs currently in flight
    pub static ref RUNS_ACTIVE: IntGauge = IntGauge::with_opts(
        Opts::new("runs_active", "Number of indexing runs in flight")
            .namespace(NAMESPACE)
    ).expect("Failed to create RUNS_ACTIVE metric");

    /// Run outcomes
    ///
    /// Labels: outcome (completed, halted, failed)
    pub static ref RUNS_FINISHED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("runs_finished_total", "Total number of indexing runs finished")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create RUNS_FINISHED_TOTAL metric");

    /// Wall time of a full run including the final handshake
    pub static ref RUN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("run_duration_seconds", "Indexing run duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
    ).expect("Failed to create RUN_DURATION_SECONDS metric");

    /// Per-track indexing outcomes
    ///
    /// Labels: outcome (indexed, already_present, skipped)
    pub static ref TRACKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tracks_total", "Tracks processed by indexing runs")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create TRACKS_TOTAL metric");

    /// Lyric source lookups
    ///
    /// Labels: source, outcome (found, not_found, error, timeout)
    pub static ref LYRIC_LOOKUPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lyric_lookups_total", "Lyric source lookups")
            .namespace(NAMESPACE),
        &["source", "outcome"]
    ).expect("Failed to create LYRIC_LOOKUPS_TOTAL metric");

    /// Searches served
    ///
    /// Labels: outcome (hit, short_circuit, error)
    pub static ref SEARCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("searches_total", "Search requests served")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create SEARCHES_TOTAL metric");

    /// Live sessions in the registry
    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::with_opts(
        Opts::new("sessions_active", "Number of registered sessions")
            .namespace(NAMESPACE)
    ).expect("Failed to create SESSIONS_ACTIVE metric");
}

/// Register all collectors with the global registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(RUNS_STARTED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(RUNS_ACTIVE.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(RUNS_FINISHED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(RUN_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(TRACKS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(LYRIC_LOOKUPS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCHES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SESSIONS_ACTIVE.clone()))?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Record a lyric lookup result
pub fn record_lyric_lookup(source: &str, outcome: &str) {
    LYRIC_LOOKUPS_TOTAL.with_label_values(&[source, outcome]).inc();
}

/// Record a processed track
pub fn record_track(outcome: &str) {
    TRACKS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a served search
pub fn record_search(outcome: &str) {
    SEARCHES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
