/// Metrics for the auction engine.
#[derive(Debug, Clone, prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Auctions solved per payment rule.
    #[metric(labels("rule"))]
    pub solves: prometheus::IntCounterVec,

    /// How payment computations ended.
    #[metric(labels("rule", "resolution"))]
    pub resolutions: prometheus::IntCounterVec,

    /// Constraint generation iterations per core-selecting solve.
    #[metric(buckets(1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144))]
    pub core_iterations: prometheus::Histogram,

    /// Programs handed to the optimizer.
    pub optimizer_calls: prometheus::IntCounter,
}

/// Prefixes all metrics with `mechanism_` unless a registry is already
/// installed.
pub fn init() {
    if !observe::metrics::setup_registry("mechanism") {
        tracing::debug!("metrics registry already installed");
    }
}

/// Get the metrics instance.
pub fn get() -> &'static Metrics {
    Metrics::instance(observe::metrics::storage())
        .expect("unexpected error getting metrics instance")
}
