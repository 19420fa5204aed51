use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder, opts};

/// Prometheus metrics registry for the filtering proxy. Deliberately small:
/// the hot path only needs enough observability to notice a degraded
/// Resolver or a stuck Classifier, not a full dashboard.
pub struct FirewallMetrics {
    registry: Registry,

    pub queries_allowed: IntCounter,
    pub queries_blocked: IntCounter,
    pub queries_reviewed: IntCounter,
    pub queries_parse_failed: IntCounter,
    pub upstream_failures: IntCounter,
    pub log_append_failures: IntCounter,
    pub classification_queue_full: IntCounter,
    pub classification_queue_depth: IntGauge,
    pub classifications_completed: IntCounter,
}

impl FirewallMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let queries_allowed = IntCounter::with_opts(opts!(
            "firewall_queries_allowed_total",
            "Queries forwarded upstream as allowed"
        ))?;
        let queries_blocked = IntCounter::with_opts(opts!(
            "firewall_queries_blocked_total",
            "Queries answered locally as blocked"
        ))?;
        let queries_reviewed = IntCounter::with_opts(opts!(
            "firewall_queries_reviewed_total",
            "Queries forwarded upstream pending classification"
        ))?;
        let queries_parse_failed = IntCounter::with_opts(opts!(
            "firewall_queries_parse_failed_total",
            "Queries dropped for failing to parse"
        ))?;
        let upstream_failures = IntCounter::with_opts(opts!(
            "firewall_upstream_failures_total",
            "Upstream forward failures (timeout or socket error)"
        ))?;
        let log_append_failures = IntCounter::with_opts(opts!(
            "firewall_log_append_failures_total",
            "DomainLog append failures"
        ))?;
        let classification_queue_full = IntCounter::with_opts(opts!(
            "firewall_classification_queue_full_total",
            "Domains dropped because the classification queue was full"
        ))?;
        let classification_queue_depth = IntGauge::with_opts(opts!(
            "firewall_classification_queue_depth",
            "Domains currently queued or in flight for classification"
        ))?;
        let classifications_completed = IntCounter::with_opts(opts!(
            "firewall_classifications_completed_total",
            "Classifier runs that completed (with or without writing an entry)"
        ))?;

        registry.register(Box::new(queries_allowed.clone()))?;
        registry.register(Box::new(queries_blocked.clone()))?;
        registry.register(Box::new(queries_reviewed.clone()))?;
        registry.register(Box::new(queries_parse_failed.clone()))?;
        registry.register(Box::new(upstream_failures.clone()))?;
        registry.register(Box::new(log_append_failures.clone()))?;
        registry.register(Box::new(classification_queue_full.clone()))?;
        registry.register(Box::new(classification_queue_depth.clone()))?;
        registry.register(Box::new(classifications_completed.clone()))?;

        Ok(Self {
            registry,
            queries_allowed,
            queries_blocked,
            queries_reviewed,
            queries_parse_failed,
            upstream_failures,
            log_append_failures,
            classification_queue_full,
            classification_queue_depth,
            classifications_completed,
        })
    }

    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        if encoder.encode(&metric_families, &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
