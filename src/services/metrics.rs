use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::models::UsageAction;

/// Service-local Prometheus registry. Holding the registry here instead of
/// installing a global recorder lets tests build as many apps per process
/// as they like.
pub struct MetricsService {
    registry: Registry,
    usage_increments: IntCounterVec,
    stats_reads: IntCounter,
    errors: IntCounterVec,
    http_requests: IntCounterVec,
    http_request_duration: HistogramVec,
}

impl MetricsService {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let usage_increments = IntCounterVec::new(
            Opts::new(
                "usage_increments_total",
                "Usage counter increments by action",
            ),
            &["action"],
        )?;
        registry.register(Box::new(usage_increments.clone()))?;

        let stats_reads = IntCounter::new("stats_reads_total", "Usage statistics reads")?;
        registry.register(Box::new(stats_reads.clone()))?;

        let errors = IntCounterVec::new(Opts::new("errors_total", "Errors by type"), &["type"])?;
        registry.register(Box::new(errors.clone()))?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests by route and status"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency"),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            registry,
            usage_increments,
            stats_reads,
            errors,
            http_requests,
            http_request_duration,
        })
    }

    pub fn record_increment(&self, action: UsageAction) {
        self.usage_increments
            .with_label_values(&[action.as_str()])
            .inc();
    }

    pub fn record_stats_read(&self) {
        self.stats_reads.inc();
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors.with_label_values(&[error_type]).inc();
    }

    pub fn record_request(&self, method: &str, path: &str, status: u16, elapsed: std::time::Duration) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[method, path, &status])
            .inc();
        self.http_request_duration
            .with_label_values(&[method, path])
            .observe(elapsed.as_secs_f64());
    }

    /// Prometheus text exposition of everything in the registry.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_increments_show_up_in_the_exposition() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_increment(UsageAction::ChatQuery);
        metrics.record_increment(UsageAction::ChatQuery);
        metrics.record_increment(UsageAction::SecFiling);

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("usage_increments_total{action=\"chat_query\"} 2"));
        assert!(rendered.contains("usage_increments_total{action=\"sec_filing\"} 1"));
    }

    #[test]
    fn request_metrics_carry_route_labels() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_request(
            "GET",
            "/api/v1/users/:user_id/usage",
            200,
            std::time::Duration::from_millis(3),
        );

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("/api/v1/users/:user_id/usage"));
    }
}
