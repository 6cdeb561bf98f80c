pub mod exporter;

use dashmap::DashMap;
use hyper::{Method, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Logical endpoint label for a request, since dispatch branches on
/// method rather than URL pattern.
pub fn endpoint_label(method: &Method) -> &'static str {
    match *method {
        Method::GET | Method::HEAD => "files",
        Method::POST | Method::PUT | Method::PATCH => "upload",
        Method::DELETE => "delete",
        Method::OPTIONS => "preflight",
        _ => "other",
    }
}

#[derive(Debug, Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub requests_in_flight: AtomicU64,
    pub active_connections: AtomicU64,
    pub requests: DashMap<(String, &'static str), AtomicU64>,
    pub latency_ms: DashMap<(String, &'static str), AtomicU64>,
    pub status_codes: DashMap<u16, AtomicU64>,
}

/// Shared counter sink. Samples transfer ownership on emit; nothing is
/// retained by the request path.
pub struct MetricsCollector {
    metrics: Arc<Metrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Metrics::default()),
        }
    }

    pub fn record_request(&self, method: &Method, status: StatusCode, duration: Duration) {
        let key = (method.to_string(), endpoint_label(method));

        self.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

        self.metrics
            .requests
            .entry(key.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);

        self.metrics
            .latency_ms
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);

        self.metrics
            .status_codes
            .entry(status.as_u16())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_in_flight(&self) {
        self.metrics
            .requests_in_flight
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_in_flight(&self) {
        self.metrics
            .requests_in_flight
            .fetch_sub(1, Ordering::Relaxed);
    }

    pub fn requests_in_flight(&self) -> u64 {
        self.metrics.requests_in_flight.load(Ordering::Relaxed)
    }

    pub fn increment_active_connections(&self) {
        self.metrics
            .active_connections
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        self.metrics
            .active_connections
            .fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u64 {
        self.metrics.active_connections.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.metrics.requests_total.load(Ordering::Relaxed),
            requests_in_flight: self.metrics.requests_in_flight.load(Ordering::Relaxed),
            active_connections: self.metrics.active_connections.load(Ordering::Relaxed),
            requests: self
                .metrics
                .requests
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
            latency_ms: self
                .metrics
                .latency_ms
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
            status_codes: self
                .metrics
                .status_codes
                .iter()
                .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_in_flight: u64,
    pub active_connections: u64,
    pub requests: std::collections::HashMap<(String, &'static str), u64>,
    pub latency_ms: std::collections::HashMap<(String, &'static str), u64>,
    pub status_codes: std::collections::HashMap<u16, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_labels() {
        assert_eq!(endpoint_label(&Method::GET), "files");
        assert_eq!(endpoint_label(&Method::HEAD), "files");
        assert_eq!(endpoint_label(&Method::POST), "upload");
        assert_eq!(endpoint_label(&Method::PATCH), "upload");
        assert_eq!(endpoint_label(&Method::DELETE), "delete");
        assert_eq!(endpoint_label(&Method::OPTIONS), "preflight");
    }

    #[test]
    fn test_record_request_keys_by_method_and_endpoint() {
        let collector = MetricsCollector::new();
        collector.record_request(&Method::GET, StatusCode::OK, Duration::from_millis(5));
        collector.record_request(&Method::GET, StatusCode::NOT_FOUND, Duration::from_millis(3));
        collector.record_request(&Method::POST, StatusCode::OK, Duration::from_millis(7));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.requests_total, 3);
        assert_eq!(snapshot.requests[&("GET".to_string(), "files")], 2);
        assert_eq!(snapshot.requests[&("POST".to_string(), "upload")], 1);
        assert_eq!(snapshot.latency_ms[&("GET".to_string(), "files")], 8);
        assert_eq!(snapshot.status_codes[&200], 2);
        assert_eq!(snapshot.status_codes[&404], 1);
    }

    #[test]
    fn test_active_connection_gauge() {
        let collector = MetricsCollector::new();
        collector.increment_active_connections();
        collector.increment_active_connections();
        collector.decrement_active_connections();
        assert_eq!(collector.active_connections(), 1);
    }
}
