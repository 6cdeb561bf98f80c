use crate::metrics::MetricsCollector;
use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::{Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Renders collected counters in the Prometheus text format and serves
/// them for scraping on a dedicated plain-HTTP port.
pub struct MetricsExporter {
    collector: Arc<MetricsCollector>,
}

impl MetricsExporter {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub fn export_metrics(&self) -> Response<Full<Bytes>> {
        let snapshot = self.collector.snapshot();
        let mut output = String::new();

        output.push_str("# HELP http_requests_total Total HTTP Requests\n");
        output.push_str("# TYPE http_requests_total counter\n");
        for ((method, endpoint), count) in &snapshot.requests {
            output.push_str(&format!(
                "http_requests_total{{method=\"{}\",endpoint=\"{}\"}} {}\n",
                method, endpoint, count
            ));
        }
        output.push('\n');

        output.push_str("# HELP http_request_latency_seconds HTTP Request Latency\n");
        output.push_str("# TYPE http_request_latency_seconds counter\n");
        for ((method, endpoint), total_ms) in &snapshot.latency_ms {
            output.push_str(&format!(
                "http_request_latency_seconds{{method=\"{}\",endpoint=\"{}\"}} {:.3}\n",
                method,
                endpoint,
                *total_ms as f64 / 1000.0
            ));
        }
        output.push('\n');

        output.push_str("# HELP omniserve_requests_by_status_total Total requests by HTTP status code\n");
        output.push_str("# TYPE omniserve_requests_by_status_total counter\n");
        for (status, count) in &snapshot.status_codes {
            output.push_str(&format!(
                "omniserve_requests_by_status_total{{status=\"{}\"}} {}\n",
                status, count
            ));
        }
        output.push('\n');

        output.push_str("# HELP omniserve_active_connections Currently active connections\n");
        output.push_str("# TYPE omniserve_active_connections gauge\n");
        output.push_str(&format!(
            "omniserve_active_connections {}\n",
            snapshot.active_connections
        ));
        output.push('\n');

        output.push_str("# HELP omniserve_requests_in_flight Requests currently being processed\n");
        output.push_str("# TYPE omniserve_requests_in_flight gauge\n");
        output.push_str(&format!(
            "omniserve_requests_in_flight {}\n",
            snapshot.requests_in_flight
        ));
        output.push('\n');

        output.push_str("# HELP omniserve_build_info Build information\n");
        output.push_str("# TYPE omniserve_build_info gauge\n");
        output.push_str(&format!(
            "omniserve_build_info{{version=\"{}\"}} 1\n",
            env!("CARGO_PKG_VERSION")
        ));

        Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
            .header("cache-control", "no-cache")
            .body(Full::new(Bytes::from(output)))
            .expect("Failed to build metrics response")
    }

    pub fn health_check(&self) -> Response<Full<Bytes>> {
        let health_status = serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "active_connections": self.collector.active_connections(),
        });

        Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .header("cache-control", "no-cache")
            .body(Full::new(Bytes::from(health_status.to_string())))
            .expect("Failed to build health response")
    }

    fn route(&self, path: &str) -> Response<Full<Bytes>> {
        match path {
            "/metrics" => self.export_metrics(),
            "/health" => self.health_check(),
            _ => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Full::new(Bytes::new()))
                .expect("Failed to build metrics 404"),
        }
    }

    /// Accept loop for the scrape listener. Runs until the process
    /// shuts down.
    pub async fn serve(self: Arc<Self>, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind metrics listener to {}", addr))?;
        info!("Metrics exporter listening on {}", addr);

        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept metrics connection: {}", e);
                    continue;
                }
            };

            let exporter = self.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = hyper::service::service_fn(move |req| {
                    let exporter = exporter.clone();
                    async move {
                        Ok::<_, hyper::Error>(exporter.route(req.uri().path()))
                    }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Metrics connection error: {}", e);
                }
            });
        }
    }
}
