use crate::config::Config;
use crate::metrics::exporter::MetricsExporter;
use crate::metrics::MetricsCollector;
use crate::server::request_handler::RequestHandler;
use crate::server::tls::TlsManager;
use anyhow::{Context, Result};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use signal_hook::consts::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook_tokio::Signals;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

/// Concurrent listener: accepts connections and hands each one to an
/// independent worker task. Workers share only the immutable
/// configuration and collaborator handles.
pub struct HttpServer {
    config: Arc<Config>,
    handler: Arc<RequestHandler>,
    tls_manager: TlsManager,
}

impl HttpServer {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let handler = Arc::new(RequestHandler::new(config.clone())?);
        let tls_manager = TlsManager::new(
            config.ssl_certfile.as_deref(),
            config.ssl_keyfile.as_deref(),
        )?;

        Ok(Self {
            config,
            handler,
            tls_manager,
        })
    }

    pub async fn run(self) -> Result<()> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        let scheme = if self.config.tls_enabled() {
            "https"
        } else {
            "http"
        };
        info!("Listening on {}://{}", scheme, addr);
        info!("Serving files from {}", self.config.directory.display());

        let metrics = self.handler.metrics();

        let exporter = Arc::new(MetricsExporter::new(metrics.clone()));
        let metrics_addr = self.config.metrics_addr();
        tokio::spawn(async move {
            if let Err(e) = exporter.serve(metrics_addr).await {
                error!("Metrics exporter failed: {}", e);
            }
        });

        let mut accept_task = tokio::spawn(Self::serve_listener(
            listener,
            self.handler.clone(),
            self.tls_manager.clone(),
            metrics.clone(),
        ));

        tokio::select! {
            result = &mut accept_task => {
                match result {
                    Ok(Err(e)) => error!("Listener failed: {}", e),
                    Err(e) => error!("Listener task failed: {}", e),
                    Ok(Ok(())) => {}
                }
            }
            _ = Self::wait_for_signal() => {
                info!("Received shutdown signal, stopping listener");
                accept_task.abort();
            }
        }

        Self::drain(&metrics).await;
        info!("Server stopped");
        Ok(())
    }

    /// In-flight requests finish before the process exits; only the
    /// accept loop is stopped by a shutdown signal. Idle keep-alive
    /// connections are not waited on.
    async fn drain(metrics: &Arc<MetricsCollector>) {
        let in_flight = metrics.requests_in_flight();
        if in_flight == 0 {
            return;
        }

        info!("Draining {} in-flight request(s)", in_flight);
        while metrics.requests_in_flight() > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    async fn serve_listener(
        listener: TcpListener,
        handler: Arc<RequestHandler>,
        tls_manager: TlsManager,
        metrics: Arc<MetricsCollector>,
    ) -> Result<()> {
        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let handler = handler.clone();
            let tls_manager = tls_manager.clone();
            let metrics = metrics.clone();

            tokio::spawn(async move {
                metrics.increment_active_connections();
                if let Err(e) = Self::handle_connection(stream, addr, handler, tls_manager).await {
                    error!("Connection error from {}: {}", addr, e);
                }
                metrics.decrement_active_connections();
            });
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        addr: std::net::SocketAddr,
        handler: Arc<RequestHandler>,
        tls_manager: TlsManager,
    ) -> Result<()> {
        if let Some(acceptor) = tls_manager.get_acceptor() {
            let tls_stream = acceptor
                .accept(stream)
                .await
                .map_err(|e| anyhow::anyhow!("TLS handshake failed: {}", e))?;

            let io = TokioIo::new(tls_stream);
            let service = hyper::service::service_fn(move |req| {
                let handler = handler.clone();
                async move { handler.handle_request(req, addr).await }
            });

            http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service)
                .await
                .map_err(|e| anyhow::anyhow!("HTTPS connection error: {}", e))?;
        } else {
            let io = TokioIo::new(stream);
            let service = hyper::service::service_fn(move |req| {
                let handler = handler.clone();
                async move { handler.handle_request(req, addr).await }
            });

            http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service)
                .await
                .map_err(|e| anyhow::anyhow!("HTTP connection error: {}", e))?;
        }

        Ok(())
    }

    async fn wait_for_signal() {
        #[cfg(unix)]
        {
            use futures::stream::StreamExt;
            let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT])
                .expect("Failed to register signal handlers");

            while let Some(signal) = signals.next().await {
                match signal {
                    SIGTERM | SIGINT | SIGQUIT => {
                        info!("Received signal {}, initiating graceful shutdown", signal);
                        break;
                    }
                    _ => {}
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c");
            info!("Received Ctrl-C, initiating graceful shutdown");
        }
    }
}
