use crate::cache::LookupCache;
use crate::config::Config;
use crate::metrics::MetricsCollector;
use crate::server::middleware::{Flow, MiddlewareChain};
use crate::server::response::{apply_cors, ApiResponse};
use crate::server::static_files::StaticFileHandler;
use crate::store::RecordStore;
use anyhow::Result;
use bytes::Bytes;
use http::request::Parts;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Per-request entry point shared by every connection worker. Holds only
/// immutable configuration and collaborator handles; all per-request
/// state lives on the worker's stack.
pub struct RequestHandler {
    config: Arc<Config>,
    chain: MiddlewareChain,
    static_handler: StaticFileHandler,
    cache: Arc<LookupCache>,
    metrics: Arc<MetricsCollector>,
}

impl RequestHandler {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let store = Arc::new(RecordStore::open(&config.database)?);
        let cache = Arc::new(LookupCache::new());
        let metrics = Arc::new(MetricsCollector::new());

        Ok(Self {
            chain: MiddlewareChain::new(config.clone(), store),
            static_handler: StaticFileHandler::new(config.clone(), cache.clone()),
            cache,
            metrics,
            config,
        })
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// The single request-handling boundary: every failure escaping a
    /// handler is translated to a 500 here, nothing propagates to crash
    /// a worker or the listener.
    pub async fn handle_request<B>(
        &self,
        req: Request<B>,
        client_addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, hyper::Error>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let request_id = Uuid::new_v4();
        let start_time = std::time::Instant::now();
        self.metrics.increment_in_flight();

        let (parts, body) = req.into_parts();
        let method = parts.method.clone();

        let result = self.process_request(&parts, body).await;

        let duration = start_time.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    error = %e,
                    "Request processing failed"
                );
                ApiResponse::internal_error(&e.to_string()).build()
            }
        };

        let response = if self.config.enable_cors {
            apply_cors(response)
        } else {
            response
        };

        self.metrics
            .record_request(&method, response.status(), duration);
        self.metrics.decrement_in_flight();

        tracing::info!(
            request_id = %request_id,
            client = %client_addr,
            status = %response.status(),
            duration_ms = duration.as_millis(),
            "Request completed"
        );

        Ok(response)
    }

    async fn process_request<B>(&self, parts: &Parts, body: B) -> Result<Response<Full<Bytes>>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        if let Flow::Respond(response) = self.chain.run(parts).await {
            return Ok(response);
        }

        match parts.method {
            Method::OPTIONS => Ok(ApiResponse::no_content().build()),
            Method::GET | Method::HEAD => self.handle_get(parts).await,
            Method::POST | Method::PUT | Method::PATCH => self.handle_upload(parts, body).await,
            Method::DELETE => self.handle_delete(parts).await,
            _ => Ok(ApiResponse::method_not_allowed().build()),
        }
    }

    async fn handle_get(&self, parts: &Parts) -> Result<Response<Full<Bytes>>> {
        let Some(file_path) = self.static_handler.resolve(parts.uri.path()) else {
            return Ok(ApiResponse::file_not_found().build());
        };

        match tokio::fs::metadata(&file_path).await {
            Ok(metadata) if metadata.is_file() => {
                self.static_handler.serve(parts, &file_path).await
            }
            _ => Ok(ApiResponse::file_not_found().build()),
        }
    }

    async fn handle_upload<B>(&self, parts: &Parts, body: B) -> Result<Response<Full<Bytes>>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        // The declared length is checked before any body byte is read.
        let declared_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<usize>().ok());

        if let Some(length) = declared_length {
            if length > self.config.max_upload_size {
                return Ok(ApiResponse::payload_too_large().build());
            }
        }

        let body_bytes = body
            .collect()
            .await
            .map_err(anyhow::Error::new)?
            .to_bytes();

        if body_bytes.len() > self.config.max_upload_size {
            return Ok(ApiResponse::payload_too_large().build());
        }

        let data: serde_json::Value = serde_json::from_slice(&body_bytes)?;

        Ok(ApiResponse::upload_received(&parts.method, data).build())
    }

    async fn handle_delete(&self, parts: &Parts) -> Result<Response<Full<Bytes>>> {
        let Some(file_path) = self.static_handler.resolve(parts.uri.path()) else {
            return Ok(ApiResponse::file_not_found().build());
        };

        if tokio::fs::metadata(&file_path).await.is_err() {
            return Ok(ApiResponse::file_not_found().build());
        }

        tokio::fs::remove_file(&file_path).await?;
        self.cache.invalidate(&file_path);

        Ok(ApiResponse::file_deleted().build())
    }
}
