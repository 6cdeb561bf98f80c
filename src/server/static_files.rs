use crate::cache::LookupCache;
use crate::config::Config;
use crate::server::response::ResponseBuilder;
use anyhow::{Context, Result};
use bytes::Bytes;
use http::request::Parts;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use mime_guess::MimeGuess;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Maps a file path's extension to a content-type, falling back to a
/// generic binary type.
pub fn resolve_mime(path: &Path) -> mime::Mime {
    MimeGuess::from_path(path)
        .first()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

pub struct StaticFileHandler {
    config: Arc<Config>,
    cache: Arc<LookupCache>,
}

impl StaticFileHandler {
    pub fn new(config: Arc<Config>, cache: Arc<LookupCache>) -> Self {
        Self { config, cache }
    }

    /// Resolves a request target against the root directory. Returns the
    /// bounded filesystem path, or `None` when the target decodes to
    /// something invalid or escapes the root. Existence is not checked.
    pub fn resolve(&self, target: &str) -> Option<PathBuf> {
        let sanitized = Self::sanitize_path(target)?;
        let full_path = self.config.directory.join(sanitized);

        if !self.is_within_root(&full_path) {
            debug!("Request target escapes the root directory: {}", target);
            return None;
        }

        Some(full_path)
    }

    fn sanitize_path(target: &str) -> Option<String> {
        let decoded = urlencoding::decode(target).ok()?;
        let path = decoded.trim_matches('/');

        if path.contains("..") || path.contains('\0') {
            return None;
        }

        Some(path.to_string())
    }

    fn is_within_root(&self, requested_path: &Path) -> bool {
        let canonical_requested = requested_path
            .canonicalize()
            .unwrap_or_else(|_| requested_path.to_path_buf());

        let canonical_root = self
            .config
            .directory
            .canonicalize()
            .unwrap_or_else(|_| self.config.directory.clone());

        canonical_requested.starts_with(canonical_root)
    }

    /// Serves a confirmed-existing regular file. Open/read failures after
    /// the existence check propagate to the generic 500 boundary.
    pub async fn serve(&self, parts: &Parts, file_path: &Path) -> Result<Response<Full<Bytes>>> {
        let metadata = fs::metadata(file_path)
            .await
            .with_context(|| format!("Failed to stat {}", file_path.display()))?;

        let etag = Self::generate_etag(&metadata);

        if let Some(if_none_match) = parts.headers.get("if-none-match") {
            if if_none_match.to_str().unwrap_or("") == etag {
                return Ok(ResponseBuilder::new(StatusCode::NOT_MODIFIED).build());
            }
        }

        if let Some(if_modified_since) = parts.headers.get("if-modified-since") {
            if let Ok(since_time) =
                httpdate::parse_http_date(if_modified_since.to_str().unwrap_or(""))
            {
                if let Ok(modified_time) = metadata.modified() {
                    if modified_time <= since_time {
                        return Ok(ResponseBuilder::new(StatusCode::NOT_MODIFIED).build());
                    }
                }
            }
        }

        let content = if parts.method == Method::HEAD {
            Bytes::new()
        } else {
            self.read_file(file_path, &etag).await?
        };

        let mime_type = resolve_mime(file_path);
        let content_length = if parts.method == Method::HEAD {
            metadata.len().to_string()
        } else {
            content.len().to_string()
        };

        let mut response = ResponseBuilder::new(StatusCode::OK)
            .header_string("content-type", mime_type.to_string())
            .header_string("content-length", content_length)
            .header_string("etag", etag)
            .header_string("last-modified", Self::format_last_modified(&metadata));

        if self.config.enable_caching {
            response = response.header("cache-control", "public, max-age=3600");
        }

        Ok(response.body(content).build())
    }

    /// Consults the lookup cache before disk; a miss (or an entry whose
    /// validator no longer matches the file) reads the file and
    /// repopulates the entry. Correctness never depends on a hit.
    async fn read_file(&self, file_path: &Path, etag: &str) -> Result<Bytes> {
        if self.config.enable_caching {
            if let Some(entry) = self.cache.get(file_path) {
                if entry.etag == etag {
                    debug!("Cache hit: {}", file_path.display());
                    return Ok(entry.content);
                }
            }
        }

        let content = Bytes::from(
            fs::read(file_path)
                .await
                .with_context(|| format!("Failed to read {}", file_path.display()))?,
        );

        if self.config.enable_caching {
            self.cache
                .put(file_path.to_path_buf(), content.clone(), etag.to_string());
        }

        Ok(content)
    }

    fn generate_etag(metadata: &std::fs::Metadata) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        metadata.len().hash(&mut hasher);
        if let Ok(modified) = metadata.modified() {
            if let Ok(duration) = modified.duration_since(std::time::UNIX_EPOCH) {
                duration.as_secs().hash(&mut hasher);
            }
        }
        format!("\"{}\"", hasher.finish())
    }

    fn format_last_modified(metadata: &std::fs::Metadata) -> String {
        match metadata.modified() {
            Ok(time) => httpdate::fmt_http_date(time),
            Err(_) => httpdate::fmt_http_date(std::time::SystemTime::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            StaticFileHandler::sanitize_path("/index.html").unwrap(),
            "index.html"
        );
        assert_eq!(
            StaticFileHandler::sanitize_path("/css/style.css").unwrap(),
            "css/style.css"
        );
        assert_eq!(
            StaticFileHandler::sanitize_path("/with%20space.txt").unwrap(),
            "with space.txt"
        );
        assert!(StaticFileHandler::sanitize_path("/../etc/passwd").is_none());
        assert!(StaticFileHandler::sanitize_path("/a/../../etc/passwd").is_none());
        assert!(StaticFileHandler::sanitize_path("/file\0.txt").is_none());
    }

    #[test]
    fn test_resolve_mime() {
        assert_eq!(resolve_mime(Path::new("page.html")), mime::TEXT_HTML);
        assert_eq!(resolve_mime(Path::new("data.json")), mime::APPLICATION_JSON);
        assert_eq!(
            resolve_mime(Path::new("blob.unknown-ext")),
            mime::APPLICATION_OCTET_STREAM
        );
    }

    #[test]
    fn test_resolve_bounds_within_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hi").unwrap();

        let mut config = Config::default();
        config.directory = dir.path().to_path_buf();
        let handler = StaticFileHandler::new(
            Arc::new(config),
            Arc::new(LookupCache::new()),
        );

        let resolved = handler.resolve("/a.txt").unwrap();
        assert!(resolved.ends_with("a.txt"));

        assert!(handler.resolve("/../outside.txt").is_none());
        assert!(handler.resolve("/%2e%2e/outside.txt").is_none());
    }
}
