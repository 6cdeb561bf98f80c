use anyhow::{Context, Result};
use hyper::Method;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// Append-only store for request metadata. Receives `(method, path)`
/// tuples; a write failure is logged and swallowed so the collaborator
/// can never fail a request.
pub struct RecordStore {
    file: Arc<Mutex<std::fs::File>>,
    path: PathBuf,
}

impl RecordStore {
    /// Opens the store named by a `database` locator. The `sqlite:///`
    /// scheme of the original deployment maps to a sibling line log.
    pub fn open(locator: &str) -> Result<Self> {
        let path = Self::log_path(locator);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open record store: {}", path.display()))?;

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path,
        })
    }

    fn log_path(locator: &str) -> PathBuf {
        let raw = locator.strip_prefix("sqlite:///").unwrap_or(locator);
        PathBuf::from(raw).with_extension("log")
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub async fn append(&self, method: &Method, path: &str) {
        let line = format!("{} {} {}", chrono::Utc::now().to_rfc3339(), method, path);

        let mut file = self.file.lock().await;
        if let Err(e) = writeln!(file, "{}", line) {
            error!("Failed to append request record: {}", e);
            return;
        }
        if let Err(e) = file.flush() {
            error!("Failed to flush record store: {}", e);
        }
    }
}
