use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

/// Server configuration, loaded once at startup and shared immutably
/// across all connection workers.
///
/// Every field carries a default so a partial (or absent) config file
/// overlays only the fields it names.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "defaults::port")]
    pub port: u16,
    #[serde(default = "defaults::directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub ssl_certfile: Option<PathBuf>,
    #[serde(default)]
    pub ssl_keyfile: Option<PathBuf>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "defaults::max_upload_size")]
    pub max_upload_size: usize,
    #[serde(default = "defaults::enabled")]
    pub enable_caching: bool,
    #[serde(default = "defaults::enabled")]
    pub enable_cors: bool,
    /// Declared but unused; reserved for a future websocket layer.
    #[serde(default)]
    pub enable_websocket: bool,
    /// Locator for the request record store.
    #[serde(default = "defaults::database")]
    pub database: String,
    /// Reserved cache locator; the in-process lookup cache stands in.
    #[serde(default = "defaults::redis_url")]
    pub redis_url: String,
    /// Accepted but never enforced.
    #[serde(default = "defaults::rate_limit")]
    pub rate_limit: u32,
    /// Accepted but never loaded.
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default = "defaults::metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

mod defaults {
    use std::path::PathBuf;

    pub fn port() -> u16 {
        8000
    }

    pub fn directory() -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    pub fn max_upload_size() -> usize {
        10 * 1024 * 1024 // 10 MiB
    }

    pub fn enabled() -> bool {
        true
    }

    pub fn database() -> String {
        "sqlite:///database.db".to_string()
    }

    pub fn redis_url() -> String {
        "redis://localhost:6379/0".to_string()
    }

    pub fn rate_limit() -> u32 {
        100
    }

    pub fn metrics_port() -> u16 {
        8001
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            directory: defaults::directory(),
            ssl_certfile: None,
            ssl_keyfile: None,
            auth: AuthConfig::default(),
            max_upload_size: defaults::max_upload_size(),
            enable_caching: true,
            enable_cors: true,
            enable_websocket: false,
            database: defaults::database(),
            redis_url: defaults::redis_url(),
            rate_limit: defaults::rate_limit(),
            plugins: Vec::new(),
            metrics_port: defaults::metrics_port(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow::anyhow!("port must be greater than 0"));
        }

        if self.max_upload_size == 0 {
            return Err(anyhow::anyhow!("max_upload_size must be greater than 0"));
        }

        if self.ssl_certfile.is_some() != self.ssl_keyfile.is_some() {
            return Err(anyhow::anyhow!(
                "ssl_certfile and ssl_keyfile must be configured together"
            ));
        }

        if !self.directory.is_dir() {
            return Err(anyhow::anyhow!(
                "root directory does not exist: {}",
                self.directory.display()
            ));
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.metrics_port))
    }

    pub fn tls_enabled(&self) -> bool {
        self.ssl_certfile.is_some() && self.ssl_keyfile.is_some()
    }

    /// Configured Basic-auth credentials, if both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.auth.username, &self.auth.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}
