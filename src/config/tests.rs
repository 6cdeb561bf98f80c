#[cfg(test)]
mod tests {
    use crate::config::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert!(config.enable_caching);
        assert!(config.enable_cors);
        assert!(!config.enable_websocket);
        assert_eq!(config.database, "sqlite:///database.db");
        assert_eq!(config.rate_limit, 100);
        assert!(config.plugins.is_empty());
        assert_eq!(config.metrics_port, 8001);
        assert!(config.auth.username.is_none());
        assert!(config.auth.password.is_none());
    }

    #[test]
    fn test_config_validation_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_port() {
        let mut config = Config::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_upload_cap() {
        let mut config = Config::default();
        config.max_upload_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_cert_without_key() {
        let mut config = Config::default();
        config.ssl_certfile = Some(PathBuf::from("cert.pem"));
        assert!(config.validate().is_err());

        config.ssl_keyfile = Some(PathBuf::from("key.pem"));
        // Both present passes the pairing check (file existence is the
        // TLS layer's concern).
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_missing_directory() {
        let mut config = Config::default();
        config.directory = PathBuf::from("/nonexistent/omniserve-root");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_overlays_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"port": 9090, "enable_cors": false}"#).unwrap();
        assert_eq!(config.port, 9090);
        assert!(!config.enable_cors);
        // Untouched fields keep their defaults.
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert!(config.enable_caching);
    }

    #[test]
    fn test_auth_overlay() {
        let config: Config =
            serde_json::from_str(r#"{"auth": {"username": "admin", "password": "secret"}}"#)
                .unwrap();
        assert_eq!(config.credentials(), Some(("admin", "secret")));
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let config: Config =
            serde_json::from_str(r#"{"auth": {"username": "admin"}}"#).unwrap();
        assert_eq!(config.credentials(), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 8123, "max_upload_size": 2048}}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.max_upload_size, 2048);
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(Config::load("/nonexistent/config.json").is_err());
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_listen_addresses() {
        let config = Config::default();
        assert_eq!(config.listen_addr().port(), 8000);
        assert_eq!(config.metrics_addr().port(), 8001);
    }

    #[test]
    fn test_tls_enabled() {
        let mut config = Config::default();
        assert!(!config.tls_enabled());

        config.ssl_certfile = Some(PathBuf::from("cert.pem"));
        config.ssl_keyfile = Some(PathBuf::from("key.pem"));
        assert!(config.tls_enabled());
    }
}
