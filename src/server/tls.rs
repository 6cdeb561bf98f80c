use anyhow::{Context, Result};
use rustls::ServerConfig;
use rustls_pemfile::{certs, pkcs8_private_keys};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

/// Wraps the listening socket's accepted connections in TLS when
/// certificate material is configured.
#[derive(Clone)]
pub struct TlsManager {
    acceptor: Option<TlsAcceptor>,
}

impl TlsManager {
    pub fn new(cert_path: Option<&Path>, key_path: Option<&Path>) -> Result<Self> {
        let acceptor = match (cert_path, key_path) {
            (Some(cert), Some(key)) => Some(Self::create_tls_acceptor(cert, key)?),
            _ => None,
        };

        Ok(Self { acceptor })
    }

    pub fn get_acceptor(&self) -> Option<&TlsAcceptor> {
        self.acceptor.as_ref()
    }

    fn create_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
        let cert_file = File::open(cert_path)
            .with_context(|| format!("Failed to open certificate file: {}", cert_path.display()))?;
        let mut cert_reader = BufReader::new(cert_file);
        let cert_chain: Vec<_> = certs(&mut cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to parse certificate file")?;

        let key_file = File::open(key_path)
            .with_context(|| format!("Failed to open private key file: {}", key_path.display()))?;
        let mut key_reader = BufReader::new(key_file);
        let mut keys: Vec<_> = pkcs8_private_keys(&mut key_reader)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to parse private key file")?;

        let private_key = keys
            .pop()
            .ok_or_else(|| anyhow::anyhow!("No private keys found in key file"))?;

        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(cert_chain, private_key.into())
            .context("Failed to build TLS configuration")?;

        // Plain HTTP/1.1 over TLS is the only wire protocol served.
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(TlsAcceptor::from(Arc::new(config)))
    }
}
