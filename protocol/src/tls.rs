//! Optional mutual TLS for the data-plane and control-plane listeners.
//!
//! When certificate, key and CA files are all supplied the server requires
//! and verifies client certificates; when all three are empty the listener
//! runs cleartext. A partial set is a configuration error, caught by
//! `TlsMaterial::load`.

use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TlsFiles {
    pub cert: Option<String>,
    pub key: Option<String>,
    pub ca: Option<String>,
}

impl TlsFiles {
    pub fn is_empty(&self) -> bool {
        self.cert.is_none() && self.key.is_none() && self.ca.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.cert.is_some() && self.key.is_some() && self.ca.is_some()
    }
}

/// Loaded certificate chain, private key and trust root, ready to build
/// either a server-side or client-side `rustls` config.
pub struct TlsMaterial {
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    roots: RootCertStore,
}

impl TlsMaterial {
    /// Validates `files` against the "all three or none" rule and loads the
    /// PEM material. Returns `Ok(None)` when TLS is disabled (all empty).
    pub fn load(files: &TlsFiles) -> io::Result<Option<Self>> {
        if files.is_empty() {
            return Ok(None);
        }
        if !files.is_complete() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cert, key and ca must be supplied together or not at all",
            ));
        }

        let cert_path = files.cert.as_ref().unwrap();
        let key_path = files.key.as_ref().unwrap();
        let ca_path = files.ca.as_ref().unwrap();

        let certs = load_certs(cert_path)?;
        let key = load_key(key_path)?;
        let roots = load_roots(ca_path)?;

        Ok(Some(TlsMaterial { certs, key, roots }))
    }

    pub fn server_config(self) -> io::Result<Arc<ServerConfig>> {
        let verifier = WebPkiClientVerifier::builder(Arc::new(self.roots))
            .build()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        let config = ServerConfig::builder()
            .with_client_cert_verifier(verifier)
            .with_single_cert(self.certs, self.key)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        Ok(Arc::new(config))
    }

    pub fn client_config(self) -> io::Result<Arc<ClientConfig>> {
        let config = ClientConfig::builder()
            .with_root_certificates(self.roots)
            .with_client_auth_cert(self.certs, self.key)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        Ok(Arc::new(config))
    }
}

fn load_certs(path: &str) -> io::Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(Path::new(path))?);
    rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()
}

fn load_key(path: &str) -> io::Result<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(File::open(Path::new(path))?);
    rustls_pemfile::private_key(&mut reader)?
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no private key found in file"))
}

fn load_roots(path: &str) -> io::Result<RootCertStore> {
    let mut reader = BufReader::new(File::open(Path::new(path))?);
    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        roots
            .add(cert?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    }
    Ok(roots)
}

pub fn server_name(host: &str) -> io::Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid TLS server name"))
}
