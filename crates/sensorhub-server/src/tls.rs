//! rustls client configuration for broker connections.
//!
//! Trust anchors are the platform roots plus an optional extra CA in PEM
//! form. A CA file that yields no certificates is not fatal; the connection
//! proceeds with the platform roots only.

use std::io::BufReader;
use std::sync::Arc;

use rumqttc::tokio_rustls::rustls::{ClientConfig, RootCertStore};
use rumqttc::{TlsConfiguration, Transport};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("no trust anchors available: no system certificates and no usable CA file")]
    NoTrustAnchors,
}

/// Build the root store from the platform roots and `ca_pem`.
pub fn root_store(ca_pem: Option<&[u8]>) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    add_system_roots(&mut roots);

    if let Some(pem) = ca_pem {
        debug!("Constructing cert pool from CA file");
        if append_ca(&mut roots, pem) == 0 {
            warn!("No certs appended, using system certs only");
        }
    }

    require_anchors(roots)
}

fn add_system_roots(roots: &mut RootCertStore) {
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = roots.add_parsable_certificates(certs);
            debug!("Loaded {} system certs ({} ignored)", added, ignored);
        }
        Err(e) => warn!("Unable to get system cert pool: {}", e),
    }
}

/// Add every certificate in `pem` to `roots`, returning how many were
/// accepted.
fn append_ca(roots: &mut RootCertStore, pem: &[u8]) -> usize {
    let mut reader = BufReader::new(pem);
    let certs: Vec<_> = rustls_pemfile::certs(&mut reader)
        .filter_map(|cert| match cert {
            Ok(cert) => Some(cert),
            Err(e) => {
                warn!("Skipping unreadable certificate in CA file: {}", e);
                None
            }
        })
        .collect();
    let (added, _) = roots.add_parsable_certificates(certs);
    added
}

fn require_anchors(roots: RootCertStore) -> Result<RootCertStore, TlsError> {
    if roots.is_empty() {
        return Err(TlsError::NoTrustAnchors);
    }
    Ok(roots)
}

/// rumqttc transport for a TLS broker.
pub fn transport(ca_pem: Option<&[u8]>) -> Result<Transport, TlsError> {
    let config = ClientConfig::builder()
        .with_root_certificates(root_store(ca_pem)?)
        .with_no_client_auth();
    debug!("Configured TLS");
    Ok(Transport::tls_with_config(TlsConfiguration::Rustls(Arc::new(config))))
}
