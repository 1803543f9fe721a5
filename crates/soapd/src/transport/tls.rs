//! TLS acceptor built from PEM files.

use std::fs;
use std::io;
use std::net::TcpStream;
use std::sync::Arc;

use camino::Utf8Path;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use soap_config::TlsSettings;

use super::{ConnectionStream, TlsSetupError};

/// Loads the certificate chain and key named by `settings`.
///
/// # Errors
///
/// Returns [`TlsSetupError`] when a file is unreadable, holds no usable PEM,
/// or the key does not match the certificate.
pub fn load_server_config(settings: &TlsSettings) -> Result<Arc<ServerConfig>, TlsSetupError> {
    let cert_pem = read_pem(&settings.cert_path)?;
    let key_pem = read_pem(&settings.key_path)?;

    let certs = CertificateDer::pem_slice_iter(&cert_pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsSetupError::Pem {
            path: settings.cert_path.to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsSetupError::NoCertificates {
            path: settings.cert_path.to_string(),
        });
    }
    let key = PrivateKeyDer::from_pem_slice(&key_pem).map_err(|source| TlsSetupError::Pem {
        path: settings.key_path.to_string(),
        source,
    })?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|source| TlsSetupError::Config { source })?;
    Ok(Arc::new(config))
}

fn read_pem(path: &Utf8Path) -> Result<Vec<u8>, TlsSetupError> {
    fs::read(path).map_err(|source| TlsSetupError::Read {
        path: path.to_string(),
        source,
    })
}

/// Runs the server side of the handshake on `stream`.
///
/// # Errors
///
/// Returns the I/O or protocol error that aborted the handshake.
pub(crate) fn accept(config: &Arc<ServerConfig>, stream: TcpStream) -> io::Result<ConnectionStream> {
    let connection = ServerConnection::new(Arc::clone(config)).map_err(io::Error::other)?;
    let mut tls = StreamOwned::new(connection, stream);
    while tls.conn.is_handshaking() {
        let (read, written) = tls.conn.complete_io(&mut tls.sock)?;
        if read == 0 && written == 0 && tls.conn.is_handshaking() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed during TLS handshake",
            ));
        }
    }
    Ok(ConnectionStream::Tls(Box::new(tls)))
}
