//! Test helpers for the transport module.

use std::io::Write;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rustls::pki_types::CertificateDer;
use soap_config::TlsSettings;
use tempfile::TempDir;

use super::{ConnectionHandler, ConnectionStream};

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writes a fixed greeting and closes the write half.
pub(crate) struct GreetingHandler;

pub(crate) const GREETING: &[u8] = b"hello over the wire";

impl ConnectionHandler for GreetingHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        if stream.write_all(GREETING).is_ok() {
            let _ = stream.finish();
        }
    }
}

pub(crate) fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

/// Self-signed `localhost` certificate written to a temporary directory.
pub(crate) struct TestCertificate {
    _dir: TempDir,
    pub(crate) settings: TlsSettings,
    pub(crate) der: CertificateDer<'static>,
}

pub(crate) fn self_signed_certificate() -> TestCertificate {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()])
        .expect("generate certificate");
    let dir = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    let cert_path = root.join("cert.pem");
    let key_path = root.join("key.pem");
    std::fs::write(&cert_path, certified.cert.pem()).expect("write certificate");
    std::fs::write(&key_path, certified.key_pair.serialize_pem()).expect("write key");
    TestCertificate {
        _dir: dir,
        settings: TlsSettings {
            cert_path,
            key_path,
        },
        der: certified.cert.der().clone(),
    }
}
