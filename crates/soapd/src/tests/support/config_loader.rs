//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::{Arc, Mutex};

use soap_config::{Config, ConfigError, SocketEndpoint, TlsSettings};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Where the test configuration points the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Tcp,
    Unix,
    TlsWithMissingFiles,
}

/// Loader that provisions endpoints and files under a temporary directory.
pub struct TestConfigLoader {
    dir: Arc<Mutex<TempDir>>,
    placement: Placement,
}

impl TestConfigLoader {
    /// Loopback TCP endpoint on an ephemeral port.
    #[must_use]
    pub fn tcp() -> Self {
        Self::with_placement(Placement::Tcp)
    }

    /// Unix socket inside a fresh temporary directory.
    #[must_use]
    pub fn unix() -> Self {
        Self::with_placement(Placement::Unix)
    }

    /// TCP endpoint with TLS paths that do not exist.
    #[must_use]
    pub fn tls_with_missing_files() -> Self {
        Self::with_placement(Placement::TlsWithMissingFiles)
    }

    fn with_placement(placement: Placement) -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        Self {
            dir: Arc::new(Mutex::new(dir)),
            placement,
        }
    }

    fn path_of(&self, name: &str) -> String {
        let dir = self
            .dir
            .lock()
            .expect("temporary directory mutex poisoned");
        dir.path()
            .join(name)
            .to_str()
            .expect("temporary path was not valid UTF-8")
            .to_owned()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        let base = Config::default();
        Ok(match self.placement {
            Placement::Tcp => Config {
                listen: SocketEndpoint::tcp("127.0.0.1", 0),
                ..base
            },
            Placement::Unix => Config {
                listen: SocketEndpoint::unix(self.path_of("run/soapd.sock")),
                ..base
            },
            Placement::TlsWithMissingFiles => Config {
                listen: SocketEndpoint::tcp("127.0.0.1", 0),
                tls: Some(TlsSettings {
                    cert_path: self.path_of("missing-cert.pem").into(),
                    key_path: self.path_of("missing-key.pem").into(),
                }),
                ..base
            },
        })
    }
}

/// Loader that intentionally fails by passing an invalid listen endpoint.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        let args = vec![
            OsString::from("soapd"),
            OsString::from("--listen"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
