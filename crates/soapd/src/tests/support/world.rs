//! BDD test world: loader, reporter, daemon and served-endpoint state for step functions.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::sync::Arc;

use serde_json::{Value, json};
use soap_config::SocketEndpoint;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::codec::JsonEnvelopeCodec;
use crate::registry::{Handler, Reply, SharedRegistry};
use crate::transport::{ListenerError, ListenerHandle};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    listener: Option<ListenerHandle>,
    serve_error: Option<ListenerError>,
    response: Option<String>,
}

impl TestWorld {
    /// Builds a world with a loopback TCP configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::tcp()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            daemon: None,
            bootstrap_error: None,
            listener: None,
            serve_error: None,
            response: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.install(Box::new(FailingConfigLoader));
    }

    /// Installs a loader that succeeds with a TCP endpoint.
    pub fn use_tcp_loader(&mut self) {
        self.install(Box::new(TestConfigLoader::tcp()));
    }

    /// Installs a loader that succeeds with a Unix socket endpoint.
    pub fn use_unix_loader(&mut self) {
        self.install(Box::new(TestConfigLoader::unix()));
    }

    /// Installs a loader whose TLS files are missing.
    pub fn use_missing_tls_loader(&mut self) {
        self.install(Box::new(TestConfigLoader::tls_with_missing_files()));
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        match bootstrap_with(&*self.loader, self.reporter.clone()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Starts serving a registry holding a single `echo` function.
    pub fn serve(&mut self) {
        let Some(daemon) = self.daemon.as_ref() else {
            return;
        };
        let mut registry = daemon.registry();
        registry.register_function(
            "",
            "echo",
            Handler::plain(|args| Ok(Reply::from(Value::Array(args.positional().to_vec())))),
        );
        match daemon.serve(
            SharedRegistry::from(registry),
            Arc::new(JsonEnvelopeCodec::new()),
        ) {
            Ok(handle) => self.listener = Some(handle),
            Err(error) => self.serve_error = Some(error),
        }
    }

    /// Posts an `echo` call carrying `word` and stores the raw response.
    pub fn call_echo(&mut self, word: &str) {
        let body = json!({ "method": "echo", "args": [word] }).to_string();
        let request = format!(
            "POST / HTTP/1.0\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        self.response = Some(self.exchange(request.as_bytes()));
    }

    fn exchange(&self, request: &[u8]) -> String {
        let daemon = self.daemon.as_ref().expect("daemon not bootstrapped");
        let mut response = String::new();
        match daemon.config().listen() {
            SocketEndpoint::Tcp { .. } => {
                let addr = self
                    .listener
                    .as_ref()
                    .and_then(ListenerHandle::local_addr)
                    .expect("listener address");
                let mut stream = TcpStream::connect(addr).expect("connect to listener");
                stream.write_all(request).expect("write request");
                stream.read_to_string(&mut response).expect("read response");
            }
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    let mut stream =
                        UnixStream::connect(path.as_std_path()).expect("connect to socket");
                    stream.write_all(request).expect("write request");
                    stream.read_to_string(&mut response).expect("read response");
                }
                #[cfg(not(unix))]
                panic!("unix sockets are unavailable: {path}");
            }
        }
        response
    }

    /// Returns whether bootstrap produced an error.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns true when the daemon handle is available.
    #[must_use]
    pub fn daemon_started(&self) -> bool {
        self.daemon.is_some()
    }

    /// Returns the error raised while starting the listener, if any.
    #[must_use]
    pub fn serve_error(&self) -> Option<&ListenerError> {
        self.serve_error.as_ref()
    }

    /// Last raw HTTP response.
    #[must_use]
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    fn install(&mut self, loader: Box<dyn ConfigLoader>) {
        self.loader = loader;
        self.stop_listener();
        self.daemon = None;
        self.bootstrap_error = None;
        self.serve_error = None;
        self.response = None;
    }

    fn stop_listener(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            handle.join().expect("listener thread panicked");
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            drop(handle.join());
        }
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
