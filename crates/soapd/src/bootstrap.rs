//! Daemon bootstrap orchestration.

use std::sync::Arc;

use rustls::ServerConfig;
use soap_config::{Config, ConfigError, SocketPreparationError};
use thiserror::Error;

use crate::codec::EnvelopeCodec;
use crate::dispatch::{DispatchConfig, Dispatcher, SoapConnectionHandler};
use crate::health::HealthReporter;
use crate::registry::{Registry, SharedRegistry};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{
    ListenerError, ListenerHandle, ServeOptions, SocketListener, TlsSetupError, load_server_config,
};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a layer is unreadable or the merged
    /// configuration is invalid.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that always returns the same configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare listen socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// TLS material could not be loaded.
    #[error("failed to load TLS material: {source}")]
    Tls {
        /// Underlying TLS error.
        #[source]
        source: TlsSetupError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    tls: Option<Arc<ServerConfig>>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Empty registry filing empty-namespace registrations under the
    /// configured default namespace.
    #[must_use]
    pub fn registry(&self) -> Registry {
        Registry::with_default_namespace(self.config.default_namespace())
    }

    /// Binds the configured endpoint and starts serving `registry`.
    ///
    /// Registrations made through `registry` after this call are visible to
    /// later requests.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the endpoint cannot be bound or the
    /// accept loop cannot start.
    pub fn serve(
        &self,
        registry: SharedRegistry,
        codec: Arc<dyn EnvelopeCodec>,
    ) -> Result<ListenerHandle, ListenerError> {
        let dispatcher = Dispatcher::new(registry, DispatchConfig::from(&self.config));
        let handler = Arc::new(SoapConnectionHandler::new(
            dispatcher,
            codec,
            self.config.encoding.clone(),
            self.config.dump,
        ));
        let options = ServeOptions {
            mode: self.config.serve_mode,
            tls: self.tls.clone(),
            io_timeout: self.config.io_timeout(),
        };
        let started = SocketListener::bind(self.config.listen())
            .and_then(|listener| listener.start(handler, options));
        match started {
            Ok(handle) => {
                self.reporter.listener_started(self.config.listen());
                Ok(handle)
            }
            Err(error) => {
                self.reporter.listener_failed(&error);
                Err(error)
            }
        }
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first stage that fails; the reporter
/// has already been told about it.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = config.listen().prepare_filesystem() {
        let error = BootstrapError::Socket { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let tls = match config.tls.as_ref().map(load_server_config).transpose() {
        Ok(tls) => tls,
        Err(source) => {
            let error = BootstrapError::Tls { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        tls,
        telemetry,
        reporter,
    })
}
