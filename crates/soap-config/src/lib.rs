//! Shared configuration for the SOAP dispatch daemon.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file
//! named by `--config-path`, then `SOAPD_*` environment variables, then
//! command-line flags. The resolved [`Config`] is an explicit value handed to
//! the dispatcher and the listener at construction; nothing in the daemon reads
//! process-wide switches after startup.

mod defaults;
mod load;
mod logging;
mod options;
mod socket;

use std::time::Duration;

pub use defaults::{
    DEFAULT_ENCODING, DEFAULT_IO_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT,
    default_listen_endpoint, default_log_filter, default_log_format,
};
pub use load::ConfigError;
pub use logging::{DumpSettings, LogFormat};
pub use options::{FaultDetail, ServeMode, TlsSettings};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Endpoint the listener binds.
    pub listen: SocketEndpoint,
    /// Connection scheduling.
    pub serve_mode: ServeMode,
    /// TLS material; only valid with a TCP endpoint.
    pub tls: Option<TlsSettings>,
    /// Read/write deadline for accepted connections in milliseconds; `0`
    /// disables the deadline.
    pub io_timeout_ms: u64,
    /// Namespace substituted for the empty namespace at registration time.
    pub namespace: Option<String>,
    /// Enables the `_<digits>` ordered-argument extension.
    pub special_args: bool,
    /// Detail policy for synthesised `Server` faults.
    pub fault_detail: FaultDetail,
    /// Character encoding advertised on responses.
    pub encoding: String,
    /// Wire-level diagnostic dumps.
    pub dump: DumpSettings,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            serve_mode: ServeMode::default(),
            tls: None,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            namespace: None,
            special_args: false,
            fault_detail: FaultDetail::default(),
            encoding: DEFAULT_ENCODING.to_owned(),
            dump: DumpSettings::default(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint the listener binds.
    #[must_use]
    pub const fn listen(&self) -> &SocketEndpoint {
        &self.listen
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Read/write deadline for accepted connections.
    #[must_use]
    pub const fn io_timeout(&self) -> Option<Duration> {
        match self.io_timeout_ms {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        }
    }

    /// Namespace substituted for the empty namespace at registration time.
    #[must_use]
    pub fn default_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when TLS is paired with a Unix endpoint or the
    /// response encoding is not a valid charset token.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tls.is_some() && !self.listen.is_tcp() {
            return Err(ConfigError::TlsRequiresTcp {
                endpoint: self.listen.to_string(),
            });
        }
        let valid_encoding = !self.encoding.is_empty()
            && self
                .encoding
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | ':'));
        if !valid_encoding {
            return Err(ConfigError::InvalidEncoding(self.encoding.clone()));
        }
        Ok(())
    }
}
