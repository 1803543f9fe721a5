//! Layered configuration loading.
//!
//! The TOML file supplies the base values, clap supplies environment and
//! command-line overrides, and [`Config::validate`] runs on the merged result.

use std::ffi::OsString;
use std::fs;
use std::io;

use camino::Utf8PathBuf;
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::{Config, DumpSettings, FaultDetail, LogFormat, ServeMode, SocketEndpoint, TlsSettings};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Command-line or environment parsing failed (including `--help`).
    #[error(transparent)]
    Cli(#[from] clap::Error),
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    ReadFile {
        /// File named by `--config-path`.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configuration file is not valid TOML for [`Config`].
    #[error("failed to parse configuration file '{path}': {source}")]
    ParseFile {
        /// File named by `--config-path`.
        path: Utf8PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// TLS was configured for a non-TCP endpoint.
    #[error("TLS requires a TCP listen endpoint, got {endpoint}")]
    TlsRequiresTcp {
        /// Offending endpoint.
        endpoint: String,
    },
    /// Only one of the TLS certificate and key was supplied.
    #[error("TLS needs both a certificate and a private key")]
    IncompleteTls,
    /// The response encoding is not a charset token.
    #[error("invalid response encoding '{0}'")]
    InvalidEncoding(String),
}

/// Command-line and environment overrides.
#[derive(Debug, Parser)]
#[command(name = "soapd", about = "SOAP request-dispatch daemon", version)]
struct CliArgs {
    /// TOML configuration file.
    #[arg(long, env = "SOAPD_CONFIG_PATH")]
    config_path: Option<Utf8PathBuf>,
    /// Listen endpoint, `tcp://host:port` or `unix:///path`.
    #[arg(long, env = "SOAPD_LISTEN")]
    listen: Option<SocketEndpoint>,
    /// `sequential` or `threaded`.
    #[arg(long, env = "SOAPD_SERVE_MODE")]
    serve_mode: Option<ServeMode>,
    /// PEM certificate chain enabling TLS.
    #[arg(long, env = "SOAPD_TLS_CERT")]
    tls_cert: Option<Utf8PathBuf>,
    /// PEM private key enabling TLS.
    #[arg(long, env = "SOAPD_TLS_KEY")]
    tls_key: Option<Utf8PathBuf>,
    /// Read/write deadline in milliseconds, `0` to disable.
    #[arg(long, env = "SOAPD_IO_TIMEOUT_MS")]
    io_timeout_ms: Option<u64>,
    /// Namespace used for empty-namespace registrations.
    #[arg(long, env = "SOAPD_NAMESPACE")]
    namespace: Option<String>,
    /// Enable `_<digits>` ordered arguments.
    #[arg(long, env = "SOAPD_SPECIAL_ARGS", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    special_args: Option<bool>,
    /// `omit`, `terse` or `full`.
    #[arg(long, env = "SOAPD_FAULT_DETAIL")]
    fault_detail: Option<FaultDetail>,
    /// Shorthand for `--fault-detail full`.
    #[arg(long, env = "SOAPD_RETURN_FAULT_INFO", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    return_fault_info: Option<bool>,
    /// Character encoding advertised on responses.
    #[arg(long, env = "SOAPD_ENCODING")]
    encoding: Option<String>,
    /// Log handler error chains.
    #[arg(long, env = "SOAPD_DUMP_FAULT_INFO", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    dump_fault_info: Option<bool>,
    /// Log inbound HTTP headers.
    #[arg(long, env = "SOAPD_DUMP_HEADERS_IN", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    dump_headers_in: Option<bool>,
    /// Log outbound HTTP headers.
    #[arg(long, env = "SOAPD_DUMP_HEADERS_OUT", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    dump_headers_out: Option<bool>,
    /// Log inbound envelopes.
    #[arg(long, env = "SOAPD_DUMP_SOAP_IN", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    dump_soap_in: Option<bool>,
    /// Log outbound envelopes.
    #[arg(long, env = "SOAPD_DUMP_SOAP_OUT", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    dump_soap_out: Option<bool>,
    /// `tracing` filter expression.
    #[arg(long, env = "SOAPD_LOG_FILTER")]
    log_filter: Option<String>,
    /// `json` or `compact`.
    #[arg(long, env = "SOAPD_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

/// Shape of the TOML configuration file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    listen: Option<SocketEndpoint>,
    serve_mode: Option<ServeMode>,
    tls: Option<TlsSettings>,
    io_timeout_ms: Option<u64>,
    namespace: Option<String>,
    special_args: Option<bool>,
    fault_detail: Option<FaultDetail>,
    return_fault_info: Option<bool>,
    encoding: Option<String>,
    dump: Option<DumpSettings>,
    log_filter: Option<String>,
    log_format: Option<LogFormat>,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any layer fails to parse or the merged
    /// configuration is inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is the program name, as with [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any layer fails to parse or the merged
    /// configuration is inconsistent.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = CliArgs::try_parse_from(args)?;
        let mut config = Self::default();
        if let Some(path) = cli.config_path.as_ref() {
            read_file(path)?.apply_to(&mut config);
        }
        cli.apply_to(&mut config)?;
        config.validate()?;
        Ok(config)
    }
}

fn read_file(path: &Utf8PathBuf) -> Result<FileConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseFile {
        path: path.clone(),
        source,
    })
}

impl FileConfig {
    fn apply_to(self, config: &mut Config) {
        override_with(&mut config.listen, self.listen);
        override_with(&mut config.serve_mode, self.serve_mode);
        if self.tls.is_some() {
            config.tls = self.tls;
        }
        override_with(&mut config.io_timeout_ms, self.io_timeout_ms);
        if self.namespace.is_some() {
            config.namespace = self.namespace;
        }
        override_with(&mut config.special_args, self.special_args);
        override_with(&mut config.fault_detail, self.fault_detail);
        if self.return_fault_info == Some(true) {
            config.fault_detail = FaultDetail::Full;
        }
        override_with(&mut config.encoding, self.encoding);
        override_with(&mut config.dump, self.dump);
        override_with(&mut config.log_filter, self.log_filter);
        override_with(&mut config.log_format, self.log_format);
    }
}

impl CliArgs {
    fn apply_to(self, config: &mut Config) -> Result<(), ConfigError> {
        override_with(&mut config.listen, self.listen);
        override_with(&mut config.serve_mode, self.serve_mode);
        match (self.tls_cert, self.tls_key) {
            (Some(cert_path), Some(key_path)) => {
                config.tls = Some(TlsSettings {
                    cert_path,
                    key_path,
                });
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteTls),
        }
        override_with(&mut config.io_timeout_ms, self.io_timeout_ms);
        if self.namespace.is_some() {
            config.namespace = self.namespace;
        }
        override_with(&mut config.special_args, self.special_args);
        override_with(&mut config.fault_detail, self.fault_detail);
        if self.return_fault_info == Some(true) {
            config.fault_detail = FaultDetail::Full;
        }
        override_with(&mut config.encoding, self.encoding);
        override_with(&mut config.dump.fault_info, self.dump_fault_info);
        override_with(&mut config.dump.headers_in, self.dump_headers_in);
        override_with(&mut config.dump.headers_out, self.dump_headers_out);
        override_with(&mut config.dump.soap_in, self.dump_soap_in);
        override_with(&mut config.dump.soap_out, self.dump_soap_out);
        override_with(&mut config.log_filter, self.log_filter);
        override_with(&mut config.log_format, self.log_format);
        Ok(())
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
