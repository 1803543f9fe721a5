use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Default TCP port of the SOAP listener.
pub const DEFAULT_TCP_PORT: u16 = 8080;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default character encoding advertised on responses.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Default read/write deadline for accepted connections, in milliseconds.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 30_000;

/// Default log filter expression used by the daemon.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the daemon.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint the listener binds when nothing else is configured.
#[must_use]
pub fn default_listen_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
