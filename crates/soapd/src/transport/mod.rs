//! Socket listener and HTTP framing for the daemon.
//!
//! The listener binds the configured endpoint and accepts connections on a
//! background thread. Each connection runs through the same phases:
//! accept, optional TLS handshake, read, dispatch, write. A failure in any
//! phase abandons that connection only.

mod errors;
mod handler;
pub mod http;
mod listener;
#[cfg(test)]
mod test_utils;
mod tls;

pub use self::errors::{ListenerError, TlsSetupError};
pub use self::handler::{ConnectionHandler, ConnectionStream};
pub use self::listener::{ListenerHandle, ServeOptions, SocketListener};
pub use self::tls::load_server_config;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
