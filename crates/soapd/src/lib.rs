//! SOAP request-dispatch daemon.
//!
//! The daemon accepts SOAP-RPC calls over HTTP (optionally TLS) on a TCP or
//! Unix socket, resolves the called method against a [`registry::Registry`]
//! of namespaced functions and object trees, binds the request's arguments
//! and invokes the handler. The handler's return value or failure comes back
//! as a SOAP response envelope or fault.
//!
//! Wire parsing stays behind the [`codec::EnvelopeCodec`] seam. The
//! dispatcher only ever sees a decoded [`envelope::RequestEnvelope`] and
//! produces a [`dispatch::ResponseEnvelope`], so an XML codec can replace the
//! bundled [`codec::JsonEnvelopeCodec`] without touching dispatch.
//!
//! Bootstrap follows a fixed order: load configuration, initialise
//! structured telemetry, prepare the socket filesystem and load TLS
//! material. Every stage reports through a [`HealthReporter`] so operators
//! can see where startup stopped.

mod bootstrap;
pub mod codec;
mod context;
pub mod dispatch;
pub mod envelope;
pub mod fault;
mod health;
pub mod registry;
mod shutdown;
pub mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use context::{CONTEXT_ARGUMENT, CallContext};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
