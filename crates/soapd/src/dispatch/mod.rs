//! SOAP RPC dispatch.
//!
//! A request envelope passes through four stages, each able to end the
//! request with a fault:
//!
//! 1. header contract check (`MustUnderstand` fault);
//! 2. resolution against the registry (`Client` fault);
//! 3. argument binding (`Client` fault);
//! 4. invocation (handler fault passed through, anything else a `Server`
//!    fault).
//!
//! The outcome is a [`ResponseEnvelope`]: a `<method>Response` element or a
//! fault, with HTTP status 200 or 500 respectively.

mod binder;
mod dispatcher;
mod handler;
mod headers;
mod response;

pub use self::binder::{BindError, BindingMode, bind, partition_special};
pub use self::dispatcher::{DispatchConfig, Dispatcher, WSDL_METHOD};
pub use self::handler::{GET_HELP_PAGE, SoapConnectionHandler};
pub use self::response::{
    Payload, RESPONSE_SUFFIX, RESULT_FIELD, ResponseEnvelope, STATUS_FAULT, STATUS_OK,
};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Tracing target for wire-level dumps.
pub(crate) const WIRE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::wire");
