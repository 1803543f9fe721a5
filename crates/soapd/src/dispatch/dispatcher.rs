//! Request dispatch: header check, resolution, binding, invocation.
//!
//! Each stage returns `Result<_, Fault>` so the first failure short-circuits
//! the rest. Handler failures other than handler-authored faults, including
//! panics, are reclassified as `Server` faults whose detail follows the
//! configured [`FaultDetail`] policy.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use soap_config::{Config, FaultDetail};
use tracing::{debug, warn};

use super::binder::bind;
use super::headers::check_headers;
use super::response::ResponseEnvelope;
use super::{DISPATCH_TARGET, WIRE_TARGET};
use crate::envelope::RequestEnvelope;
use crate::fault::Fault;
use crate::registry::{Arguments, Handler, HandlerError, Reply, SharedRegistry};

/// Method invoked by the GET branch.
pub const WSDL_METHOD: &str = "wsdl";

/// Error kind reported for a panicking handler.
const PANIC_KIND: &str = "panic";

/// Dispatch switches taken from the daemon configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Enables `_<digits>` ordered arguments.
    pub special_args: bool,
    /// Detail policy for synthesised `Server` faults.
    pub fault_detail: FaultDetail,
    /// Logs the full error chain of failed handlers.
    pub dump_fault_info: bool,
}

impl From<&Config> for DispatchConfig {
    fn from(config: &Config) -> Self {
        Self {
            special_args: config.special_args,
            fault_detail: config.fault_detail,
            dump_fault_info: config.dump.fault_info,
        }
    }
}

/// Turns request envelopes into response envelopes.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: SharedRegistry,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub const fn new(registry: SharedRegistry, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    /// Registry consulted on every dispatch.
    #[must_use]
    pub const fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Dispatches one envelope. Never fails: every failure becomes a fault.
    #[must_use]
    pub fn dispatch(&self, envelope: &RequestEnvelope) -> ResponseEnvelope {
        match self.run(envelope) {
            Ok(reply) => ResponseEnvelope::success(envelope.method.clone(), reply),
            Err(fault) => {
                debug!(
                    target: DISPATCH_TARGET,
                    method = %envelope.qualified_method(),
                    code = %fault.code(),
                    "dispatch produced fault"
                );
                ResponseEnvelope::Fault(fault)
            }
        }
    }

    /// Resolves the envelope's method to a handler.
    ///
    /// # Errors
    ///
    /// Returns a `Client` fault naming the method; the detail says which
    /// lookup step failed.
    pub fn resolve(&self, envelope: &RequestEnvelope) -> Result<Handler, Fault> {
        self.registry
            .resolve(envelope.namespace(), &envelope.method)
            .map_err(|error| {
                Fault::client(format!("No method {} found", envelope.qualified_method()))
                    .with_detail(error.to_string())
            })
    }

    /// Runs the `wsdl` handler registered under an empty namespace.
    ///
    /// Registration maps the empty namespace onto the registry's default
    /// namespace, so the lookup happens there.
    /// Returns `Ok(None)` when nothing is registered. String results are
    /// returned as-is; other values are rendered as JSON text.
    ///
    /// # Errors
    ///
    /// Returns the handler's error when it fails or panics.
    pub fn fetch_wsdl(&self) -> Result<Option<String>, HandlerError> {
        let namespace = self.registry.read().default_namespace().to_owned();
        let Ok(handler) = self.registry.resolve(&namespace, WSDL_METHOD) else {
            return Ok(None);
        };
        let text = match invoke(&handler, Arguments::default())? {
            Reply::Value(Value::String(text)) => text,
            Reply::Value(other) => other.to_string(),
            Reply::Void => String::new(),
        };
        Ok(Some(text))
    }

    fn run(&self, envelope: &RequestEnvelope) -> Result<Reply, Fault> {
        check_headers(envelope, &self.registry.read())?;
        let handler = self.resolve(envelope)?;
        let arguments = bind(&handler, envelope, self.config.special_args).map_err(|error| {
            Fault::client(format!(
                "Invalid arguments for method {}",
                envelope.qualified_method()
            ))
            .with_detail(error.to_string())
        })?;
        invoke(&handler, arguments).map_err(|error| self.classify(envelope, error))
    }

    fn classify(&self, envelope: &RequestEnvelope, error: HandlerError) -> Fault {
        let method = envelope.qualified_method();
        match error {
            HandlerError::Fault(fault) => fault,
            HandlerError::Failed {
                kind,
                message,
                causes,
            } => {
                warn!(
                    target: DISPATCH_TARGET,
                    method = %method,
                    kind = %kind,
                    %message,
                    "handler failed"
                );
                if self.config.dump_fault_info {
                    debug!(
                        target: WIRE_TARGET,
                        method = %method,
                        causes = ?causes,
                        "handler error chain"
                    );
                }
                let fault = Fault::server(format!("Method {method} failed."));
                match render_detail(self.config.fault_detail, &kind, &message, &causes) {
                    Some(detail) => fault.with_detail(detail),
                    None => fault,
                }
            }
        }
    }
}

fn invoke(handler: &Handler, arguments: Arguments) -> Result<Reply, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(arguments)))
        .unwrap_or_else(|payload| Err(HandlerError::message(PANIC_KIND, panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_owned()
    }
}

fn render_detail(
    policy: FaultDetail,
    kind: &str,
    message: &str,
    causes: &[String],
) -> Option<String> {
    match policy {
        FaultDetail::Omit => None,
        FaultDetail::Terse => Some(format!("{kind} {message}")),
        FaultDetail::Full => {
            let mut detail = format!("{kind}: {message}");
            for cause in causes {
                detail.push_str("\ncaused by: ");
                detail.push_str(cause);
            }
            Some(detail)
        }
    }
}
