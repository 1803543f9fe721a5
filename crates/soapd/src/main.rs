use std::process::ExitCode;
use std::sync::Arc;

use serde_json::Value;
use soap_config::ConfigError;
use soapd::codec::JsonEnvelopeCodec;
use soapd::registry::{Handler, Reply, SharedRegistry};
use soapd::{
    BootstrapError, ShutdownSignal, StructuredHealthReporter, SystemConfigLoader,
    SystemShutdownSignal, bootstrap_with,
};
use tracing::error;

const MAIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::main");

fn main() -> ExitCode {
    let daemon = match bootstrap_with(&SystemConfigLoader, Arc::new(StructuredHealthReporter)) {
        Ok(daemon) => daemon,
        Err(BootstrapError::Configuration {
            source: ConfigError::Cli(error),
        }) => error.exit(),
        // Already reported through the health reporter.
        Err(_) => return ExitCode::FAILURE,
    };

    let mut registry = daemon.registry();
    registry.register_function(
        "",
        "echo",
        Handler::plain(|args| Ok(Reply::from(Value::Array(args.positional().to_vec())))),
    );
    let registry = SharedRegistry::from(registry);

    let handle = match daemon.serve(registry, Arc::new(JsonEnvelopeCodec::new())) {
        Ok(handle) => handle,
        Err(_) => return ExitCode::FAILURE,
    };

    let waited = SystemShutdownSignal.wait();
    handle.shutdown();
    if let Err(join_error) = handle.join() {
        error!(target: MAIN_TARGET, error = %join_error, "listener thread failed");
        return ExitCode::FAILURE;
    }
    match waited {
        Ok(()) => ExitCode::SUCCESS,
        Err(wait_error) => {
            error!(target: MAIN_TARGET, error = %wait_error, "shutdown signal wait failed");
            ExitCode::FAILURE
        }
    }
}
