//! Test suites for the SOAP dispatch daemon.

mod dispatch_behaviour;
mod support;
