//! Test harness utilities for the daemon behavioural suites.

mod config_loader;
mod reporter;
mod world;

pub use reporter::HealthEvent;
pub use world::{TestWorld, world};
