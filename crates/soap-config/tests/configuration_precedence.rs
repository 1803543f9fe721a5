//! Behavioural coverage for configuration layering.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use soap_config::{
    Config, FaultDetail, SocketEndpoint, default_listen_endpoint, default_log_filter,
    default_log_format,
};

const LISTEN_VAR: &str = "SOAPD_LISTEN";

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    temp_dir: TempDir,
    cli_args: RefCell<Vec<OsString>>,
    previous_listen: Option<OsString>,
    loaded: RefCell<Option<Config>>,
    error: RefCell<Option<String>>,
    _env_guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let guard = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let previous_listen = std::env::var_os(LISTEN_VAR);
        // Environment mutation is `unsafe` in edition 2024; the guard keeps
        // scenarios from racing and `Drop` restores the previous value.
        unsafe { std::env::remove_var(LISTEN_VAR) };
        Self {
            temp_dir: TempDir::new().expect("create temporary directory"),
            cli_args: RefCell::new(vec![OsString::from("soapd")]),
            previous_listen,
            loaded: RefCell::new(None),
            error: RefCell::new(None),
            _env_guard: guard,
        }
    }

    fn write_config(&self, endpoint: &SocketEndpoint) {
        let path = self.temp_dir.path().join("soapd.toml");
        let toml = match endpoint {
            SocketEndpoint::Tcp { host, port } => format!(
                "listen = {{ transport = \"tcp\", host = \"{host}\", port = {port} }}\n"
            ),
            SocketEndpoint::Unix { path } => {
                format!("listen = {{ transport = \"unix\", path = \"{path}\" }}\n")
            }
        };
        fs::write(&path, toml).expect("write configuration");

        let mut args = self.cli_args.borrow_mut();
        args.push(OsString::from("--config-path"));
        args.push(path.into_os_string());
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() || self.error.borrow().is_some() {
            return;
        }
        let args = self.cli_args.borrow().clone();
        match Config::load_from_iter(args) {
            Ok(config) => *self.loaded.borrow_mut() = Some(config),
            Err(error) => *self.error.borrow_mut() = Some(error.to_string()),
        }
    }

    fn loaded_config(&self) -> Config {
        self.load();
        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }
        self.loaded
            .borrow()
            .clone()
            .expect("configuration was not loaded")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        match self.previous_listen.take() {
            Some(value) => unsafe { std::env::set_var(LISTEN_VAR, value) },
            None => unsafe { std::env::remove_var(LISTEN_VAR) },
        }
    }
}

fn parse_endpoint(socket: &str) -> SocketEndpoint {
    socket
        .trim_matches('"')
        .parse()
        .unwrap_or_else(|error| panic!("invalid socket '{socket}': {error}"))
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("a configuration file setting the listen endpoint to \"{socket}\"")]
fn given_configuration_file(harness: &Harness, socket: String) {
    harness.write_config(&parse_endpoint(&socket));
}

#[given("the environment overrides the listen endpoint to \"{socket}\"")]
fn given_environment_override(harness: &Harness, socket: String) {
    let _ = harness;
    unsafe { std::env::set_var(LISTEN_VAR, socket.trim_matches('"')) };
}

#[when("the CLI sets the listen endpoint to \"{socket}\"")]
fn when_cli_override(harness: &Harness, socket: String) {
    let mut args = harness.cli_args.borrow_mut();
    args.push(OsString::from("--listen"));
    args.push(OsString::from(socket.trim_matches('"')));
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration resolves the listen endpoint to \"{socket}\"")]
fn then_resolved_endpoint(harness: &Harness, socket: String) {
    let config = harness.loaded_config();
    assert_eq!(config.listen(), &parse_endpoint(&socket));
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.loaded_config();
    assert_eq!(config.listen(), &default_listen_endpoint());
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.fault_detail, FaultDetail::Terse);
    assert!(!config.special_args);
}

#[scenario(path = "tests/features/configuration_precedence.feature")]
fn configuration_precedence(#[from(harness)] harness: Harness) {
    let _ = harness;
}
