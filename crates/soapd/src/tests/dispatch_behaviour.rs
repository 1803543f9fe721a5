//! Behavioural tests for SOAP dispatch over a live socket listener.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Map, Value, json};
use soap_config::{DumpSettings, FaultDetail, SocketEndpoint};

use crate::codec::JsonEnvelopeCodec;
use crate::dispatch::{DispatchConfig, Dispatcher, GET_HELP_PAGE, SoapConnectionHandler};
use crate::fault::{ENVELOPE_NAMESPACE, Fault};
use crate::registry::{Handler, HandlerError, Registry, Reply, ServiceObject, SharedRegistry};
use crate::transport::{ListenerHandle, ServeOptions, SocketListener};

type StepResult = Result<(), String>;

/// Parsed HTTP exchange outcome.
#[derive(Debug)]
struct Exchange {
    status_line: String,
    head: String,
    body: String,
}

struct DispatchWorld {
    registry: SharedRegistry,
    config: DispatchConfig,
    calls: HashMap<String, Arc<AtomicUsize>>,
    pending_headers: Vec<Value>,
    soap_action: Option<String>,
    listener: Option<ListenerHandle>,
    address: Option<SocketAddr>,
    exchange: Option<Exchange>,
}

impl DispatchWorld {
    fn new() -> Self {
        Self {
            registry: SharedRegistry::new(Registry::new()),
            config: DispatchConfig::default(),
            calls: HashMap::new(),
            pending_headers: Vec::new(),
            soap_action: None,
            listener: None,
            address: None,
            exchange: None,
        }
    }

    fn register(&self, name: &str, handler: Handler) {
        self.registry.write().register_function("", name, handler);
    }

    /// Starts the listener on first use so earlier steps can adjust the config.
    fn ensure_listening(&mut self) -> SocketAddr {
        if let Some(address) = self.address {
            return address;
        }
        let handler = Arc::new(SoapConnectionHandler::new(
            Dispatcher::new(self.registry.clone(), self.config),
            Arc::new(JsonEnvelopeCodec::new()),
            "UTF-8",
            DumpSettings::default(),
        ));
        let listener =
            SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind listener");
        let address = listener.local_addr().expect("listener address");
        self.listener = Some(
            listener
                .start(handler, ServeOptions::default())
                .expect("start listener"),
        );
        self.address = Some(address);
        address
    }

    fn post(&mut self, mut request: Map<String, Value>) {
        if !self.pending_headers.is_empty() {
            request.insert(
                "headers".to_owned(),
                Value::Array(std::mem::take(&mut self.pending_headers)),
            );
        }
        let body = Value::Object(request).to_string();
        let action = self
            .soap_action
            .as_deref()
            .map(|action| format!("SOAPAction: \"{action}\"\r\n"))
            .unwrap_or_default();
        let raw = format!(
            "POST /soap HTTP/1.0\r\n{action}Content-Length: {}\r\n\r\n{body}",
            body.len()
        );
        self.send(raw.as_bytes());
    }

    fn send(&mut self, request: &[u8]) {
        let address = self.ensure_listening();
        let mut stream = TcpStream::connect(address).expect("connect to listener");
        stream.write_all(request).expect("write request");
        let mut response = String::new();
        stream.read_to_string(&mut response).expect("read response");
        let (head, body) = response
            .split_once("\r\n\r\n")
            .expect("response head terminator");
        let status_line = head.lines().next().unwrap_or_default().to_owned();
        self.exchange = Some(Exchange {
            status_line,
            head: head.to_owned(),
            body: body.to_owned(),
        });
    }

    fn exchange(&self) -> Result<&Exchange, String> {
        self.exchange
            .as_ref()
            .ok_or_else(|| "no request was sent".to_owned())
    }

    fn body_json(&self) -> Result<Value, String> {
        serde_json::from_str(&self.exchange()?.body)
            .map_err(|error| format!("response body is not JSON: {error}"))
    }

    fn fault_field(&self, field: &str) -> Result<Value, String> {
        let body = self.body_json()?;
        body.get("Fault")
            .map(|fault| fault.get(field).cloned().unwrap_or(Value::Null))
            .ok_or_else(|| format!("response is not a fault: {body}"))
    }
}

impl Drop for DispatchWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            drop(handle.join());
        }
    }
}

#[fixture]
fn world() -> RefCell<DispatchWorld> {
    RefCell::new(DispatchWorld::new())
}

/// Strips surrounding double quotes from a step argument.
fn strip_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

fn call(method: &str) -> Map<String, Value> {
    let mut request = Map::new();
    request.insert("method".to_owned(), json!(method));
    request
}

fn parse_numbers(list: &str) -> Result<Vec<Value>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>()
                .map(Value::from)
                .map_err(|error| format!("invalid argument '{item}': {error}"))
        })
        .collect()
}

// Registrations

#[given("special arguments are enabled")]
fn given_special_args(world: &RefCell<DispatchWorld>) {
    world.borrow_mut().config.special_args = true;
}

#[given("the fault detail policy is {policy}")]
fn given_fault_detail(world: &RefCell<DispatchWorld>, policy: String) -> StepResult {
    let policy = strip_quotes(&policy)
        .parse::<FaultDetail>()
        .map_err(|error| format!("invalid policy '{policy}': {error}"))?;
    world.borrow_mut().config.fault_detail = policy;
    Ok(())
}

#[given("a counting function {name} that sums its arguments")]
fn given_sum_function(world: &RefCell<DispatchWorld>, name: String) {
    let name = strip_quotes(&name).to_owned();
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&counter);
    let mut world = world.borrow_mut();
    world.register(
        &name,
        Handler::plain(move |args| {
            seen.fetch_add(1, Ordering::SeqCst);
            let mut total = 0_i64;
            for index in 0..args.positional().len() {
                total += args.arg::<i64>(index)?;
            }
            Ok(Reply::from(json!(total)))
        }),
    );
    world.calls.insert(name, counter);
}

#[given("a function {name} that returns its arguments")]
fn given_echo_function(world: &RefCell<DispatchWorld>, name: String) {
    world.borrow().register(
        strip_quotes(&name),
        Handler::plain(|args| Ok(Reply::from(Value::Array(args.positional().to_vec())))),
    );
}

#[given("a function {name} that returns nothing")]
fn given_void_function(world: &RefCell<DispatchWorld>, name: String) {
    world
        .borrow()
        .register(strip_quotes(&name), Handler::plain(|_| Ok(Reply::Void)));
}

#[given("a function {name} that fails with {kind} and message {message}")]
fn given_failing_function(
    world: &RefCell<DispatchWorld>,
    name: String,
    kind: String,
    message: String,
) {
    let kind = strip_quotes(&kind).to_owned();
    let message = strip_quotes(&message).to_owned();
    world.borrow().register(
        strip_quotes(&name),
        Handler::plain(move |_| Err(HandlerError::message(kind.clone(), message.clone()))),
    );
}

#[given("a function {name} that panics")]
fn given_panicking_function(world: &RefCell<DispatchWorld>, name: String) {
    world.borrow().register(
        strip_quotes(&name),
        Handler::plain(|_| panic!("ledger exploded")),
    );
}

#[given("a function {name} that raises the client fault {string}")]
fn given_fault_function(world: &RefCell<DispatchWorld>, name: String, string: String) {
    let string = strip_quotes(&string).to_owned();
    world.borrow().register(
        strip_quotes(&name),
        Handler::plain(move |_| Err(Fault::client(string.clone()).into())),
    );
}

#[given("a keyword function {name} that greets its name argument")]
fn given_keyword_function(world: &RefCell<DispatchWorld>, name: String) {
    world.borrow().register(
        strip_quotes(&name),
        Handler::keywords(|args| {
            let who: String = args.named_arg("name")?;
            Ok(Reply::from(json!(format!("Hello, {who}"))))
        }),
    );
}

#[given("a context-aware function {name} that reports the SOAP action")]
fn given_context_function(world: &RefCell<DispatchWorld>, name: String) {
    world.borrow().register(
        strip_quotes(&name),
        Handler::with_context(|args| {
            let action = args
                .context()
                .and_then(|context| context.soap_action.clone())
                .unwrap_or_default();
            Ok(Reply::from(json!(action)))
        }),
    );
}

#[given("an object tree exposing {path} that doubles its argument")]
fn given_object_tree(world: &RefCell<DispatchWorld>, path: String) -> StepResult {
    let path = strip_quotes(&path);
    let (object, method) = path
        .split_once('.')
        .ok_or_else(|| format!("expected a dotted path, got '{path}'"))?;
    let tree = ServiceObject::new().with_object(
        object,
        ServiceObject::new().with_method(
            method,
            Handler::plain(|args| Ok(Reply::from(json!(args.arg::<i64>(0)? * 2)))),
        ),
    );
    world.borrow().registry.write().register_object("", tree);
    Ok(())
}

#[given("the header {name} in {namespace} is understood")]
fn given_understood_header(world: &RefCell<DispatchWorld>, name: String, namespace: String) {
    world
        .borrow()
        .registry
        .write()
        .register_header(strip_quotes(&namespace), strip_quotes(&name));
}

#[given("the next request carries a mandatory header {name} in {namespace}")]
fn given_mandatory_header(world: &RefCell<DispatchWorld>, name: String, namespace: String) {
    world.borrow_mut().pending_headers.push(json!({
        "name": strip_quotes(&name),
        "namespace": strip_quotes(&namespace),
        "value": "secret",
        "attributes": [{
            "namespace": ENVELOPE_NAMESPACE,
            "name": "mustUnderstand",
            "value": "1",
        }],
    }));
}

#[given("the next request carries the SOAP action {action}")]
fn given_soap_action(world: &RefCell<DispatchWorld>, action: String) {
    world.borrow_mut().soap_action = Some(strip_quotes(&action).to_owned());
}

// Requests

#[when("a client calls {method} with no arguments")]
fn when_call_without_arguments(world: &RefCell<DispatchWorld>, method: String) {
    world.borrow_mut().post(call(strip_quotes(&method)));
}

#[when("a client calls {method} with arguments {list}")]
fn when_call_with_arguments(
    world: &RefCell<DispatchWorld>,
    method: String,
    list: String,
) -> StepResult {
    let mut request = call(strip_quotes(&method));
    let args = parse_numbers(strip_quotes(&list))?;
    request.insert("args".to_owned(), Value::Array(args));
    world.borrow_mut().post(request);
    Ok(())
}

#[when("a client calls {method} with named arguments {pairs}")]
fn when_call_with_named(
    world: &RefCell<DispatchWorld>,
    method: String,
    pairs: String,
) -> StepResult {
    let mut kwargs = Map::new();
    for pair in strip_quotes(&pairs).split(',').map(str::trim) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
        let value = value
            .parse::<i64>()
            .map_or_else(|_| json!(value), Value::from);
        kwargs.insert(key.to_owned(), value);
    }
    let mut request = call(strip_quotes(&method));
    request.insert("kwargs".to_owned(), Value::Object(kwargs));
    world.borrow_mut().post(request);
    Ok(())
}

#[when("a client fetches {path} with GET")]
fn when_client_gets(world: &RefCell<DispatchWorld>, path: String) {
    let request = format!("GET {} HTTP/1.0\r\n\r\n", strip_quotes(&path));
    world.borrow_mut().send(request.as_bytes());
}

// Outcomes

#[then("the response status is {status}")]
fn then_status(world: &RefCell<DispatchWorld>, status: String) -> StepResult {
    let world = world.borrow();
    let exchange = world.exchange()?;
    let expected = format!("HTTP/1.0 {} ", strip_quotes(&status));
    if exchange.status_line.starts_with(&expected) {
        Ok(())
    } else {
        Err(format!("expected status {status}, got '{}'", exchange.status_line))
    }
}

#[then("the result is {value}")]
fn then_result(world: &RefCell<DispatchWorld>, value: String) -> StepResult {
    let expected: Value = serde_json::from_str(&value)
        .map_err(|error| format!("expected value '{value}' is not JSON: {error}"))?;
    let body = world.borrow().body_json()?;
    let actual = body
        .as_object()
        .and_then(|object| object.values().next())
        .and_then(|element| element.get("Result"))
        .ok_or_else(|| format!("no result in {body}"))?;
    if *actual == expected {
        Ok(())
    } else {
        Err(format!("expected result {expected}, got {actual}"))
    }
}

#[then("the response element {element} carries no result")]
fn then_void(world: &RefCell<DispatchWorld>, element: String) -> StepResult {
    let body = world.borrow().body_json()?;
    let mut expected = Map::new();
    expected.insert(strip_quotes(&element).to_owned(), Value::Null);
    let expected = Value::Object(expected);
    if body == expected {
        Ok(())
    } else {
        Err(format!("expected {expected}, got {body}"))
    }
}

#[then("the fault code is {code}")]
fn then_fault_code(world: &RefCell<DispatchWorld>, code: String) -> StepResult {
    let actual = world.borrow().fault_field("faultcode")?;
    if actual == json!(strip_quotes(&code)) {
        Ok(())
    } else {
        Err(format!("expected fault code {code}, got {actual}"))
    }
}

#[then("the fault string is {string}")]
fn then_fault_string(world: &RefCell<DispatchWorld>, string: String) -> StepResult {
    let actual = world.borrow().fault_field("faultstring")?;
    if actual == json!(strip_quotes(&string)) {
        Ok(())
    } else {
        Err(format!("expected fault string {string}, got {actual}"))
    }
}

#[then("the fault detail is {detail}")]
fn then_fault_detail(world: &RefCell<DispatchWorld>, detail: String) -> StepResult {
    let actual = world.borrow().fault_field("detail")?;
    if actual == json!(strip_quotes(&detail)) {
        Ok(())
    } else {
        Err(format!("expected fault detail {detail}, got {actual}"))
    }
}

#[then("the fault has no detail")]
fn then_no_detail(world: &RefCell<DispatchWorld>) -> StepResult {
    match world.borrow().fault_field("detail")? {
        Value::Null => Ok(()),
        other => Err(format!("unexpected fault detail {other}")),
    }
}

#[then("the function {name} ran {count} times")]
fn then_call_count(world: &RefCell<DispatchWorld>, name: String, count: String) -> StepResult {
    let expected = count
        .parse::<usize>()
        .map_err(|error| format!("invalid count '{count}': {error}"))?;
    let world = world.borrow();
    let name = strip_quotes(&name);
    let actual = world
        .calls
        .get(name)
        .ok_or_else(|| format!("'{name}' is not a counting function"))?
        .load(Ordering::SeqCst);
    if actual == expected {
        Ok(())
    } else {
        Err(format!("'{name}' ran {actual} times, expected {expected}"))
    }
}

#[then("the response is the WSDL help page")]
fn then_help_page(world: &RefCell<DispatchWorld>) -> StepResult {
    let world = world.borrow();
    let exchange = world.exchange()?;
    if exchange.head.contains("content-type: text/html") && exchange.body == GET_HELP_PAGE {
        Ok(())
    } else {
        Err(format!("unexpected GET response: {exchange:?}"))
    }
}

#[scenario(path = "tests/features/soap_dispatch.feature")]
fn soap_dispatch(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}
