//! JSON rendition of the envelope model.
//!
//! Requests look like:
//!
//! ```json
//! {"method":"Add","namespace":"urn:calc","args":[2,3],
//!  "kwargs":{"{urn:calc}scale":1},
//!  "headers":[{"name":"Token","namespace":"urn:auth","value":"t",
//!              "attributes":[{"namespace":"http://schemas.xmlsoap.org/soap/envelope/",
//!                             "name":"mustUnderstand","value":"1"}]}]}
//! ```
//!
//! Keyword names may carry a namespace in `{uri}local` form. When `body` is
//! absent a single method element carrying `args` is synthesised. Responses
//! are the structured value from [`ResponseEnvelope::to_value`].

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{CodecError, EnvelopeCodec};
use crate::dispatch::ResponseEnvelope;
use crate::envelope::{
    AttributeTable, Element, ElementId, QualifiedName, RequestEnvelope, TransportMeta,
};
use crate::fault::{ENVELOPE_NAMESPACE, Fault};

/// Codec speaking the JSON envelope format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEnvelopeCodec;

impl JsonEnvelopeCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRequest {
    #[serde(default)]
    envelope: Option<String>,
    method: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    kwargs: Map<String, Value>,
    #[serde(default)]
    headers: Vec<WireElement>,
    #[serde(default)]
    body: Option<Vec<WireElement>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireElement {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    attributes: Vec<WireAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireAttribute {
    #[serde(default)]
    namespace: Option<String>,
    name: String,
    value: String,
}

/// Assigns element identities and fills the attribute table.
#[derive(Default)]
struct ElementSink {
    next_id: u64,
    attributes: AttributeTable,
}

impl ElementSink {
    fn push(&mut self, wire: WireElement) -> Element {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        for attribute in wire.attributes {
            self.attributes
                .insert(id, name_from_parts(attribute.namespace, attribute.name), attribute.value);
        }
        Element {
            id,
            name: name_from_parts(wire.namespace, wire.name),
            value: wire.value,
        }
    }

    fn synthesise(&mut self, name: QualifiedName, value: Value) -> Element {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        Element { id, name, value }
    }
}

fn name_from_parts(namespace: Option<String>, local: String) -> QualifiedName {
    match namespace {
        Some(namespace) if !namespace.is_empty() => QualifiedName::qualified(namespace, local),
        _ => QualifiedName::local(local),
    }
}

/// Parses `{uri}local` or a bare local name.
fn parse_key(key: &str) -> QualifiedName {
    key.strip_prefix('{')
        .and_then(|rest| rest.split_once('}'))
        .map_or_else(
            || QualifiedName::local(key),
            |(namespace, local)| QualifiedName::qualified(namespace, local),
        )
}

impl EnvelopeCodec for JsonEnvelopeCodec {
    fn decode(
        &self,
        bytes: &[u8],
        transport: TransportMeta,
    ) -> Result<RequestEnvelope, CodecError> {
        let wire: WireRequest =
            serde_json::from_slice(bytes).map_err(CodecError::from_json_error)?;
        if let Some(uri) = wire.envelope.as_deref()
            && uri != ENVELOPE_NAMESPACE
        {
            return Err(CodecError::Fault(Fault::client(format!(
                "Unsupported envelope namespace {uri}"
            ))));
        }
        if wire.method.is_empty() {
            return Err(CodecError::malformed("method name is empty"));
        }

        let mut sink = ElementSink::default();
        let headers = wire.headers.into_iter().map(|element| sink.push(element)).collect();
        let body = match wire.body {
            Some(elements) => elements.into_iter().map(|element| sink.push(element)).collect(),
            None => {
                let name = name_from_parts(wire.namespace.clone(), wire.method.clone());
                vec![sink.synthesise(name, Value::Array(wire.args.clone()))]
            }
        };
        let named = wire
            .kwargs
            .into_iter()
            .map(|(key, value)| (parse_key(&key), value))
            .collect();

        Ok(RequestEnvelope {
            method: wire.method,
            namespace: wire.namespace,
            positional: wire.args,
            named,
            headers,
            body,
            attributes: sink.attributes,
            raw: bytes.to_vec(),
            transport,
        })
    }

    fn encode(&self, response: &ResponseEnvelope, encoding: &str) -> Result<Vec<u8>, CodecError> {
        let normalised = encoding.to_ascii_lowercase();
        if !matches!(normalised.as_str(), "utf-8" | "utf8") {
            return Err(CodecError::encode(format!(
                "JSON responses are always UTF-8, not {encoding}"
            )));
        }
        serde_json::to_vec(&response.to_value())
            .map_err(|error| CodecError::encode(error.to_string()))
    }
}
