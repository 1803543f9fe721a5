//! Per-call context for handlers that ask for it.

use crate::envelope::{AttributeTable, Element, RequestEnvelope};

/// Reserved argument name under which the context travels on the wire side.
///
/// Inbound named arguments with this key are discarded before binding so a
/// client can never forge a context.
pub const CONTEXT_ARGUMENT: &str = "_SOAPContext";

/// Snapshot of the request a context-aware handler may inspect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallContext {
    /// Header elements in document order.
    pub headers: Vec<Element>,
    /// Body elements in document order.
    pub body: Vec<Element>,
    /// Attribute side-table for `headers` and `body`.
    pub attributes: AttributeTable,
    /// Raw request bytes.
    pub raw: Vec<u8>,
    /// Peer description.
    pub peer: String,
    /// Inbound HTTP header lines.
    pub http_headers: Vec<(String, String)>,
    /// `SOAPAction` header value.
    pub soap_action: Option<String>,
}

impl CallContext {
    /// Copies the request material out of an envelope.
    #[must_use]
    pub fn from_envelope(envelope: &RequestEnvelope) -> Self {
        Self {
            headers: envelope.headers.clone(),
            body: envelope.body.clone(),
            attributes: envelope.attributes.clone(),
            raw: envelope.raw.clone(),
            peer: envelope.transport.peer.clone(),
            http_headers: envelope.transport.http_headers.clone(),
            soap_action: envelope.transport.soap_action.clone(),
        }
    }

    /// First inbound HTTP header named `name`, compared case-insensitively.
    #[must_use]
    pub fn http_header(&self, name: &str) -> Option<&str> {
        self.http_headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
