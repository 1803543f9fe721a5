//! Parsed request envelope handed over by the codec.
//!
//! The codec owns XML (or any other wire format); the dispatcher only sees the
//! structured form defined here. Element identity is an explicit
//! [`ElementId`] assigned by the codec, and attribute values live in a
//! side-table keyed by that identity rather than on the elements themselves.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;

use crate::fault::ENVELOPE_NAMESPACE;

/// Identity of one element within a single envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    namespace: Option<String>,
    local: String,
}

impl QualifiedName {
    /// Name without a namespace.
    #[must_use]
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Name within a namespace.
    #[must_use]
    pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Namespace URI, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(formatter, "{{{namespace}}}{}", self.local),
            None => formatter.write_str(&self.local),
        }
    }
}

/// Header or body element as an opaque structured node.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Identity used to key the attribute side-table.
    pub id: ElementId,
    /// Element name.
    pub name: QualifiedName,
    /// Decoded content.
    pub value: Value,
}

/// Attribute side-table: element identity → attribute name → value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    entries: HashMap<ElementId, HashMap<QualifiedName, String>>,
}

impl AttributeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attribute of an element.
    pub fn insert(&mut self, element: ElementId, name: QualifiedName, value: impl Into<String>) {
        self.entries
            .entry(element)
            .or_default()
            .insert(name, value.into());
    }

    /// Looks up an attribute of an element.
    #[must_use]
    pub fn get(&self, element: ElementId, name: &QualifiedName) -> Option<&str> {
        self.entries
            .get(&element)
            .and_then(|attributes| attributes.get(name))
            .map(String::as_str)
    }

    /// `mustUnderstand` attribute in the envelope namespace.
    #[must_use]
    pub fn must_understand(&self, element: ElementId) -> Option<&str> {
        self.get(
            element,
            &QualifiedName::qualified(ENVELOPE_NAMESPACE, "mustUnderstand"),
        )
    }
}

/// Transport-level facts about the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMeta {
    /// Printable description of the peer (`tcp://addr`, `unix`, …).
    pub peer: String,
    /// Inbound HTTP header lines in arrival order.
    pub http_headers: Vec<(String, String)>,
    /// Value of the `SOAPAction` header, if sent.
    pub soap_action: Option<String>,
}

/// One parsed SOAP RPC request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestEnvelope {
    /// Method (body element) name; may contain `.` path separators.
    pub method: String,
    /// Namespace of the method element; `None` means the default namespace.
    pub namespace: Option<String>,
    /// Arguments in document order.
    pub positional: Vec<Value>,
    /// Arguments by name.
    pub named: BTreeMap<QualifiedName, Value>,
    /// Top-level header elements.
    pub headers: Vec<Element>,
    /// Top-level body elements.
    pub body: Vec<Element>,
    /// Attributes of header and body elements.
    pub attributes: AttributeTable,
    /// Raw request bytes.
    pub raw: Vec<u8>,
    /// Transport metadata.
    pub transport: TransportMeta,
}

impl RequestEnvelope {
    /// Minimal envelope for `method` in `namespace`.
    #[must_use]
    pub fn call(namespace: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a named argument.
    #[must_use]
    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(QualifiedName::local(name), value.into());
        self
    }

    /// Adds a header element, flagging it `mustUnderstand="1"` when asked.
    #[must_use]
    pub fn with_header(mut self, name: QualifiedName, value: Value, must_understand: bool) -> Self {
        let id = self.next_element_id();
        if must_understand {
            self.attributes.insert(
                id,
                QualifiedName::qualified(ENVELOPE_NAMESPACE, "mustUnderstand"),
                "1",
            );
        }
        self.headers.push(Element { id, name, value });
        self
    }

    /// Namespace with `None` folded to the empty default namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    /// Method name qualified by its namespace, as used in fault strings.
    #[must_use]
    pub fn qualified_method(&self) -> String {
        match self.namespace() {
            "" => self.method.clone(),
            namespace => format!("{namespace}:{}", self.method),
        }
    }

    fn next_element_id(&self) -> ElementId {
        let highest = self
            .headers
            .iter()
            .chain(&self.body)
            .map(|element| element.id.0)
            .max();
        ElementId(highest.map_or(0, |id| id + 1))
    }
}
