//! Response rendering.
//!
//! A successful call renders as a single `<method>Response` element. A plain
//! value is wrapped as `{Result: value}`; the void marker renders the element
//! empty. Faults replace the whole body.

use http::StatusCode;
use serde_json::{Map, Value, json};

use crate::fault::Fault;
use crate::registry::Reply;

/// HTTP status for a successful call.
pub const STATUS_OK: StatusCode = StatusCode::OK;

/// HTTP status for every fault.
pub const STATUS_FAULT: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Field wrapping a non-void result.
pub const RESULT_FIELD: &str = "Result";

/// Suffix appended to the method name to form the response element.
pub const RESPONSE_SUFFIX: &str = "Response";

/// Rendered content of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The handler returned the void marker.
    Void,
    /// The handler returned a value.
    Result(Value),
}

impl From<Reply> for Payload {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Value(value) => Self::Result(value),
            Reply::Void => Self::Void,
        }
    }
}

/// Outcome of dispatching one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// The handler completed.
    Success {
        /// Method name as received, used for the response element.
        method: String,
        /// Handler output.
        payload: Payload,
    },
    /// Any stage failed.
    Fault(Fault),
}

impl ResponseEnvelope {
    /// Success response for `method`.
    #[must_use]
    pub fn success(method: impl Into<String>, reply: Reply) -> Self {
        Self::Success {
            method: method.into(),
            payload: reply.into(),
        }
    }

    /// HTTP status carried by this response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Success { .. } => STATUS_OK,
            Self::Fault(_) => STATUS_FAULT,
        }
    }

    /// Fault, when this response carries one.
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            Self::Success { .. } => None,
        }
    }

    /// Name of the response element for a success.
    #[must_use]
    pub fn element_name(&self) -> Option<String> {
        match self {
            Self::Success { method, .. } => Some(format!("{method}{RESPONSE_SUFFIX}")),
            Self::Fault(_) => None,
        }
    }

    /// Structured body used by codecs.
    ///
    /// Successes become `{"<method>Response": {"Result": v}}` or
    /// `{"<method>Response": null}` for void. Faults become
    /// `{"Fault": {"faultcode", "faultstring", "detail"?}}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success { method, payload } => {
                let content = match payload {
                    Payload::Void => Value::Null,
                    Payload::Result(value) => json!({ RESULT_FIELD: value }),
                };
                let mut body = Map::new();
                body.insert(format!("{method}{RESPONSE_SUFFIX}"), content);
                Value::Object(body)
            }
            Self::Fault(fault) => {
                let mut content = Map::new();
                content.insert("faultcode".to_owned(), json!(fault.code().to_string()));
                content.insert("faultstring".to_owned(), json!(fault.string()));
                if let Some(detail) = fault.detail() {
                    content.insert("detail".to_owned(), json!(detail));
                }
                json!({ "Fault": content })
            }
        }
    }
}

impl From<Fault> for ResponseEnvelope {
    fn from(fault: Fault) -> Self {
        Self::Fault(fault)
    }
}
