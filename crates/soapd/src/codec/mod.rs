//! Envelope codec seam.
//!
//! The dispatcher never touches wire bytes. A codec turns the HTTP body into
//! a [`RequestEnvelope`] and a [`ResponseEnvelope`] back into bytes. An XML
//! codec plugs in here; the crate ships [`JsonEnvelopeCodec`], which the
//! daemon binary and the tests use.

mod json;

use thiserror::Error;

use crate::dispatch::ResponseEnvelope;
use crate::envelope::{RequestEnvelope, TransportMeta};
use crate::fault::Fault;

pub use json::JsonEnvelopeCodec;

/// Errors raised while decoding or encoding envelopes.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The codec rejected the envelope with a SOAP fault; it is rendered to
    /// the client as-is.
    #[error("envelope rejected: {0}")]
    Fault(Fault),

    /// The body could not be decoded.
    #[error("malformed envelope: {message}")]
    Malformed {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The response could not be encoded.
    #[error("failed to encode response: {message}")]
    Encode { message: String },
}

impl CodecError {
    /// Creates a malformed envelope error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed envelope error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}

/// Wire format of request and response envelopes.
pub trait EnvelopeCodec: Send + Sync {
    /// Decodes a request body.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Fault`] when the envelope is well-formed but
    /// unacceptable, and [`CodecError::Malformed`] otherwise.
    fn decode(&self, body: &[u8], transport: TransportMeta)
    -> Result<RequestEnvelope, CodecError>;

    /// Encodes a response in `encoding`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] when the response cannot be produced in
    /// the requested encoding.
    fn encode(&self, response: &ResponseEnvelope, encoding: &str) -> Result<Vec<u8>, CodecError>;
}
