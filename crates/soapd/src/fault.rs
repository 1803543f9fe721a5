//! SOAP fault values.
//!
//! A [`Fault`] is terminal: once any stage produces one, the dispatcher stops
//! and the renderer emits it in place of a result. Faults double as the error
//! type of every dispatch stage so the stages compose with `?`.

use std::fmt;

use thiserror::Error;

/// Prefix bound to the SOAP 1.1 envelope namespace in fault codes.
pub const ENVELOPE_PREFIX: &str = "SOAP-ENV";

/// SOAP 1.1 envelope namespace URI.
pub const ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Category half of a fault code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCategory {
    /// The request could not be resolved or bound.
    Client,
    /// A resolved handler failed while running.
    Server,
    /// A mandatory header element was not understood.
    MustUnderstand,
}

impl FaultCategory {
    /// Canonical spelling used in fault codes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "Client",
            Self::Server => "Server",
            Self::MustUnderstand => "MustUnderstand",
        }
    }
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Two-part fault code, rendered as `<prefix>:<category>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FaultCode {
    prefix: String,
    category: FaultCategory,
}

impl FaultCode {
    /// Code in the envelope namespace.
    #[must_use]
    pub fn envelope(category: FaultCategory) -> Self {
        Self {
            prefix: ENVELOPE_PREFIX.to_owned(),
            category,
        }
    }

    /// Code with a caller-chosen prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>, category: FaultCategory) -> Self {
        Self {
            prefix: prefix.into(),
            category,
        }
    }

    /// Prefix half of the code.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Category half of the code.
    #[must_use]
    pub const fn category(&self) -> FaultCategory {
        self.category
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.prefix, self.category)
    }
}

/// SOAP fault: code, human-readable string, and optional detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {string}")]
pub struct Fault {
    code: FaultCode,
    string: String,
    detail: Option<String>,
}

impl Fault {
    /// Builds a fault without detail.
    #[must_use]
    pub fn new(code: FaultCode, string: impl Into<String>) -> Self {
        Self {
            code,
            string: string.into(),
            detail: None,
        }
    }

    /// `SOAP-ENV:Client` fault.
    #[must_use]
    pub fn client(string: impl Into<String>) -> Self {
        Self::new(FaultCode::envelope(FaultCategory::Client), string)
    }

    /// `SOAP-ENV:Server` fault.
    #[must_use]
    pub fn server(string: impl Into<String>) -> Self {
        Self::new(FaultCode::envelope(FaultCategory::Server), string)
    }

    /// `SOAP-ENV:MustUnderstand` fault.
    #[must_use]
    pub fn must_understand(string: impl Into<String>) -> Self {
        Self::new(FaultCode::envelope(FaultCategory::MustUnderstand), string)
    }

    /// Attaches a detail string, replacing any previous one.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Fault code.
    #[must_use]
    pub const fn code(&self) -> &FaultCode {
        &self.code
    }

    /// Shorthand for the category of the code.
    #[must_use]
    pub const fn category(&self) -> FaultCategory {
        self.code.category
    }

    /// Human-readable fault string.
    #[must_use]
    pub fn string(&self) -> &str {
        &self.string
    }

    /// Optional detail.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}
