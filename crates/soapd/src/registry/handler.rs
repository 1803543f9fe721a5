//! Handler variants and the call shape they receive.

use std::any;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::context::CallContext;
use crate::fault::Fault;

/// Outcome of a handler invocation.
pub type HandlerResult = Result<Reply, HandlerError>;

/// Shared callable behind every handler.
pub type HandlerFn = Arc<dyn Fn(Arguments) -> HandlerResult + Send + Sync>;

/// Value returned by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Payload wrapped as `{Result: value}` in the response.
    Value(Value),
    /// Void marker: the response element carries no `Result` field.
    Void,
}

impl Reply {
    /// Serialises any value into a reply.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Failed`] when serialisation fails.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        serde_json::to_value(value)
            .map(Self::Value)
            .map_err(HandlerError::failed)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Errors a handler may return.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler-authored fault, rendered unchanged.
    #[error(transparent)]
    Fault(#[from] Fault),
    /// Any other failure; the dispatcher turns it into a `Server` fault.
    #[error("{kind}: {message}")]
    Failed {
        /// Short name of the error type.
        kind: String,
        /// Display text of the error.
        message: String,
        /// Display text of each `source()` in the chain, outermost first.
        causes: Vec<String>,
    },
}

impl HandlerError {
    /// Captures an error value, its type name, and its source chain.
    pub fn failed<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self::Failed {
            kind: any::type_name::<E>().to_owned(),
            message: error.to_string(),
            causes,
        }
    }

    /// Failure described by a kind and a message.
    pub fn message(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }
}

/// Arguments bound for one invocation.
///
/// Every invocation receives a fresh value; nothing here is shared between
/// calls.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
    context: Option<CallContext>,
}

impl Arguments {
    pub(crate) const fn new(
        positional: Vec<Value>,
        named: BTreeMap<String, Value>,
        context: Option<CallContext>,
    ) -> Self {
        Self {
            positional,
            named,
            context,
        }
    }

    /// Ordered arguments.
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Named arguments.
    #[must_use]
    pub const fn named(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    /// Per-call context, present only for handlers that asked for it.
    #[must_use]
    pub const fn context(&self) -> Option<&CallContext> {
        self.context.as_ref()
    }

    /// Deserialises the positional argument at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Failed`] when the argument is missing or has
    /// the wrong shape.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, HandlerError> {
        let value = self.positional.get(index).ok_or_else(|| {
            HandlerError::message(
                "TypeError",
                format!(
                    "expected at least {} positional arguments, got {}",
                    index + 1,
                    self.positional.len()
                ),
            )
        })?;
        T::deserialize(value).map_err(HandlerError::failed)
    }

    /// Deserialises the named argument `name`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Failed`] when the argument is missing or has
    /// the wrong shape.
    pub fn named_arg<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        let value = self.named.get(name).ok_or_else(|| {
            HandlerError::message("TypeError", format!("missing keyword argument '{name}'"))
        })?;
        T::deserialize(value).map_err(HandlerError::failed)
    }
}

/// Calling-convention flags of a configured handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodSignature {
    /// Receive the named mapping instead of positional arguments.
    pub keywords: bool,
    /// Receive a [`CallContext`].
    pub context: bool,
}

/// Registered handler.
#[derive(Clone)]
pub enum Handler {
    /// Called with positional arguments only.
    Plain(HandlerFn),
    /// Called according to its [`MethodSignature`].
    Configured {
        /// The callable.
        func: HandlerFn,
        /// Calling-convention flags.
        signature: MethodSignature,
    },
}

impl Handler {
    /// Wraps a closure as a plain handler.
    pub fn plain<F>(func: F) -> Self
    where
        F: Fn(Arguments) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(func))
    }

    /// Wraps a closure with explicit calling-convention flags.
    pub fn configured<F>(signature: MethodSignature, func: F) -> Self
    where
        F: Fn(Arguments) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Configured {
            func: Arc::new(func),
            signature,
        }
    }

    /// Wraps a closure that takes keyword arguments.
    pub fn keywords<F>(func: F) -> Self
    where
        F: Fn(Arguments) -> HandlerResult + Send + Sync + 'static,
    {
        Self::configured(
            MethodSignature {
                keywords: true,
                context: false,
            },
            func,
        )
    }

    /// Wraps a closure that takes positional arguments plus a context.
    pub fn with_context<F>(func: F) -> Self
    where
        F: Fn(Arguments) -> HandlerResult + Send + Sync + 'static,
    {
        Self::configured(
            MethodSignature {
                keywords: false,
                context: true,
            },
            func,
        )
    }

    /// Same callable, switched to keyword calling.
    #[must_use]
    pub fn into_keywords(self) -> Self {
        match self {
            Self::Plain(func) => Self::Configured {
                func,
                signature: MethodSignature {
                    keywords: true,
                    context: false,
                },
            },
            Self::Configured { func, signature } => Self::Configured {
                func,
                signature: MethodSignature {
                    keywords: true,
                    ..signature
                },
            },
        }
    }

    /// Calling-convention flags; `None` for plain handlers.
    #[must_use]
    pub const fn signature(&self) -> Option<MethodSignature> {
        match self {
            Self::Plain(_) => None,
            Self::Configured { signature, .. } => Some(*signature),
        }
    }

    /// Whether the handler asked for a [`CallContext`].
    #[must_use]
    pub const fn wants_context(&self) -> bool {
        matches!(
            self,
            Self::Configured {
                signature: MethodSignature { context: true, .. },
                ..
            }
        )
    }

    /// Whether both handlers share the same callable.
    #[must_use]
    pub fn same_callable(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.func(), other.func())
    }

    pub(crate) fn invoke(&self, arguments: Arguments) -> HandlerResult {
        (self.func())(arguments)
    }

    const fn func(&self) -> &HandlerFn {
        match self {
            Self::Plain(func) | Self::Configured { func, .. } => func,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => formatter.write_str("Handler::Plain"),
            Self::Configured { signature, .. } => formatter
                .debug_struct("Handler::Configured")
                .field("keywords", &signature.keywords)
                .field("context", &signature.context)
                .finish(),
        }
    }
}
