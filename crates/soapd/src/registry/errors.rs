//! Error types for method resolution.

use thiserror::Error;

/// Reasons a (namespace, method) pair did not resolve to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Neither registry has anything for the namespace.
    #[error("no service registered for namespace '{namespace}'")]
    UnknownNamespace { namespace: String },

    /// A path segment was not found while walking the object tree.
    #[error("object has no member '{segment}' (path '{path}')")]
    MissingSegment { segment: String, path: String },

    /// The path ended on an object rather than a method.
    #[error("'{path}' is not callable")]
    NotCallable { path: String },
}

impl ResolutionError {
    /// Creates an unknown namespace error.
    pub fn unknown_namespace(namespace: impl Into<String>) -> Self {
        Self::UnknownNamespace {
            namespace: namespace.into(),
        }
    }

    /// Creates a missing segment error.
    pub fn missing_segment(segment: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MissingSegment {
            segment: segment.into(),
            path: path.into(),
        }
    }

    /// Creates a not-callable error.
    pub fn not_callable(path: impl Into<String>) -> Self {
        Self::NotCallable { path: path.into() }
    }
}
