//! Service objects: trees of named methods reached by dotted paths.

use std::collections::BTreeMap;

use super::errors::ResolutionError;
use super::handler::Handler;

/// Separator between path segments in a method name.
pub const PATH_SEPARATOR: char = '.';

/// Member of a [`ServiceObject`].
#[derive(Debug, Clone)]
pub enum ServiceNode {
    /// Nested object, walked by the next segment.
    Object(ServiceObject),
    /// Callable leaf.
    Method(Handler),
}

/// Root or nested object registered for a namespace.
#[derive(Debug, Clone, Default)]
pub struct ServiceObject {
    members: BTreeMap<String, ServiceNode>,
}

impl ServiceObject {
    /// Creates an object with no members.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method member.
    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.insert(name, ServiceNode::Method(handler));
        self
    }

    /// Adds a nested object member.
    #[must_use]
    pub fn with_object(mut self, name: impl Into<String>, object: Self) -> Self {
        self.insert(name, ServiceNode::Object(object));
        self
    }

    /// Inserts or replaces a member.
    pub fn insert(&mut self, name: impl Into<String>, node: ServiceNode) -> Option<ServiceNode> {
        self.members.insert(name.into(), node)
    }

    /// Direct member named `name`.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&ServiceNode> {
        self.members.get(name)
    }

    /// Top-level methods in name order.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &Handler)> {
        self.members.iter().filter_map(|(name, node)| match node {
            ServiceNode::Method(handler) => Some((name.as_str(), handler)),
            ServiceNode::Object(_) => None,
        })
    }

    /// Walks `path` segment by segment and returns the terminal method.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::MissingSegment`] when a segment is absent
    /// (or the walk tries to descend into a method), and
    /// [`ResolutionError::NotCallable`] when the path ends on an object.
    pub fn lookup(&self, path: &str) -> Result<&Handler, ResolutionError> {
        let mut current = Current::Object(self);
        for segment in path.split(PATH_SEPARATOR) {
            let Current::Object(object) = current else {
                return Err(ResolutionError::missing_segment(segment, path));
            };
            current = match object.member(segment) {
                Some(ServiceNode::Object(child)) => Current::Object(child),
                Some(ServiceNode::Method(handler)) => Current::Method(handler),
                None => return Err(ResolutionError::missing_segment(segment, path)),
            };
        }
        match current {
            Current::Method(handler) => Ok(handler),
            Current::Object(_) => Err(ResolutionError::not_callable(path)),
        }
    }
}

enum Current<'a> {
    Object(&'a ServiceObject),
    Method(&'a Handler),
}
