//! Method registry.
//!
//! Two maps feed resolution: a function registry keyed by
//! (namespace, method name) and an object registry keyed by namespace whose
//! roots are [`ServiceObject`] trees walked by dotted paths. The function
//! registry always wins. A third set records the header elements the engine
//! understands, which the header contract checker consults.
//!
//! Registration is append-or-overwrite. The empty namespace is replaced by the
//! configured default namespace when registering, never when resolving.

mod errors;
mod handler;
mod service;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use errors::ResolutionError;
pub use handler::{
    Arguments, Handler, HandlerError, HandlerFn, HandlerResult, MethodSignature, Reply,
};
pub use service::{PATH_SEPARATOR, ServiceNode, ServiceObject};

/// Prefix marking a member as private to the service.
const PRIVATE_PREFIX: char = '_';

/// Namespace, function, object, and header registrations.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: HashMap<String, HashMap<String, Handler>>,
    objects: HashMap<String, ServiceObject>,
    understood_headers: HashSet<(String, String)>,
    default_namespace: String,
}

impl Registry {
    /// Creates an empty registry whose default namespace is empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry that files empty-namespace registrations
    /// under `namespace`.
    #[must_use]
    pub fn with_default_namespace(namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Namespace substituted for the empty namespace at registration.
    #[must_use]
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Registers `handler` as `name` in `namespace`; the last write wins.
    ///
    /// Returns the handler previously registered under the same key.
    pub fn register_function(
        &mut self,
        namespace: &str,
        name: impl Into<String>,
        handler: Handler,
    ) -> Option<Handler> {
        let namespace = self.effective_namespace(namespace);
        self.functions
            .entry(namespace)
            .or_default()
            .insert(name.into(), handler)
    }

    /// Installs `object` as the root object of `namespace`.
    ///
    /// Returns the object it replaced.
    pub fn register_object(
        &mut self,
        namespace: &str,
        object: ServiceObject,
    ) -> Option<ServiceObject> {
        let namespace = self.effective_namespace(namespace);
        self.objects.insert(namespace, object)
    }

    /// Registers every public top-level method of `object` as a keyword
    /// function in `namespace`.
    ///
    /// Methods whose names start with `_` are skipped. Returns the number of
    /// functions registered.
    pub fn register_keyword_functions(&mut self, namespace: &str, object: &ServiceObject) -> usize {
        let public: Vec<_> = object
            .methods()
            .filter(|(name, _)| !name.starts_with(PRIVATE_PREFIX))
            .map(|(name, handler)| (name.to_owned(), handler.clone().into_keywords()))
            .collect();
        let count = public.len();
        for (name, handler) in public {
            self.register_function(namespace, name, handler);
        }
        count
    }

    /// Marks the header element `(namespace, name)` as understood.
    pub fn register_header(&mut self, namespace: &str, name: impl Into<String>) {
        self.understood_headers
            .insert((namespace.to_owned(), name.into()));
    }

    /// Whether the header element `(namespace, name)` is understood.
    #[must_use]
    pub fn understands(&self, namespace: &str, name: &str) -> bool {
        self.understood_headers
            .contains(&(namespace.to_owned(), name.to_owned()))
    }

    /// Resolves `(namespace, method)` to a handler.
    ///
    /// The function registry is consulted first. Otherwise the namespace's
    /// root object is walked segment by segment along `method`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] describing why no handler was found.
    pub fn resolve(&self, namespace: &str, method: &str) -> Result<&Handler, ResolutionError> {
        if let Some(handler) = self
            .functions
            .get(namespace)
            .and_then(|functions| functions.get(method))
        {
            return Ok(handler);
        }
        let root = self
            .objects
            .get(namespace)
            .ok_or_else(|| ResolutionError::unknown_namespace(namespace))?;
        root.lookup(method)
    }

    fn effective_namespace(&self, namespace: &str) -> String {
        if namespace.is_empty() {
            self.default_namespace.clone()
        } else {
            namespace.to_owned()
        }
    }
}

/// Registry shared between the serving threads and registration code.
///
/// Dispatch takes the read lock only long enough to clone a handler out;
/// registration takes the write lock. A poisoned lock is recovered because no
/// registry operation leaves the maps half-updated.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    /// Wraps a registry for sharing.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Read access to the registry.
    pub fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the registry.
    pub fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves and clones the handler so the lock is released before it
    /// runs.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] describing why no handler was found.
    pub fn resolve(&self, namespace: &str, method: &str) -> Result<Handler, ResolutionError> {
        self.read().resolve(namespace, method).cloned()
    }

    /// Whether the header element `(namespace, name)` is understood.
    #[must_use]
    pub fn understands(&self, namespace: &str, name: &str) -> bool {
        self.read().understands(namespace, name)
    }
}

impl From<Registry> for SharedRegistry {
    fn from(registry: Registry) -> Self {
        Self::new(registry)
    }
}
