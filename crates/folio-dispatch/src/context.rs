//! Per-request state shared between subscribers.
//!
//! A fresh [`RequestContext`] is created for every request the core
//! processes and handed, mutably, to every subscriber of every event in that
//! request. It carries the state collaborators need to find later in the
//! pipeline:
//!
//! | Field | Set by | Read by |
//! |-------|--------|---------|
//! | `router` | the core, before any event | templates and subscribers building URLs |
//! | `template_vars` | subscribers, then the core's merge | the template engine |
//! | `extensions` | subscribers | other subscribers |
//!
//! Nothing in it outlives the request, so concurrent requests handled by
//! separate [`Core`](crate::Core) calls never observe each other's state.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::router::Router;
use crate::vars::TemplateVars;

/// Type-keyed container for arbitrary subscriber state.
///
/// # Example
///
/// ```rust
/// use folio_dispatch::Extensions;
///
/// struct RequestTimer { started_ms: u64 }
///
/// let mut extensions = Extensions::new();
/// extensions.insert(RequestTimer { started_ms: 12 });
///
/// let timer = extensions.get_required::<RequestTimer>()?;
/// assert_eq!(timer.started_ms, 12);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any>>,
}

impl Extensions {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the value of the same type it replaced.
    pub fn insert<T: 'static>(&mut self, val: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(val))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns the value of type `T`, if present.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Returns the value of type `T` mutably, if present.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Returns the value of type `T` or an error naming the missing type.
    pub fn get_required<T: 'static>(&self) -> Result<&T, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "extension missing: type {} not found in request context",
                std::any::type_name::<T>()
            )
        })
    }

    /// Removes the value of type `T`, returning it.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns `true` if a value of type `T` is present.
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}

/// State threaded through one request.
#[derive(Default)]
pub struct RequestContext {
    /// Router bound to the current request.
    pub router: Option<Rc<dyn Router>>,

    /// Variables accumulated for the template engine.
    pub template_vars: TemplateVars,

    /// Free-form state for subscribers.
    pub extensions: Extensions,
}

impl RequestContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the router bound to this request.
    pub fn router(&self) -> Option<&dyn Router> {
        self.router.as_deref()
    }

    /// Builds the URL of a page through the request's router.
    pub fn url_for_page(&self, page_id: &str) -> Option<String> {
        self.router().map(|router| router.url_for_page(page_id))
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("has_router", &self.router.is_some())
            .field("template_vars", &self.template_vars)
            .field("extensions", &self.extensions)
            .finish()
    }
}
