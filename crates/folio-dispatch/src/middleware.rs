//! Middleware chain.
//!
//! Middleware wraps request processing: each entry receives the request and
//! a [`Next`] handle, and either answers the request itself or delegates by
//! calling [`Next::run`]. The chain is built fresh for every dispatch:
//!
//! ```text
//! dispatch(request)
//!   → middleware[0].process(request, next)
//!     → middleware[1].process(request, next)
//!       → … → Core::process(request, next)
//! ```
//!
//! The core is always the innermost entry and never calls `next`. If some
//! middleware does delegate past the end of the queue, the chain's seed
//! response is returned.

use std::cell::RefCell;
use std::fmt;

use crate::error::DispatchError;
use crate::response::{Request, Response};

/// A request-processing step.
pub trait Middleware {
    /// Processes `request`, optionally delegating to `next`.
    fn process(&self, request: &Request, next: Next<'_>) -> Result<Response, DispatchError>;
}

/// The remainder of the chain after the current middleware.
pub struct Next<'a> {
    stack: &'a [&'a dyn Middleware],
    seed: &'a RefCell<Option<Response>>,
}

impl<'a> Next<'a> {
    /// Passes `request` to the next middleware.
    pub fn run(self, request: &Request) -> Result<Response, DispatchError> {
        match self.stack.split_first() {
            Some((head, rest)) => head.process(
                request,
                Next {
                    stack: rest,
                    seed: self.seed,
                },
            ),
            None => Ok(self.seed.borrow_mut().take().unwrap_or_default()),
        }
    }

    /// Number of middleware left, including the core.
    pub fn remaining(&self) -> usize {
        self.stack.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.stack.len())
            .finish()
    }
}

/// Ordered middleware with a seed response.
pub struct MiddlewareChain {
    middleware: Vec<Box<dyn Middleware>>,
    seed: RefCell<Option<Response>>,
}

impl MiddlewareChain {
    /// Creates an empty chain answering with `seed` when exhausted.
    pub fn new(seed: Response) -> Self {
        Self {
            middleware: Vec::new(),
            seed: RefCell::new(Some(seed)),
        }
    }

    /// Appends middleware; it runs after everything added before it.
    pub fn push<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Inserts middleware at `index`, counted from the outermost entry.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert<M: Middleware + 'static>(&mut self, index: usize, middleware: M) -> &mut Self {
        self.middleware.insert(index, Box::new(middleware));
        self
    }

    /// Number of middleware, not counting the innermost handler.
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Returns `true` if no middleware was added.
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs `request` through the chain with `innermost` at the end.
    pub fn handle(
        &self,
        request: &Request,
        innermost: &dyn Middleware,
    ) -> Result<Response, DispatchError> {
        let mut stack: Vec<&dyn Middleware> =
            self.middleware.iter().map(|m| m.as_ref()).collect();
        stack.push(innermost);
        Next {
            stack: stack.as_slice(),
            seed: &self.seed,
        }
        .run(request)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// Middleware built from a closure.
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Request, Next<'_>) -> Result<Response, DispatchError>,
{
    fn process(&self, request: &Request, next: Next<'_>) -> Result<Response, DispatchError> {
        (self.f)(request, next)
    }
}

/// Wraps a closure as middleware.
///
/// ```rust
/// use folio_dispatch::{middleware_fn, MiddlewareChain, ResponseExt};
/// use http::header::HeaderName;
///
/// let mut chain = MiddlewareChain::new(Default::default());
/// chain.push(middleware_fn(|request, next| {
///     let response = next.run(request)?;
///     Ok(response.with_header(HeaderName::from_static("x-frame-options"), "DENY")?)
/// }));
/// assert_eq!(chain.len(), 1);
/// ```
pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&Request, Next<'_>) -> Result<Response, DispatchError>,
{
    FnMiddleware { f }
}
