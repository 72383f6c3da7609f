//! # Folio Dispatch
//!
//! The request-dispatch core of the folio flat-file site engine.
//!
//! Given an HTTP request, [`Core`] resolves the requested page, renders it
//! and builds the response. Extensions steer every step through a typed
//! event bus whose subscribers receive a mutable record and may answer the
//! request early by filling in its `response` field.
//!
//! ## Pipeline
//!
//! ```text
//! dispatch(request)
//!   bootstrap callbacks → lock config → middleware setup
//!   → middleware chain → Core::process
//!       after_init_core
//!       request_uri → lookup → 301 to canonical id | not-found page + after_404
//!       after_resolve_page
//!       before_init_template → engine → before_render_template → render
//!       after_render_template
//!   → 200 / 404 HTML response
//! ```
//!
//! ## Collaborators
//!
//! The core consumes narrow contracts so hosts can swap any of them:
//!
//! - [`PageRepository`]: page lookup and canonicalisation ([`MemoryRepository`] is bundled)
//! - [`Router`]: request path ↔ page identifier ([`PathRouter`] is the default)
//! - [`TemplateEngine`]: page → markup ([`ContentEngine`] emits content verbatim)
//! - [`ResponseFactory`]: the responses the core builds
//!
//! ## Errors
//!
//! All stages return [`DispatchError`]. Use [`Core::serve`] to turn an
//! unrecovered error into a `500` response instead.

mod config;
mod context;
mod dispatcher;
mod error;
mod hooks;
mod middleware;
mod page;
mod response;
mod router;
mod template;
mod vars;

pub use crate::config::{
    Config, ConfigError, BASE_URL, CHARSET, CONTENT_EXTENSION, DEFAULT_TEMPLATE, NOT_FOUND_PAGE,
    SITE_TITLE, TEMPLATE_VARS,
};
pub use crate::context::{Extensions, RequestContext};
pub use crate::dispatcher::{BootstrapFn, Core, CoreState, MiddlewareSetupFn, RouterFactory};
pub use crate::error::DispatchError;
pub use crate::hooks::{
    After404, AfterInitCore, AfterRenderTemplate, AfterResolvePage, BeforeInitTemplate,
    BeforeRenderTemplate, Event, EventBus, EventName, HookError, RequestUri, ShortCircuit,
    UnknownEvent,
};
pub use crate::middleware::{middleware_fn, FnMiddleware, Middleware, MiddlewareChain, Next};
pub use crate::page::{lookup_candidates, MemoryRepository, Page, PageNotFound, PageRepository};
pub use crate::response::{Request, Response, ResponseExt, ResponseFactory};
pub use crate::router::{PathRouter, Router, INDEX_PAGE};
pub use crate::template::{ContentEngine, TemplateEngine, TemplateEngineFactory, TemplateError};
pub use crate::vars::TemplateVars;

// Re-exported so hosts build requests and statuses against the same version.
pub use http;
