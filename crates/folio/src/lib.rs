//! # Folio - Flat-File Site Engine
//!
//! Folio serves a directory of pages through Jinja templates. Every request
//! runs through a hookable dispatch pipeline, so plugins can rewrite the
//! requested page, answer early, add template variables or post-process the
//! rendered markup.
//!
//! This crate is the facade over two building blocks:
//!
//! - [`folio_dispatch`]: the request pipeline, event bus, configuration and
//!   collaborator contracts
//! - [`folio_render`]: MiniJinja template sets, template discovery, filters
//!
//! and adds what a site needs on top:
//!
//! - [`FlatFileRepository`]: pages read from a content directory, with YAML
//!   front matter
//! - [`PageEngine`]: renders pages through the template named in their
//!   metadata
//! - [`Plugin`] and the built-in [`PageIndex`]
//! - [`App`]: wires it all together
//!
//! ## Quick Start
//!
//! ```rust
//! use folio::{App, Page};
//!
//! let mut app = App::builder()
//!     .config("site_title", "Field Notes")
//!     .template("index", "<h1>{{ site_title }}</h1>{{ content }}")
//!     .page(Page::new("index", "<p>Welcome</p>"))
//!     .page(Page::new("404", "<p>Nothing here</p>"))
//!     .build()?;
//!
//! let response = app.get("/");
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.body(), "<h1>Field Notes</h1><p>Welcome</p>");
//!
//! assert_eq!(app.get("/missing").status(), 404);
//! # Ok::<(), folio::AppError>(())
//! ```
//!
//! ## Hooks
//!
//! Subscribers receive the event record mutably. Setting a `response` ends
//! the request:
//!
//! ```rust
//! use folio::{App, Page, RequestUri, ResponseFactory};
//!
//! let mut app = App::builder()
//!     .page(Page::new("404", "gone"))
//!     .bootstrap(|events, _config| {
//!         events.on::<RequestUri, _>(|event, _cx| {
//!             if event.uri == "health" {
//!                 event.response = Some(ResponseFactory::new("UTF-8").empty());
//!             }
//!             Ok(())
//!         });
//!         Ok(())
//!     })
//!     .build()?;
//!
//! assert_eq!(app.get("/health").status(), 200);
//! # Ok::<(), folio::AppError>(())
//! ```

mod app;
mod engine;
pub mod logging;
mod plugin;
mod repository;

pub use app::{App, AppBuilder, AppError, DEFAULT_LAYOUT};
pub use engine::PageEngine;
pub use plugin::{PageIndex, Plugin};
pub use repository::{parse_page, FlatFileRepository, RepositoryError};

pub use folio_dispatch::{
    http, After404, AfterInitCore, AfterRenderTemplate, AfterResolvePage, BeforeInitTemplate,
    BeforeRenderTemplate, Config, ConfigError, Core, DispatchError, Event, EventBus, EventName,
    HookError, Middleware, MiddlewareChain, Next, Page, PageRepository, Request, RequestContext,
    RequestUri, Response, ResponseExt, ResponseFactory, Router, TemplateEngine, TemplateVars,
};
pub use folio_render::{RenderError, Templates};

// Full access to the building blocks.
pub use folio_dispatch;
pub use folio_render;
