//! # Folio Render
//!
//! Template loading and rendering for folio sites, built on MiniJinja.
//!
//! This crate knows nothing about requests or pages. It turns a directory of
//! Jinja templates into a compiled [`Templates`] set and renders named
//! templates with serialisable data. The `folio` crate adapts it to the
//! dispatch core's template-engine contract.
//!
//! ## Quick Start
//!
//! ```rust
//! use folio_render::{TemplateRegistry, Templates};
//! use serde_json::json;
//!
//! let mut registry = TemplateRegistry::new();
//! registry.add_inline("index", "<title>{{ site_title }}</title>{{ body | excerpt(2) }}");
//!
//! let templates = Templates::from_registry(&registry)?;
//! let html = templates.render_named(
//!     "index",
//!     json!({"site_title": "Notes", "body": "one two three"}),
//! )?;
//! assert_eq!(html, "<title>Notes</title>one two…");
//! # Ok::<(), folio_render::RenderError>(())
//! ```
//!
//! ## Modules
//!
//! - [`template`]: registry, compiled set and filters
//! - [`file_loader`]: extension-matched directory walking, shared with content loading

mod error;
pub mod file_loader;
pub mod template;

pub use error::RenderError;
pub use file_loader::{walk_dir, LoadError, LoadedFile};
pub use template::{
    register_filters, walk_template_dir, TemplateFile, TemplateRegistry, Templates,
    TEMPLATE_EXTENSIONS,
};

// Hosts build contexts against the same MiniJinja version.
pub use minijinja::{context, Value};
