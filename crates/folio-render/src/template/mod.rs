//! MiniJinja templates for page rendering.
//!
//! Templates are ordinary Jinja files living in one or more template
//! directories, optionally overridden by inline strings:
//!
//! ```rust,ignore
//! let mut registry = TemplateRegistry::new();
//! registry.add_template_dir("./templates")?;
//! registry.add_inline("404", "<h1>{{ page.meta.title }}</h1>");
//!
//! let templates = Templates::from_registry(&registry)?;
//! let html = templates.render_named("index", &data)?;
//! ```
//!
//! ## Key Types
//!
//! - [`TemplateRegistry`]: name resolution across inline strings and directories
//! - [`Templates`]: the compiled set, with folio's [filters] registered

mod engine;
pub mod filters;
pub mod registry;

pub use engine::Templates;
pub use filters::register_filters;
pub use registry::{walk_template_dir, TemplateFile, TemplateRegistry, TEMPLATE_EXTENSIONS};
