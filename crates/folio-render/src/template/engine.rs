//! Compiled template sets.
//!
//! [`Templates`] owns a MiniJinja environment with folio's filters
//! registered and every template compiled up front, so syntax errors surface
//! when a site loads rather than on the first request that needs the
//! template.

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::error::RenderError;
use crate::template::filters::register_filters;
use crate::template::registry::TemplateRegistry;

/// A set of named, compiled templates.
///
/// Output is HTML-escaped. Values that are already markup must be passed as
/// [`minijinja::Value::from_safe_string`] or piped through `|safe`.
///
/// # Example
///
/// ```rust
/// use folio_render::Templates;
/// use serde_json::json;
///
/// let mut templates = Templates::new();
/// templates.add_template("page", "<h1>{{ title }}</h1>")?;
///
/// let html = templates.render_named("page", json!({"title": "Tom & Jerry"}))?;
/// assert_eq!(html, "<h1>Tom &amp; Jerry</h1>");
/// # Ok::<(), folio_render::RenderError>(())
/// ```
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Creates an empty set with the default filters registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_name| AutoEscape::Html);
        register_filters(&mut env);
        Self { env }
    }

    /// Compiles every template the registry resolves.
    pub fn from_registry(registry: &TemplateRegistry) -> Result<Self, RenderError> {
        let mut templates = Self::new();
        for name in registry.names() {
            let source = registry.get_content(name)?;
            templates.add_template(name, &source)?;
        }
        Ok(templates)
    }

    /// Compiles and adds a named template, replacing any with the same name.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())?;
        Ok(())
    }

    /// Renders a named template with `data`.
    pub fn render_named<S: Serialize>(&self, name: &str, data: S) -> Result<String, RenderError> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(data)?)
    }

    /// Compiles and renders a one-off template string.
    pub fn render_str<S: Serialize>(&self, source: &str, data: S) -> Result<String, RenderError> {
        Ok(self.env.render_str(source, data)?)
    }

    /// Returns `true` if a template named `name` exists.
    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Names of all templates, sorted.
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.env.templates().map(|(name, _)| name).collect();
        names.sort_unstable();
        names
    }

    /// The underlying environment, for registering extra filters or globals.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("templates", &self.template_names())
            .finish()
    }
}
