//! MiniJinja-backed template engine for the dispatch core.
//!
//! [`PageEngine`] renders the bound page through a named template from a
//! shared [`Templates`] set. The template is the page's `template` meta
//! entry, falling back to the configured `default_template`.
//!
//! Templates see the merged template variables plus:
//!
//! | Variable | Value |
//! |----------|-------|
//! | `page`, `current_page` | the page (`id`, `content`, `meta`) |
//! | `content` | the page body, marked safe |
//! | `meta` | the page metadata |

use std::rc::Rc;

use folio_dispatch::{
    Config, Page, TemplateEngine, TemplateEngineFactory, TemplateError, TemplateVars,
};
use folio_render::{context, Templates, Value};

/// Renders pages with MiniJinja templates.
#[derive(Debug, Clone)]
pub struct PageEngine {
    templates: Rc<Templates>,
    default_template: String,
    page: Option<Page>,
}

impl PageEngine {
    /// Creates an engine rendering with `templates`.
    pub fn new(templates: Rc<Templates>, default_template: impl Into<String>) -> Self {
        Self {
            templates,
            default_template: default_template.into(),
            page: None,
        }
    }

    /// A factory building one engine per request, sharing `templates`.
    pub fn factory(templates: Rc<Templates>) -> TemplateEngineFactory {
        Rc::new(move |config: &Config| -> Box<dyn TemplateEngine> {
            Box::new(PageEngine::new(
                Rc::clone(&templates),
                config.default_template(),
            ))
        })
    }

    /// The template the bound page renders with.
    pub fn template_name(&self) -> Option<&str> {
        self.page
            .as_ref()
            .map(|page| page.template().unwrap_or(&self.default_template))
    }
}

impl TemplateEngine for PageEngine {
    fn name(&self) -> &str {
        "minijinja"
    }

    fn set_current_page(&mut self, page: Page) {
        self.page = Some(page);
    }

    fn current_page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    fn render(&self, vars: &TemplateVars) -> Result<String, TemplateError> {
        let page = self.page.as_ref().ok_or_else(|| TemplateError::NoPage {
            engine: self.name().to_string(),
        })?;
        let template = page.template().unwrap_or(&self.default_template);
        if !self.templates.has_template(template) {
            return Err(TemplateError::render(
                page.id(),
                format!("template \"{template}\" does not exist"),
            ));
        }

        let page_value = Value::from_serialize(page);
        let data = context! {
            page => page_value.clone(),
            current_page => page_value,
            content => Value::from_safe_string(page.content().to_string()),
            meta => Value::from_serialize(page.meta()),
            ..Value::from_serialize(vars)
        };
        self.templates
            .render_named(template, data)
            .map_err(|err| TemplateError::render(page.id(), err.to_string()).with_source(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> Rc<Templates> {
        let mut templates = Templates::new();
        templates
            .add_template("index", "<title>{{ site_title }}</title>{{ content }}")
            .unwrap();
        templates
            .add_template("wide", "<h1>{{ meta.title }}</h1><main>{{ page.content | safe }}</main>")
            .unwrap();
        Rc::new(templates)
    }

    fn vars() -> TemplateVars {
        [("site_title", "Notes & Co")].into_iter().collect()
    }

    #[test]
    fn test_renders_default_template() {
        let mut engine = PageEngine::new(templates(), "index");
        engine.set_current_page(Page::new("about", "<p>Hi</p>"));
        assert_eq!(engine.template_name(), Some("index"));
        assert_eq!(
            engine.render(&vars()).unwrap(),
            "<title>Notes &amp; Co</title><p>Hi</p>"
        );
    }

    #[test]
    fn test_page_template_meta_wins() {
        let mut engine = PageEngine::new(templates(), "index");
        engine.set_current_page(
            Page::new("about", "<p>Hi</p>")
                .with_meta("title", "About")
                .with_meta("template", "wide"),
        );
        assert_eq!(
            engine.render(&vars()).unwrap(),
            "<h1>About</h1><main><p>Hi</p></main>"
        );
    }

    #[test]
    fn test_missing_template_is_render_error() {
        let mut engine = PageEngine::new(templates(), "index");
        engine.set_current_page(Page::new("about", "").with_meta("template", "nope"));
        let err = engine.render(&vars()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to render page \"about\": template \"nope\" does not exist"
        );
    }

    #[test]
    fn test_render_without_page() {
        let engine = PageEngine::new(templates(), "index");
        assert!(matches!(
            engine.render(&vars()),
            Err(TemplateError::NoPage { .. })
        ));
    }

    #[test]
    fn test_factory_uses_configured_default() {
        let mut config = Config::new();
        config.set("default_template", "wide").unwrap();
        let factory = PageEngine::factory(templates());
        let mut engine = factory(&config);
        engine.set_current_page(Page::new("x", "body").with_meta("title", "X"));
        assert_eq!(engine.render(&vars()).unwrap(), "<h1>X</h1><main>body</main>");
    }
}
