//! Template engine contract.
//!
//! Dispatch does not know any template language. It obtains an engine per
//! request from a [`TemplateEngineFactory`], binds the resolved page to it
//! and asks it for markup. `folio` provides the MiniJinja-backed engine;
//! [`ContentEngine`] is a minimal engine that emits page content verbatim.

use std::rc::Rc;

use thiserror::Error;

use crate::config::Config;
use crate::page::Page;
use crate::vars::TemplateVars;

/// Renders a page to markup.
pub trait TemplateEngine {
    /// A short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Binds the page to render.
    fn set_current_page(&mut self, page: Page);

    /// The bound page, if any.
    fn current_page(&self) -> Option<&Page>;

    /// Renders the bound page with `vars`.
    fn render(&self, vars: &TemplateVars) -> Result<String, TemplateError>;
}

/// Builds a template engine for one request.
pub type TemplateEngineFactory = Rc<dyn Fn(&Config) -> Box<dyn TemplateEngine>>;

/// Errors raised while rendering.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// `render` was called before a page was bound.
    #[error("template engine \"{engine}\" has no current page")]
    NoPage {
        /// Engine name.
        engine: String,
    },

    /// The engine failed to produce markup for a page.
    #[error("failed to render page \"{page_id}\": {message}")]
    Render {
        /// The page being rendered.
        page_id: String,
        /// Engine-specific description.
        message: String,
        /// The underlying engine error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl TemplateError {
    /// Creates a render failure for `page_id`.
    pub fn render(page_id: impl Into<String>, message: impl Into<String>) -> Self {
        TemplateError::Render {
            page_id: page_id.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying error to a render failure.
    pub fn with_source<E>(self, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        match self {
            TemplateError::Render {
                page_id, message, ..
            } => TemplateError::Render {
                page_id,
                message,
                source: Some(err.into()),
            },
            other => other,
        }
    }
}

/// An engine that renders a page's content as-is.
#[derive(Debug, Clone, Default)]
pub struct ContentEngine {
    page: Option<Page>,
}

impl ContentEngine {
    /// Creates an engine with no page bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory producing a fresh `ContentEngine` per request.
    pub fn factory() -> TemplateEngineFactory {
        Rc::new(|_config: &Config| -> Box<dyn TemplateEngine> {
            Box::new(ContentEngine::new())
        })
    }
}

impl TemplateEngine for ContentEngine {
    fn name(&self) -> &str {
        "content"
    }

    fn set_current_page(&mut self, page: Page) {
        self.page = Some(page);
    }

    fn current_page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    fn render(&self, _vars: &TemplateVars) -> Result<String, TemplateError> {
        self.page
            .as_ref()
            .map(|page| page.content().to_string())
            .ok_or_else(|| TemplateError::NoPage {
                engine: self.name().to_string(),
            })
    }
}
