//! Application assembly.
//!
//! [`AppBuilder`] gathers configuration, content, templates and extensions,
//! and [`App`] wraps the resulting [`Core`].
//!
//! ```rust,no_run
//! use folio::App;
//!
//! let mut app = App::builder()
//!     .config_file("site.yaml")
//!     .content_dir("content")
//!     .templates_dir("templates")
//!     .config("site_title", "Field Notes")
//!     .build()?;
//!
//! let response = app.get("/about");
//! println!("{} {}", response.status(), response.body());
//! # Ok::<(), folio::AppError>(())
//! ```
//!
//! Explicit [`config`](AppBuilder::config) values override the config file.
//! Without a template named like `default_template`, a minimal HTML layout
//! is registered under that name.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use folio_dispatch::http::{self, StatusCode};
use folio_dispatch::{
    BootstrapFn, Config, ConfigError, Core, DispatchError, EventBus, MiddlewareChain,
    MiddlewareSetupFn, Page, Request, Response, ResponseFactory,
};
use folio_render::{RenderError, TemplateRegistry, Templates};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::PageEngine;
use crate::plugin::{PageIndex, Plugin};
use crate::repository::{FlatFileRepository, RepositoryError};

/// Layout registered when no template provides the default one.
pub const DEFAULT_LAYOUT: &str = "<!DOCTYPE html>\n\
<html>\n\
<head>\n\
<meta charset=\"{{ charset }}\">\n\
<title>{% if meta.title %}{{ meta.title }} | {% endif %}{{ site_title }}</title>\n\
</head>\n\
<body>\n\
{{ content }}\n\
</body>\n\
</html>\n";

/// Errors raised while building an [`App`].
#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        /// The config file.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Content could not be loaded.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Templates could not be loaded or compiled.
    #[error("failed to load templates: {0}")]
    Render(#[from] RenderError),
}

/// A configured site.
pub struct App {
    core: Core,
}

impl App {
    /// Starts building an app.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Dispatches `request`, returning fatal errors.
    pub fn dispatch(&mut self, request: &Request) -> Result<Response, DispatchError> {
        self.core.dispatch(request)
    }

    /// Dispatches `request`, reporting fatal errors as a `500` response.
    pub fn serve(&mut self, request: &Request) -> Response {
        self.core.serve(request)
    }

    /// Serves a `GET` request for `path` (which may carry a query).
    ///
    /// A path that is not a valid URI is answered with `400`.
    pub fn get(&mut self, path: &str) -> Response {
        match http::Request::get(path).body(String::new()) {
            Ok(request) => self.serve(&request),
            Err(err) => {
                warn!(path, error = %err, "Rejecting invalid request path");
                ResponseFactory::new(self.core.config().charset()).error(StatusCode::BAD_REQUEST)
            }
        }
    }

    /// The dispatch core.
    pub fn core(&self) -> &Core {
        &self.core
    }

    /// The dispatch core, mutably.
    pub fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App").field("core", &self.core).finish()
    }
}

/// Builder for [`App`].
///
/// Bootstrap callbacks and plugins run in the order they were added, after
/// the built-in page index.
#[derive(Default)]
pub struct AppBuilder {
    config_file: Option<PathBuf>,
    config_values: Vec<(String, Value)>,
    content_dir: Option<PathBuf>,
    template_dirs: Vec<PathBuf>,
    inline_templates: Vec<(String, String)>,
    pages: Vec<Page>,
    page_index: bool,
    bootstrap: Vec<BootstrapFn>,
    middleware: Vec<MiddlewareSetupFn>,
}

impl AppBuilder {
    /// Creates a builder with the page index enabled.
    pub fn new() -> Self {
        Self {
            page_index: true,
            ..Self::default()
        }
    }

    /// Reads settings from a YAML file.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Sets a configuration value.
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config_values.push((key.into(), value.into()));
        self
    }

    /// Loads pages from a content directory.
    pub fn content_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_dir = Some(path.into());
        self
    }

    /// Loads templates from a directory. May be called more than once.
    pub fn templates_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_dirs.push(path.into());
        self
    }

    /// Adds a template from a string, overriding any file of that name.
    pub fn template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.inline_templates.push((name.into(), source.into()));
        self
    }

    /// Adds a page, replacing any loaded page with the same id.
    pub fn page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    /// Enables or disables the `pages` template variable.
    pub fn page_index(mut self, enabled: bool) -> Self {
        self.page_index = enabled;
        self
    }

    /// Registers a plugin.
    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.bootstrap.push(plugin_bootstrap(Rc::new(plugin)));
        self
    }

    /// Registers a bootstrap callback.
    pub fn bootstrap<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut EventBus, &mut Config) -> Result<(), DispatchError> + 'static,
    {
        self.bootstrap.push(Rc::new(callback));
        self
    }

    /// Registers a middleware-setup callback.
    pub fn middleware<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut MiddlewareChain, &EventBus, &Config) -> Result<(), DispatchError> + 'static,
    {
        self.middleware.push(Rc::new(callback));
        self
    }

    /// Loads everything and assembles the app.
    pub fn build(self) -> Result<App, AppError> {
        let mut config = match &self.config_file {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| AppError::Io {
                    path: path.clone(),
                    source,
                })?;
                Config::from_yaml_str(&source)?
            }
            None => Config::new(),
        };
        for (key, value) in self.config_values {
            config.set(key, value)?;
        }

        let mut repository = match &self.content_dir {
            Some(dir) => FlatFileRepository::from_config(dir, &config)?,
            None => FlatFileRepository::new(),
        };
        for page in self.pages {
            repository.insert(page);
        }

        let mut registry = TemplateRegistry::new();
        for dir in &self.template_dirs {
            registry.add_template_dir(dir)?;
        }
        for (name, source) in self.inline_templates {
            registry.add_inline(name, source);
        }
        if !registry.contains(config.default_template()) {
            debug!(
                template = config.default_template(),
                "Registering built-in default layout"
            );
            registry.add_inline(config.default_template(), DEFAULT_LAYOUT);
        }
        let templates = Rc::new(Templates::from_registry(&registry)?);

        debug!(
            pages = repository.len(),
            templates = registry.len(),
            plugins = self.bootstrap.len(),
            "Built app"
        );

        let index = self
            .page_index
            .then(|| PageIndex::new(repository.visible_pages()));
        let mut core = Core::new(config, repository, PageEngine::factory(templates));
        if let Some(index) = index {
            let callback = plugin_bootstrap(Rc::new(index));
            core.add_bootstrap(move |events, config| callback(events, config));
        }
        for callback in self.bootstrap {
            core.add_bootstrap(move |events, config| callback(events, config));
        }
        for setup in self.middleware {
            core.add_middleware(move |chain, events, config| setup(chain, events, config));
        }
        Ok(App { core })
    }
}

fn plugin_bootstrap(plugin: Rc<dyn Plugin>) -> BootstrapFn {
    Rc::new(move |events: &mut EventBus, config: &mut Config| {
        debug!(plugin = plugin.name(), "Registering plugin");
        plugin.register(events, config)
    })
}
