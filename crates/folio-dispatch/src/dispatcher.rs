//! The dispatch core.
//!
//! [`Core`] ties the collaborators together. A dispatch runs through a short
//! linear state machine:
//!
//! ```text
//! Idle → Bootstrapped → ConfigLocked → Ready
//! ```
//!
//! 1. Bootstrap callbacks run in registration order against a fresh
//!    [`EventBus`] and a copy of the [`Config`], which replaces the original
//!    once every callback has succeeded.
//! 2. The configuration is locked.
//! 3. A fresh [`MiddlewareChain`] is built and every middleware-setup
//!    callback may add to it.
//! 4. The chain handles the request with the core as its innermost entry.
//!
//! Processing itself is three stages: page resolution, the render pipeline
//! and the final HTML response. Every stage publishes events, and every
//! event carrying a `response` field can end the request early.
//!
//! Dispatching twice re-runs the whole sequence. The bus is rebuilt from the
//! callbacks each time, so subscribers are never registered twice, and
//! re-locking is a no-op. A bootstrap callback that calls
//! [`Config::set`] fails on the second dispatch; use
//! [`Config::set_default`] for values that only need to be present.

use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

use http::StatusCode;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::hooks::{
    After404, AfterInitCore, AfterRenderTemplate, AfterResolvePage, BeforeInitTemplate,
    BeforeRenderTemplate, EventBus, EventName, RequestUri,
};
use crate::middleware::{Middleware, MiddlewareChain, Next};
use crate::page::{Page, PageRepository};
use crate::response::{Request, Response, ResponseExt, ResponseFactory};
use crate::router::{PathRouter, Router};
use crate::template::TemplateEngineFactory;

/// Callback run at the start of every dispatch.
pub type BootstrapFn = Rc<dyn Fn(&mut EventBus, &mut Config) -> Result<(), DispatchError>>;

/// Callback that adds middleware to the chain of a dispatch.
pub type MiddlewareSetupFn =
    Rc<dyn Fn(&mut MiddlewareChain, &EventBus, &Config) -> Result<(), DispatchError>>;

/// Builds the router for a request.
pub type RouterFactory = Rc<dyn Fn(&Request, &Config) -> Rc<dyn Router>>;

/// Where the core is in its dispatch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    /// Nothing has run yet.
    Idle,
    /// Bootstrap callbacks have run.
    Bootstrapped,
    /// The configuration is locked.
    ConfigLocked,
    /// The middleware chain is built and requests are being handled.
    Ready,
}

/// The request-dispatch core.
///
/// ```rust
/// use folio_dispatch::{Config, ContentEngine, Core, MemoryRepository, Page, RequestUri};
///
/// let repository = MemoryRepository::new()
///     .with_page(Page::new("index", "<h1>Home</h1>"))
///     .with_page(Page::new("404", "<h1>Not here</h1>"));
///
/// let mut core = Core::new(Config::new(), repository, ContentEngine::factory());
/// core.add_bootstrap(|events, _config| {
///     events.on::<RequestUri, _>(|event, _cx| {
///         if event.uri == "home" {
///             event.uri = "index".into();
///         }
///         Ok(())
///     });
///     Ok(())
/// });
///
/// let request = http::Request::get("/home").body(String::new())?;
/// let response = core.dispatch(&request)?;
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.body(), "<h1>Home</h1>");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Core {
    config: Config,
    events: EventBus,
    repository: Rc<dyn PageRepository>,
    template_engine: TemplateEngineFactory,
    router_factory: RouterFactory,
    bootstrap: Vec<BootstrapFn>,
    middleware: Vec<MiddlewareSetupFn>,
    state: CoreState,
}

impl Core {
    /// Creates a core over `repository`, rendering with engines from
    /// `template_engine`.
    pub fn new<R>(config: Config, repository: R, template_engine: TemplateEngineFactory) -> Self
    where
        R: PageRepository + 'static,
    {
        Self::with_shared_repository(config, Rc::new(repository), template_engine)
    }

    /// Creates a core over a repository the caller keeps a handle to.
    pub fn with_shared_repository(
        config: Config,
        repository: Rc<dyn PageRepository>,
        template_engine: TemplateEngineFactory,
    ) -> Self {
        Self {
            config,
            events: EventBus::new(),
            repository,
            template_engine,
            router_factory: Rc::new(|request: &Request, config: &Config| -> Rc<dyn Router> {
                Rc::new(PathRouter::from_request(request, config.base_url()))
            }),
            bootstrap: Vec::new(),
            middleware: Vec::new(),
            state: CoreState::Idle,
        }
    }

    /// Replaces the default [`PathRouter`].
    pub fn with_router_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Request, &Config) -> Rc<dyn Router> + 'static,
    {
        self.router_factory = Rc::new(factory);
        self
    }

    /// Registers a bootstrap callback.
    pub fn add_bootstrap<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut EventBus, &mut Config) -> Result<(), DispatchError> + 'static,
    {
        self.bootstrap.push(Rc::new(callback));
        self
    }

    /// Registers a middleware-setup callback.
    pub fn add_middleware<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut MiddlewareChain, &EventBus, &Config) -> Result<(), DispatchError> + 'static,
    {
        self.middleware.push(Rc::new(callback));
        self
    }

    /// Runs every bootstrap callback against a fresh event bus and a copy of
    /// the configuration.
    ///
    /// Both replace the current ones only if every callback succeeds.
    pub fn bootstrap(&mut self) -> Result<(), DispatchError> {
        let mut events = EventBus::new();
        let mut config = self.config.clone();
        for callback in &self.bootstrap {
            callback(&mut events, &mut config)?;
        }
        debug!(
            callbacks = self.bootstrap.len(),
            events = ?events,
            "Bootstrap complete"
        );
        self.events = events;
        self.config = config;
        self.state = CoreState::Bootstrapped;
        Ok(())
    }

    /// Bootstraps, locks the configuration, builds the middleware chain and
    /// runs `request` through it.
    pub fn dispatch(&mut self, request: &Request) -> Result<Response, DispatchError> {
        self.bootstrap()?;
        self.config.lock();
        self.state = CoreState::ConfigLocked;

        let mut chain = MiddlewareChain::new(ResponseFactory::new(self.config.charset()).empty());
        for setup in &self.middleware {
            setup(&mut chain, &self.events, &self.config)?;
        }
        self.state = CoreState::Ready;

        debug!(
            method = %request.method(),
            uri = %request.uri(),
            middleware = chain.len(),
            "Dispatching request"
        );
        chain.handle(request, &*self)
    }

    /// Like [`dispatch`](Self::dispatch), but reports errors as a response
    /// with [`DispatchError::status`].
    pub fn serve(&mut self, request: &Request) -> Response {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => {
                error!(uri = %request.uri(), error = %err, "Dispatch failed");
                ResponseFactory::new(self.config.charset()).error(err.status())
            }
        }
    }

    /// Current position in the dispatch sequence.
    pub fn state(&self) -> CoreState {
        self.state
    }

    /// The configuration store.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configuration store, mutably.
    ///
    /// Writes fail once a dispatch has locked it.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// The event bus built by the last bootstrap.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn resolve_page(
        &self,
        router: &dyn Router,
        factory: &ResponseFactory,
        cx: &mut RequestContext,
    ) -> Result<ControlFlow<Response, Page>, DispatchError> {
        let mut request_uri = RequestUri::new(router.current_page_id());
        if let Some(response) = self.events.trigger_for_response(&mut request_uri, cx)? {
            info!(event = %EventName::RequestUri, uri = %request_uri.uri, "Short-circuited");
            return Ok(ControlFlow::Break(response));
        }
        let page_id = request_uri.uri;

        let page = match self.repository.find_by_path(&page_id) {
            Ok(page) if page.id() != page_id => {
                let location = router.url_for_page(page.id());
                info!(
                    requested = %page_id,
                    canonical = %page.id(),
                    %location,
                    "Redirecting to canonical page"
                );
                let response = factory.redirect(&location, StatusCode::MOVED_PERMANENTLY)?;
                return Ok(ControlFlow::Break(response));
            }
            Ok(page) => page,
            Err(miss) => {
                let not_found = self.config.not_found_page();
                info!(page_id = %miss.page_id, not_found_page = not_found, "Page not found");
                let page = self.repository.find_by_path(not_found).map_err(|source| {
                    DispatchError::NotFoundPageMissing {
                        page_id: not_found.to_string(),
                        source,
                    }
                })?;
                self.events.trigger(&mut After404, cx)?;
                page
            }
        };

        let mut resolved = AfterResolvePage {
            page_id,
            page,
            response: None,
        };
        if let Some(response) = self.events.trigger_for_response(&mut resolved, cx)? {
            info!(event = %EventName::AfterResolvePage, page_id = %resolved.page_id, "Short-circuited");
            return Ok(ControlFlow::Break(response));
        }
        Ok(ControlFlow::Continue(resolved.page))
    }

    fn render_page(
        &self,
        page: Page,
        cx: &mut RequestContext,
    ) -> Result<ControlFlow<Response, String>, DispatchError> {
        self.events.trigger(&mut BeforeInitTemplate, cx)?;
        let engine = (self.template_engine)(&self.config);

        // Values contributed by subscribers win over configuration defaults.
        cx.template_vars.merge_defaults(self.config.template_vars());

        let mut before = BeforeRenderTemplate {
            template_engine: engine,
            response: None,
        };
        if let Some(response) = self.events.trigger_for_response(&mut before, cx)? {
            info!(event = %EventName::BeforeRenderTemplate, page_id = %page.id(), "Short-circuited");
            return Ok(ControlFlow::Break(response));
        }

        let mut engine = before.template_engine;
        debug!(engine = engine.name(), page_id = %page.id(), "Rendering page");
        engine.set_current_page(page);
        let output = engine.render(&cx.template_vars)?;

        let mut after = AfterRenderTemplate {
            template_engine: engine,
            output,
        };
        self.events.trigger(&mut after, cx)?;
        Ok(ControlFlow::Continue(after.output))
    }
}

impl Middleware for Core {
    fn process(&self, request: &Request, _next: Next<'_>) -> Result<Response, DispatchError> {
        let factory = ResponseFactory::new(self.config.charset());
        let router = (self.router_factory)(request, &self.config);
        let mut cx = RequestContext::new();
        cx.router = Some(Rc::clone(&router));

        let mut init = AfterInitCore {
            charset: factory.charset().to_string(),
            prepared: factory.empty(),
            response: None,
        };
        if let Some(response) = self.events.trigger_for_response(&mut init, &mut cx)? {
            info!(event = %EventName::AfterInitCore, "Short-circuited");
            return Ok(response);
        }

        let page = match self.resolve_page(router.as_ref(), &factory, &mut cx)? {
            ControlFlow::Break(response) => return Ok(response),
            ControlFlow::Continue(page) => page,
        };
        let status = if page.id() == self.config.not_found_page() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        };

        let output = match self.render_page(page, &mut cx)? {
            ControlFlow::Break(response) => return Ok(response),
            ControlFlow::Continue(output) => output,
        };
        Ok(factory.html(output)?.with_status(status))
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("events", &self.events)
            .field("bootstrap", &self.bootstrap.len())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemoryRepository;
    use crate::template::ContentEngine;

    fn core() -> Core {
        let repository = MemoryRepository::new()
            .with_page(Page::new("index", "home"))
            .with_page(Page::new("404", "missing"));
        Core::new(Config::new(), repository, ContentEngine::factory())
    }

    fn get(path: &str) -> Request {
        http::Request::get(path).body(String::new()).unwrap()
    }

    #[test]
    fn test_state_machine() {
        let mut core = core();
        assert_eq!(core.state(), CoreState::Idle);

        core.bootstrap().unwrap();
        assert_eq!(core.state(), CoreState::Bootstrapped);
        assert!(!core.config().is_locked());

        core.dispatch(&get("/")).unwrap();
        assert_eq!(core.state(), CoreState::Ready);
        assert!(core.config().is_locked());
    }

    #[test]
    fn test_bootstrap_callbacks_run_in_order() {
        let mut core = core();
        core.add_bootstrap(|_events, config| {
            config.set("trail", "a")?;
            Ok(())
        });
        core.add_bootstrap(|_events, config| {
            let trail = format!("{}b", config.get_str("trail").unwrap_or_default());
            config.set("trail", trail)?;
            Ok(())
        });
        core.bootstrap().unwrap();
        assert_eq!(core.config().get_str("trail"), Some("ab"));
    }

    #[test]
    fn test_bootstrap_rebuilds_bus() {
        let mut core = core();
        core.add_bootstrap(|events, _config| {
            events.on::<After404, _>(|_, _| Ok(()));
            Ok(())
        });
        core.bootstrap().unwrap();
        core.bootstrap().unwrap();
        assert_eq!(core.events().subscriber_count(EventName::After404), 1);
    }

    #[test]
    fn test_failed_bootstrap_keeps_previous_bus() {
        let mut core = core();
        core.add_bootstrap(|events, config| {
            events.on::<After404, _>(|_, _| Ok(()));
            config.set("stamp", 1)?;
            Ok(())
        });
        core.dispatch(&get("/")).unwrap();

        let err = core.bootstrap().unwrap_err();
        assert!(matches!(err, DispatchError::Config(_)));
        assert_eq!(core.events().subscriber_count(EventName::After404), 1);
    }

    #[test]
    fn test_failed_bootstrap_discards_config_writes() {
        let mut core = core();
        core.add_bootstrap(|_events, config| {
            config.set("site_title", "Half done")?;
            Ok(())
        });
        core.add_bootstrap(|_events, _config| Err(anyhow::anyhow!("plugin broke").into()));

        assert!(core.bootstrap().is_err());
        assert_eq!(core.config().get_str("site_title"), Some("Folio"));
        assert_eq!(core.state(), CoreState::Idle);
    }

    #[test]
    fn test_config_mut_before_dispatch() {
        let mut core = core();
        core.config_mut().set("charset", "ISO-8859-1").unwrap();
        let response = core.dispatch(&get("/")).unwrap();
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "text/html; charset=ISO-8859-1"
        );
        assert!(core.config_mut().set("charset", "UTF-8").is_err());
    }

    #[test]
    fn test_custom_router_factory() {
        struct Fixed;
        impl Router for Fixed {
            fn current_page_id(&self) -> String {
                "index".into()
            }
            fn url_for_page(&self, page_id: &str) -> String {
                format!("/fixed/{page_id}")
            }
            fn base_url(&self) -> &str {
                "/fixed"
            }
        }

        let mut core = core().with_router_factory(|_, _| Rc::new(Fixed));
        let response = core.dispatch(&get("/anything")).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "home");
    }
}
