//! End-to-end tests of the dispatch pipeline against in-memory collaborators.

use std::cell::Cell;
use std::rc::Rc;

use folio_dispatch::http::header::{HeaderName, CONTENT_TYPE, LOCATION};
use folio_dispatch::http::StatusCode;
use folio_dispatch::{
    middleware_fn, After404, AfterInitCore, AfterRenderTemplate, AfterResolvePage,
    BeforeRenderTemplate, Config, ContentEngine, Core, DispatchError, HookError,
    MemoryRepository, Page, PageNotFound, PageRepository, Request, RequestUri, Response,
    ResponseExt, TemplateEngine, TemplateEngineFactory, TemplateError, TemplateVars,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Memory repository that counts lookups.
struct CountingRepository {
    inner: MemoryRepository,
    lookups: Cell<usize>,
}

impl PageRepository for CountingRepository {
    fn find_by_path(&self, page_id: &str) -> Result<Page, PageNotFound> {
        self.lookups.set(self.lookups.get() + 1);
        self.inner.find_by_path(page_id)
    }
}

/// Renders `[<site_title>] <content>` and counts renders.
struct StubEngine {
    page: Option<Page>,
    renders: Rc<Cell<usize>>,
}

impl TemplateEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn set_current_page(&mut self, page: Page) {
        self.page = Some(page);
    }

    fn current_page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    fn render(&self, vars: &TemplateVars) -> Result<String, TemplateError> {
        self.renders.set(self.renders.get() + 1);
        let page = self.page.as_ref().ok_or_else(|| TemplateError::NoPage {
            engine: "stub".into(),
        })?;
        let title = vars
            .get("site_title")
            .and_then(|value| value.as_str())
            .unwrap_or_default();
        Ok(format!("[{title}] {}", page.content()))
    }
}

/// Always fails to render.
struct BrokenEngine;

impl TemplateEngine for BrokenEngine {
    fn name(&self) -> &str {
        "broken"
    }

    fn set_current_page(&mut self, _page: Page) {}

    fn current_page(&self) -> Option<&Page> {
        None
    }

    fn render(&self, _vars: &TemplateVars) -> Result<String, TemplateError> {
        Err(TemplateError::render("about", "unexpected end of template"))
    }
}

struct Fixture {
    core: Core,
    repository: Rc<CountingRepository>,
    renders: Rc<Cell<usize>>,
}

impl Fixture {
    fn lookups(&self) -> usize {
        self.repository.lookups.get()
    }

    fn renders(&self) -> usize {
        self.renders.get()
    }
}

fn pages() -> MemoryRepository {
    MemoryRepository::new()
        .with_page(Page::new("index", "Welcome"))
        .with_page(Page::new("about", "About us"))
        .with_page(Page::new("docs/index", "Docs"))
        .with_page(Page::new("404", "Nothing here"))
}

fn stub_factory(renders: Rc<Cell<usize>>) -> TemplateEngineFactory {
    Rc::new(move |_config: &Config| -> Box<dyn TemplateEngine> {
        Box::new(StubEngine {
            page: None,
            renders: renders.clone(),
        })
    })
}

fn fixture_with(config: Config, pages: MemoryRepository) -> Fixture {
    let repository = Rc::new(CountingRepository {
        inner: pages,
        lookups: Cell::new(0),
    });
    let renders = Rc::new(Cell::new(0));
    let core =
        Core::with_shared_repository(config, repository.clone(), stub_factory(renders.clone()));
    Fixture {
        core,
        repository,
        renders,
    }
}

fn fixture() -> Fixture {
    fixture_with(Config::new(), pages())
}

fn get(path: &str) -> Request {
    folio_dispatch::http::Request::get(path)
        .body(String::new())
        .unwrap()
}

fn teapot() -> Response {
    Response::new("short and stout".into()).with_status(StatusCode::IM_A_TEAPOT)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_a_renders_canonical_page() {
    let mut fx = fixture();
    let response = fx.core.dispatch(&get("/about")).unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=UTF-8");
    assert_eq!(response.body(), "[Folio] About us");
    assert_eq!(fx.renders(), 1);
}

#[test]
fn test_scenario_b_redirects_to_canonical_id() {
    let mut fx = fixture();
    let response = fx.core.dispatch(&get("/About")).unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[LOCATION], "/about");
    assert!(response.body().is_empty());
    assert_eq!(fx.renders(), 0);
}

#[test]
fn test_trailing_slash_redirects_to_plain_page() {
    let mut fx = fixture();
    let response = fx.core.dispatch(&get("/about/")).unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[LOCATION], "/about");
    assert_eq!(fx.renders(), 0);
}

#[test]
fn test_page_differing_only_in_case_is_served() {
    let pages = pages().with_page(Page::new("About", "Shouting"));
    let mut fx = fixture_with(Config::new(), pages);

    let lower = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(lower.status(), StatusCode::OK);
    assert_eq!(lower.body(), "[Folio] About us");

    let upper = fx.core.dispatch(&get("/About")).unwrap();
    assert_eq!(upper.status(), StatusCode::OK);
    assert_eq!(upper.body(), "[Folio] Shouting");
}

#[test]
fn test_redirect_uses_router_inverse_mapping() {
    let mut config = Config::new();
    config.set("base_url", "https://example.com/site/").unwrap();
    let mut fx = fixture_with(config, pages());

    let response = fx.core.dispatch(&get("/site/docs")).unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[LOCATION], "https://example.com/site/docs/");

    let response = fx.core.dispatch(&get("/site/docs/")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "[Folio] Docs");
}

#[test]
fn test_scenario_c_serves_not_found_page() {
    let mut fx = fixture();
    let fired = Rc::new(Cell::new(0));
    let counter = fired.clone();
    fx.core.add_bootstrap(move |events, _config| {
        let counter = counter.clone();
        events.on::<After404, _>(move |_event, _cx| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/missing")).unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=UTF-8");
    assert_eq!(response.body(), "[Folio] Nothing here");
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_after_404_not_fired_for_found_pages() {
    let mut fx = fixture();
    let fired = Rc::new(Cell::new(0));
    let counter = fired.clone();
    fx.core.add_bootstrap(move |events, _config| {
        let counter = counter.clone();
        events.on::<After404, _>(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        Ok(())
    });

    fx.core.dispatch(&get("/about")).unwrap();
    fx.core.dispatch(&get("/About")).unwrap();
    assert_eq!(fired.get(), 0);
}

#[test]
fn test_scenario_d_request_uri_short_circuit() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<RequestUri, _>(|event, _cx| {
            if event.uri == "coffee" {
                event.response = Some(teapot());
            }
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/coffee")).unwrap();

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(response.body(), "short and stout");
    assert!(response.headers().get(CONTENT_TYPE).is_none());
    assert_eq!(fx.lookups(), 0);
    assert_eq!(fx.renders(), 0);
}

#[test]
fn test_configured_not_found_page() {
    let mut config = Config::new();
    config.set("not_found_page", "errors/missing").unwrap();
    let pages = pages().with_page(Page::new("errors/missing", "Gone fishing"));
    let mut fx = fixture_with(config, pages);

    let response = fx.core.dispatch(&get("/nowhere")).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body(), "[Folio] Gone fishing");
}

#[test]
fn test_requesting_not_found_page_directly_is_404() {
    let mut fx = fixture();
    let response = fx.core.dispatch(&get("/404")).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body(), "[Folio] Nothing here");
}

#[test]
fn test_missing_not_found_page_is_fatal() {
    let pages = MemoryRepository::new().with_page(Page::new("index", "Welcome"));
    let mut fx = fixture_with(Config::new(), pages);

    let err = fx.core.dispatch(&get("/missing")).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::NotFoundPageMissing { ref page_id, .. } if page_id == "404"
    ));

    let response = fx.core.serve(&get("/missing"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Event records
// ============================================================================

#[test]
fn test_after_init_core_short_circuit() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<AfterInitCore, _>(|event, _cx| {
            assert_eq!(event.charset, "UTF-8");
            event.response = Some(teapot());
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(fx.lookups(), 0);
}

#[test]
fn test_after_init_core_answers_with_prepared_response() {
    let mut config = Config::new();
    config.set("charset", "ISO-8859-1").unwrap();
    let mut fx = fixture_with(config, pages());
    fx.core.add_bootstrap(|events, _config| {
        events.on::<AfterInitCore, _>(|event, _cx| {
            event.prepared.body_mut().push_str("maintenance");
            event.respond_with_prepared();
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "text/html; charset=ISO-8859-1"
    );
    assert_eq!(response.body(), "maintenance");
    assert_eq!(fx.lookups(), 0);
}

#[test]
fn test_request_uri_rewrite_is_used_for_lookup() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<RequestUri, _>(|event, _cx| {
            if event.uri == "home" {
                event.uri = "index".into();
            }
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/home")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "[Folio] Welcome");
}

#[test]
fn test_after_resolve_page_can_replace_page() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<AfterResolvePage, _>(|event, _cx| {
            assert_eq!(event.page_id, "about");
            event.page = Page::new("about", "Replaced");
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.body(), "[Folio] Replaced");
}

#[test]
fn test_after_resolve_page_sees_not_found_page() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<AfterResolvePage, _>(|event, _cx| {
            assert_eq!(event.page_id, "missing");
            assert_eq!(event.page.id(), "404");
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/missing")).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_after_resolve_page_short_circuit_skips_render() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<AfterResolvePage, _>(|event, _cx| {
            event.response = Some(teapot());
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(fx.lookups(), 1);
    assert_eq!(fx.renders(), 0);
}

#[test]
fn test_before_render_template_substitutes_engine() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<BeforeRenderTemplate, _>(|event, _cx| {
            assert_eq!(event.template_engine.name(), "stub");
            event.template_engine = Box::new(ContentEngine::new());
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.body(), "About us");
    assert_eq!(fx.renders(), 0);
}

#[test]
fn test_before_render_template_short_circuit() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<BeforeRenderTemplate, _>(|event, _cx| {
            event.response = Some(teapot());
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(fx.renders(), 0);
}

#[test]
fn test_after_render_template_rewrites_output() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<AfterRenderTemplate, _>(|event, _cx| {
            assert_eq!(event.template_engine.current_page().unwrap().id(), "about");
            event.output = event.output.to_uppercase();
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.body(), "[FOLIO] ABOUT US");
}

// ============================================================================
// Request context
// ============================================================================

#[test]
fn test_accumulated_template_vars_override_config() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<AfterResolvePage, _>(|_event, cx| {
            cx.template_vars.insert("site_title", "Override");
            Ok(())
        });
        events.on::<BeforeRenderTemplate, _>(|_event, cx| {
            // Config-derived values are merged in before this event.
            assert_eq!(cx.template_vars.get("charset").unwrap(), "UTF-8");
            assert_eq!(cx.template_vars.get("site_title").unwrap(), "Override");
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.body(), "[Override] About us");
}

#[test]
fn test_router_is_available_to_subscribers() {
    let mut config = Config::new();
    config.set("base_url", "/site").unwrap();
    let mut fx = fixture_with(config, pages());
    fx.core.add_bootstrap(|events, _config| {
        events.on::<AfterInitCore, _>(|_event, cx| {
            let router = cx.router().expect("router is set before the first event");
            assert_eq!(router.current_page_id(), "about");
            assert_eq!(cx.url_for_page("docs/index").unwrap(), "/site/docs/");
            Ok(())
        });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/site/about")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_context_is_fresh_per_request() {
    struct Visits(u32);

    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events.on::<RequestUri, _>(|_event, cx| {
            assert!(cx.extensions.get::<Visits>().is_none());
            assert!(!cx.template_vars.contains_key("stamp"));
            cx.extensions.insert(Visits(1));
            cx.template_vars.insert("stamp", true);
            Ok(())
        });
        events.on::<AfterResolvePage, _>(|_event, cx| {
            assert_eq!(cx.extensions.get_required::<Visits>().unwrap().0, 1);
            Ok(())
        });
        Ok(())
    });

    fx.core.dispatch(&get("/about")).unwrap();
    fx.core.dispatch(&get("/about")).unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_dispatch_twice_is_idempotent() {
    let mut fx = fixture();
    let fired = Rc::new(Cell::new(0));
    let counter = fired.clone();
    fx.core.add_bootstrap(move |events, config| {
        config.set_default("greeting", "hi")?;
        let counter = counter.clone();
        events.on::<After404, _>(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        Ok(())
    });

    for path in ["/about", "/About", "/missing"] {
        let first = fx.core.dispatch(&get(path)).unwrap();
        let second = fx.core.dispatch(&get(path)).unwrap();
        assert_eq!(first.status(), second.status(), "{path}");
        assert_eq!(first.body(), second.body(), "{path}");
        assert_eq!(first.headers(), second.headers(), "{path}");
    }
    // One per "/missing" dispatch: subscribers are not registered twice.
    assert_eq!(fired.get(), 2);
}

#[test]
fn test_config_set_in_bootstrap_fails_once_locked() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|_events, config| {
        config.set("site_title", "Changed")?;
        Ok(())
    });

    let first = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(first.body(), "[Changed] About us");

    let err = fx.core.dispatch(&get("/about")).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Config(folio_dispatch::ConfigError::Locked { ref key }) if key == "site_title"
    ));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_fatal_subscriber_error_stops_pipeline() {
    let mut fx = fixture();
    let later = Rc::new(Cell::new(false));
    let flag = later.clone();
    fx.core.add_bootstrap(move |events, _config| {
        let flag = flag.clone();
        events
            .on::<RequestUri, _>(|_event, _cx| Err(HookError::new("access denied")))
            .on::<RequestUri, _>(move |_event, _cx| {
                flag.set(true);
                Ok(())
            });
        Ok(())
    });

    let err = fx.core.dispatch(&get("/about")).unwrap_err();
    match err {
        DispatchError::Hook(hook) => {
            assert_eq!(hook.to_string(), "hook error (request_uri): access denied");
        }
        other => panic!("expected hook error, got {other:?}"),
    }
    assert!(!later.get());
    assert_eq!(fx.lookups(), 0);

    let response = fx.core.serve(&get("/about"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body(), "500 Internal Server Error");
}

#[test]
fn test_recoverable_subscriber_error_continues() {
    let mut fx = fixture();
    fx.core.add_bootstrap(|events, _config| {
        events
            .on::<AfterResolvePage, _>(|_event, _cx| Err(HookError::recoverable("cache offline")))
            .on::<AfterResolvePage, _>(|event, _cx| {
                event.page.set_content("Still here");
                Ok(())
            });
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "[Folio] Still here");
}

#[test]
fn test_render_error_is_fatal() {
    let factory: TemplateEngineFactory =
        Rc::new(|_config: &Config| -> Box<dyn TemplateEngine> { Box::new(BrokenEngine) });
    let mut core = Core::new(Config::new(), pages(), factory);

    let err = core.dispatch(&get("/about")).unwrap_err();
    assert!(matches!(err, DispatchError::Template(TemplateError::Render { .. })));

    let response = core.serve(&get("/about"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_short_circuit_before_render_avoids_render_error() {
    let factory: TemplateEngineFactory =
        Rc::new(|_config: &Config| -> Box<dyn TemplateEngine> { Box::new(BrokenEngine) });
    let mut core = Core::new(Config::new(), pages(), factory);
    core.add_bootstrap(|events, _config| {
        events.on::<BeforeRenderTemplate, _>(|event, _cx| {
            event.response = Some(teapot());
            Ok(())
        });
        Ok(())
    });

    let response = core.serve(&get("/about"));
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
}

// ============================================================================
// Middleware
// ============================================================================

#[test]
fn test_middleware_decorates_core_response() {
    let mut fx = fixture();
    fx.core.add_middleware(|chain, _events, config| {
        let title = config.get_str("site_title").unwrap_or_default().to_string();
        chain.push(middleware_fn(move |request, next| {
            let response = next.run(request)?;
            Ok(response.with_header(HeaderName::from_static("x-site"), &title)?)
        }));
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.headers()["x-site"], "Folio");
    assert_eq!(response.body(), "[Folio] About us");
}

#[test]
fn test_middleware_setup_runs_in_order() {
    let mut fx = fixture();
    for tag in ["outer", "inner"] {
        fx.core.add_middleware(move |chain, _events, _config| {
            chain.push(middleware_fn(move |request, next| {
                let response = next.run(request)?;
                let body = format!("{tag}({})", response.body());
                Ok(Response::new(body))
            }));
            Ok(())
        });
    }

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.body(), "outer(inner([Folio] About us))");
}

#[test]
fn test_middleware_short_circuit_skips_core() {
    let mut fx = fixture();
    fx.core.add_middleware(|chain, _events, _config| {
        chain.push(middleware_fn(|_request, _next| Ok(teapot())));
        Ok(())
    });

    let response = fx.core.dispatch(&get("/about")).unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(fx.lookups(), 0);
}

#[test]
fn test_config_is_locked_before_middleware_setup() {
    let mut fx = fixture();
    fx.core.add_middleware(|_chain, _events, config| {
        assert!(config.is_locked());
        Ok(())
    });
    fx.core.dispatch(&get("/about")).unwrap();
}
