//! Named-hook event bus.
//!
//! Extensions observe and steer the pipeline by subscribing to events. Each
//! event has its own record type carrying the fields subscribers may read and
//! overwrite; the same record is passed, mutably, to every subscriber in
//! registration order, so later subscribers see what earlier ones wrote.
//!
//! # Pipeline Position
//!
//! ```text
//! request
//!   → AFTER_INIT_CORE          {charset, prepared, response}
//!   → REQUEST_URI              {uri, response}
//!   → page lookup (redirect / not-found fallback)
//!   → AFTER_404                {}               (only on a miss)
//!   → AFTER_RESOLVE_PAGE       {page_id, page, response}
//!   → BEFORE_INIT_TEMPLATE     {}
//!   → BEFORE_RENDER_TEMPLATE   {template_engine, response}
//!   → render
//!   → AFTER_RENDER_TEMPLATE    {template_engine, output}
//! response
//! ```
//!
//! # Short-circuiting
//!
//! Records with a `response` field implement [`ShortCircuit`]. If, after all
//! subscribers of such an event have run, `response` holds a value, the core
//! returns it immediately and skips every later stage and event.
//!
//! # Errors
//!
//! A subscriber returning a fatal [`HookError`] (the default) stops the
//! remaining subscribers of that trigger and fails the stage. A
//! [recoverable](HookError::recoverable) error is logged and the remaining
//! subscribers still run.
//!
//! # Example
//!
//! ```rust
//! use folio_dispatch::{EventBus, RequestContext, RequestUri, HookError};
//!
//! let mut bus = EventBus::new();
//! bus.on::<RequestUri, _>(|event, _cx| {
//!     if event.uri == "old-home" {
//!         event.uri = "index".into();
//!     }
//!     Ok(())
//! });
//!
//! let mut event = RequestUri::new("old-home");
//! bus.trigger(&mut event, &mut RequestContext::new())?;
//! assert_eq!(event.uri, "index");
//! # Ok::<(), HookError>(())
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::page::Page;
use crate::response::Response;
use crate::template::TemplateEngine;

/// The hook points of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Core initialised for the request.
    AfterInitCore,
    /// Requested page identifier derived.
    RequestUri,
    /// The requested page does not exist.
    After404,
    /// A page has been resolved.
    AfterResolvePage,
    /// Template engine about to be created.
    BeforeInitTemplate,
    /// Template engine about to render.
    BeforeRenderTemplate,
    /// Template engine has rendered.
    AfterRenderTemplate,
}

impl EventName {
    /// Every event, in pipeline order.
    pub const ALL: [EventName; 7] = [
        EventName::AfterInitCore,
        EventName::RequestUri,
        EventName::After404,
        EventName::AfterResolvePage,
        EventName::BeforeInitTemplate,
        EventName::BeforeRenderTemplate,
        EventName::AfterRenderTemplate,
    ];

    /// The canonical hook name.
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::AfterInitCore => "after_init_core",
            EventName::RequestUri => "request_uri",
            EventName::After404 => "after_404",
            EventName::AfterResolvePage => "after_resolve_page",
            EventName::BeforeInitTemplate => "before_init_template",
            EventName::BeforeRenderTemplate => "before_render_template",
            EventName::AfterRenderTemplate => "after_render_template",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook name that does not match any event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event \"{0}\"")]
pub struct UnknownEvent(pub String);

impl FromStr for EventName {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// A record type published on the bus under a fixed name.
pub trait Event: 'static {
    /// The hook this record belongs to.
    const NAME: EventName;
}

/// An event whose subscribers may answer the request themselves.
pub trait ShortCircuit: Event {
    /// Takes the response a subscriber supplied, if any.
    fn take_response(&mut self) -> Option<Response>;
}

macro_rules! short_circuit {
    ($record:ty) => {
        impl ShortCircuit for $record {
            fn take_response(&mut self) -> Option<Response> {
                self.response.take()
            }
        }
    };
}

/// Published once the core has set up the request.
///
/// `prepared` is the empty response the core built, already carrying the
/// configured charset. It is only sent if a subscriber moves it into
/// `response`.
#[derive(Debug, Default)]
pub struct AfterInitCore {
    /// Character encoding responses will carry.
    pub charset: String,
    /// Empty HTML response with the configured charset.
    pub prepared: Response,
    /// Set to answer the request immediately.
    pub response: Option<Response>,
}

impl AfterInitCore {
    /// Answers the request with `prepared`.
    pub fn respond_with_prepared(&mut self) {
        self.response = Some(std::mem::take(&mut self.prepared));
    }
}

impl Event for AfterInitCore {
    const NAME: EventName = EventName::AfterInitCore;
}
short_circuit!(AfterInitCore);

/// Published with the page identifier derived from the request.
///
/// Subscribers may rewrite `uri` to serve a different page, or set
/// `response` to serve a route that has no page at all.
#[derive(Debug)]
pub struct RequestUri {
    /// The requested page identifier.
    pub uri: String,
    /// Set to answer the request immediately.
    pub response: Option<Response>,
}

impl RequestUri {
    /// Creates the record for `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            response: None,
        }
    }
}

impl Event for RequestUri {
    const NAME: EventName = EventName::RequestUri;
}
short_circuit!(RequestUri);

/// Published when the requested page does not exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct After404;

impl Event for After404 {
    const NAME: EventName = EventName::After404;
}

/// Published once a page has been resolved.
#[derive(Debug)]
pub struct AfterResolvePage {
    /// The requested page identifier.
    pub page_id: String,
    /// The page that will be rendered; may be replaced.
    pub page: Page,
    /// Set to answer the request immediately.
    pub response: Option<Response>,
}

impl Event for AfterResolvePage {
    const NAME: EventName = EventName::AfterResolvePage;
}
short_circuit!(AfterResolvePage);

/// Published before the template engine is created.
#[derive(Debug, Default, Clone, Copy)]
pub struct BeforeInitTemplate;

impl Event for BeforeInitTemplate {
    const NAME: EventName = EventName::BeforeInitTemplate;
}

/// Published before rendering.
pub struct BeforeRenderTemplate {
    /// The engine that will render; may be replaced.
    pub template_engine: Box<dyn TemplateEngine>,
    /// Set to answer the request immediately.
    pub response: Option<Response>,
}

impl Event for BeforeRenderTemplate {
    const NAME: EventName = EventName::BeforeRenderTemplate;
}
short_circuit!(BeforeRenderTemplate);

impl fmt::Debug for BeforeRenderTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforeRenderTemplate")
            .field("template_engine", &self.template_engine.name())
            .field("response", &self.response)
            .finish()
    }
}

/// Published after rendering.
///
/// The value of `output` once all subscribers have run is what the response
/// body will contain.
pub struct AfterRenderTemplate {
    /// The engine that rendered.
    pub template_engine: Box<dyn TemplateEngine>,
    /// The rendered markup; may be rewritten.
    pub output: String,
}

impl Event for AfterRenderTemplate {
    const NAME: EventName = EventName::AfterRenderTemplate;
}

impl fmt::Debug for AfterRenderTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterRenderTemplate")
            .field("template_engine", &self.template_engine.name())
            .field("output_len", &self.output.len())
            .finish()
    }
}

/// Error returned by a subscriber.
#[derive(Debug, Error)]
#[error("hook error{}: {message}", event_label(.event))]
pub struct HookError {
    /// Human-readable error message.
    pub message: String,
    /// The event the subscriber was handling. Filled in by the bus.
    pub event: Option<EventName>,
    /// Whether the error aborts the trigger.
    pub fatal: bool,
    /// The underlying error source, if any.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

fn event_label(event: &Option<EventName>) -> String {
    event.map(|name| format!(" ({name})")).unwrap_or_default()
}

impl HookError {
    /// Creates a fatal error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event: None,
            fatal: true,
            source: None,
        }
    }

    /// Creates an error that is logged without stopping sibling subscribers.
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            fatal: false,
            ..Self::new(message)
        }
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.source = Some(source.into());
        self
    }
}

type SubscriberFn<E> = Box<dyn Fn(&mut E, &mut RequestContext) -> Result<(), HookError>>;

/// Ordered subscriber lists keyed by event.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventName, Vec<Box<dyn Any>>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to event `E`.
    ///
    /// Subscribers run in registration order. Registering the same function
    /// twice makes it run twice.
    pub fn on<E, F>(&mut self, subscriber: F) -> &mut Self
    where
        E: Event,
        F: Fn(&mut E, &mut RequestContext) -> Result<(), HookError> + 'static,
    {
        let subscriber: SubscriberFn<E> = Box::new(subscriber);
        self.subscribers
            .entry(E::NAME)
            .or_default()
            .push(Box::new(subscriber));
        self
    }

    /// Runs every subscriber of `E` against `event`.
    pub fn trigger<E: Event>(
        &self,
        event: &mut E,
        cx: &mut RequestContext,
    ) -> Result<(), HookError> {
        let Some(subscribers) = self.subscribers.get(&E::NAME) else {
            return Ok(());
        };

        debug!(
            event = %E::NAME,
            subscriber_count = subscribers.len(),
            "Triggering event"
        );

        for subscriber in subscribers
            .iter()
            .filter_map(|entry| entry.downcast_ref::<SubscriberFn<E>>())
        {
            if let Err(mut err) = subscriber(event, cx) {
                err.event = Some(E::NAME);
                if err.fatal {
                    return Err(err);
                }
                warn!(event = %E::NAME, error = %err, "Subscriber failed, continuing");
            }
        }
        Ok(())
    }

    /// Runs every subscriber of `E` and takes the response they supplied.
    pub fn trigger_for_response<E: ShortCircuit>(
        &self,
        event: &mut E,
        cx: &mut RequestContext,
    ) -> Result<Option<Response>, HookError> {
        self.trigger(event, cx)?;
        Ok(event.take_response())
    }

    /// Number of subscribers registered for `name`.
    pub fn subscriber_count(&self, name: EventName) -> usize {
        self.subscribers.get(&name).map_or(0, Vec::len)
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.values().all(Vec::is_empty)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts = f.debug_map();
        for name in EventName::ALL {
            let count = self.subscriber_count(name);
            if count > 0 {
                counts.entry(&name.as_str(), &count);
            }
        }
        counts.finish()
    }
}
