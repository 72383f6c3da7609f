//! Plugins: bundles of subscribers and configuration defaults.
//!
//! A plugin is registered on every bootstrap, so [`Plugin::register`] must
//! be safe to run repeatedly. Use [`Config::set_default`] rather than
//! [`Config::set`] for settings the plugin contributes: the configuration is
//! locked after the first dispatch.

use std::rc::Rc;

use folio_dispatch::{BeforeRenderTemplate, Config, DispatchError, EventBus, HookError, Page};
use serde::Serialize;

/// An extension registered with the dispatch core at bootstrap.
pub trait Plugin {
    /// A short name used in logs.
    fn name(&self) -> &str;

    /// Subscribes to events and contributes configuration defaults.
    fn register(&self, events: &mut EventBus, config: &mut Config) -> Result<(), DispatchError>;
}

/// Exposes a list of pages to templates as the `pages` variable.
///
/// Each entry has `id`, `title` (falling back to the id) and `url`, built
/// through the request's router so it honours `base_url`:
///
/// ```text
/// <ul>{% for p in pages %}<li><a href="{{ p.url }}">{{ p.title }}</a></li>{% endfor %}</ul>
/// ```
#[derive(Debug, Clone)]
pub struct PageIndex {
    entries: Rc<[IndexEntry]>,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    title: String,
}

#[derive(Serialize)]
struct IndexItem<'a> {
    id: &'a str,
    title: &'a str,
    url: String,
}

impl PageIndex {
    /// The template variable the index is published as.
    pub const VAR: &'static str = "pages";

    /// Builds an index over `pages`, in the order given.
    pub fn new<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Self {
        let entries = pages
            .into_iter()
            .map(|page| IndexEntry {
                id: page.id().to_string(),
                title: page.title().unwrap_or(page.id()).to_string(),
            })
            .collect();
        Self { entries }
    }

    /// Number of indexed pages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no page is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Plugin for PageIndex {
    fn name(&self) -> &str {
        "page-index"
    }

    fn register(&self, events: &mut EventBus, _config: &mut Config) -> Result<(), DispatchError> {
        let entries = Rc::clone(&self.entries);
        events.on::<BeforeRenderTemplate, _>(move |_event, cx| {
            let items: Vec<IndexItem<'_>> = entries
                .iter()
                .map(|entry| IndexItem {
                    id: &entry.id,
                    title: &entry.title,
                    url: cx
                        .url_for_page(&entry.id)
                        .unwrap_or_else(|| format!("/{}", entry.id)),
                })
                .collect();
            let value = serde_json::to_value(items).map_err(|err| {
                HookError::recoverable("failed to build page index").with_source(err)
            })?;
            cx.template_vars.insert(PageIndex::VAR, value);
            Ok(())
        });
        Ok(())
    }
}
