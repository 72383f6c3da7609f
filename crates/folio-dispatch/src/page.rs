//! Pages and the repository contract.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::router::INDEX_PAGE;

/// A content page.
///
/// The identifier is the page's canonical path (`about`, `docs/index`).
/// Metadata is free-form; `title`, `template` and `hidden` have meaning to
/// the bundled engine and repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    id: String,
    content: String,
    #[serde(default)]
    meta: Map<String, Value>,
}

impl Page {
    /// Creates a page without metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            meta: Map::new(),
        }
    }

    /// Adds a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Replaces all metadata.
    pub fn with_meta_map(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    /// The canonical identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The raw content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the content.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// All metadata.
    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// A metadata entry, if it is a string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// The `title` metadata entry.
    pub fn title(&self) -> Option<&str> {
        self.meta_str("title")
    }

    /// The `template` metadata entry.
    pub fn template(&self) -> Option<&str> {
        self.meta_str("template")
    }

    /// Returns `true` if the page is marked `hidden: true`.
    pub fn is_hidden(&self) -> bool {
        self.meta
            .get("hidden")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// A repository lookup miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("page not found: \"{page_id}\"")]
pub struct PageNotFound {
    /// The identifier that was requested.
    pub page_id: String,
}

impl PageNotFound {
    /// Creates a miss for `page_id`.
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
        }
    }
}

/// Resolves page identifiers to pages.
///
/// Implementations decide canonicalisation: the returned page's
/// [`id`](Page::id) is authoritative, and when it differs from the requested
/// identifier the core redirects to it instead of rendering.
pub trait PageRepository {
    /// Finds the page for `page_id`.
    fn find_by_path(&self, page_id: &str) -> Result<Page, PageNotFound>;
}

/// Identifiers to try, in order, when looking up `requested`.
///
/// Surrounding slashes are ignored, an empty request means the root index,
/// and a directory-style request falls back to its `index` page. A request
/// for `<dir>/index` also tries the plain `<dir>` page, so `/about/` finds
/// `about`.
pub fn lookup_candidates(requested: &str) -> Vec<String> {
    let trimmed = requested.trim_matches('/');
    if trimmed.is_empty() {
        return vec![INDEX_PAGE.to_string()];
    }
    let mut candidates = vec![trimmed.to_string(), format!("{trimmed}/{INDEX_PAGE}")];
    if let Some(dir) = trimmed.strip_suffix(&format!("/{INDEX_PAGE}")) {
        candidates.push(dir.to_string());
    }
    candidates
}

/// Pages held in memory.
///
/// Lookups are case-insensitive and fall back to `<id>/index`; the page is
/// returned under its stored identifier. An exact match always wins over a
/// case-folded one.
///
/// ```rust
/// use folio_dispatch::{MemoryRepository, Page, PageRepository};
///
/// let repo = MemoryRepository::new()
///     .with_page(Page::new("about", "About us"))
///     .with_page(Page::new("docs/index", "Docs"));
///
/// assert_eq!(repo.find_by_path("About").unwrap().id(), "about");
/// assert_eq!(repo.find_by_path("docs").unwrap().id(), "docs/index");
/// assert!(repo.find_by_path("missing").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    pages: BTreeMap<String, Page>,
    folded: HashMap<String, String>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page, replacing any page with the same identifier.
    pub fn insert(&mut self, page: Page) -> Option<Page> {
        self.folded
            .insert(page.id().to_lowercase(), page.id().to_string());
        self.pages.insert(page.id().to_string(), page)
    }

    /// Adds a page, builder style.
    pub fn with_page(mut self, page: Page) -> Self {
        self.insert(page);
        self
    }

    /// All pages in identifier order.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if the repository holds no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageRepository for MemoryRepository {
    fn find_by_path(&self, page_id: &str) -> Result<Page, PageNotFound> {
        lookup_candidates(page_id)
            .iter()
            .find_map(|candidate| {
                self.pages.get(candidate).or_else(|| {
                    let canonical = self.folded.get(&candidate.to_lowercase())?;
                    self.pages.get(canonical)
                })
            })
            .cloned()
            .ok_or_else(|| PageNotFound::new(page_id))
    }
}
