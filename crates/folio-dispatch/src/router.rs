//! Mapping between request paths and page identifiers.
//!
//! A [`Router`] is built per request. It answers two questions: which page
//! does this request ask for, and what is the public URL of a given page.
//!
//! [`PathRouter`] is the default:
//!
//! | Request path (base `/blog`) | Page identifier |
//! |-----------------------------|-----------------|
//! | `/blog/` | `index` |
//! | `/blog/about` | `about` |
//! | `/blog/docs/` | `docs/index` |
//! | `/blog/docs/setup` | `docs/setup` |
//!
//! and the inverse, [`Router::url_for_page`], renders `index` pages as
//! directory URLs with a trailing slash.

use http::Uri;

use crate::response::Request;

/// Page identifier of a directory's landing page.
pub const INDEX_PAGE: &str = "index";

/// Maps the current request to a page identifier and pages back to URLs.
pub trait Router {
    /// The page identifier the current request asks for.
    fn current_page_id(&self) -> String;

    /// The public URL of a page.
    fn url_for_page(&self, page_id: &str) -> String;

    /// The public URL of the site root, without a trailing slash.
    fn base_url(&self) -> &str;
}

/// Path-based router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRouter {
    base_url: String,
    base_path: String,
    path: String,
}

impl PathRouter {
    /// Creates a router for `path` on a site rooted at `base_url`.
    ///
    /// `base_url` may be absolute (`https://example.com/blog`), a bare path
    /// (`/blog`) or empty.
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base_path = base_path(&base_url);
        Self {
            base_url,
            base_path,
            path: path.into(),
        }
    }

    /// Creates a router for the path of `request`.
    pub fn from_request(request: &Request, base_url: &str) -> Self {
        Self::new(base_url, request.uri().path())
    }

    /// The request path relative to the site root, without the leading slash.
    fn relative_path(&self) -> &str {
        let relative = match self.path.strip_prefix(&self.base_path) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => &self.path,
        };
        relative.trim_start_matches('/')
    }
}

impl Router for PathRouter {
    fn current_page_id(&self) -> String {
        let relative = self.relative_path();
        if relative.is_empty() || relative.ends_with('/') {
            format!("{relative}{INDEX_PAGE}")
        } else {
            relative.to_string()
        }
    }

    fn url_for_page(&self, page_id: &str) -> String {
        let page_id = page_id.trim_start_matches('/');
        if page_id == INDEX_PAGE {
            return format!("{}/", self.base_url);
        }
        match page_id.strip_suffix("/index") {
            Some(dir) => format!("{}/{dir}/", self.base_url),
            None => format!("{}/{page_id}", self.base_url),
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn base_path(base_url: &str) -> String {
    base_url
        .parse::<Uri>()
        .map(|uri| uri.path().trim_end_matches('/').to_string())
        .unwrap_or_default()
}
