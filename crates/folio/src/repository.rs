//! Pages loaded from a content directory.
//!
//! Every file with the content extension becomes a page whose identifier is
//! its path relative to the content root, without extension:
//!
//! ```text
//! content/
//! ├── index.md            → "index"
//! ├── about.md            → "about"
//! ├── 404.md              → "404"
//! └── docs/
//!     ├── index.md        → "docs/index"
//!     └── setup.md        → "docs/setup"
//! ```
//!
//! A file may start with YAML front matter between `---` lines; it becomes
//! the page's metadata:
//!
//! ```text
//! ---
//! title: Setup
//! template: wide
//! ---
//! <p>Install it.</p>
//! ```
//!
//! The body is used as-is: it is markup, not converted.

use std::path::{Path, PathBuf};

use folio_dispatch::{Config, MemoryRepository, Page, PageNotFound, PageRepository};
use serde_json::{Map, Value};
use tracing::debug;

/// Errors raised while loading content.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The content directory could not be walked.
    #[error("failed to scan content directory: {0}")]
    Scan(#[from] folio_render::LoadError),

    /// A content file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// The unreadable file.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Front matter is not valid YAML.
    #[error("invalid front matter in {}: {source}", .path.display())]
    FrontMatter {
        /// The offending file.
        path: PathBuf,
        /// The YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Front matter parsed to something other than a mapping.
    #[error("front matter in {} must be a mapping", .path.display())]
    FrontMatterNotMapping {
        /// The offending file.
        path: PathBuf,
    },
}

/// Pages read from a content directory at load time.
///
/// Lookups follow [`MemoryRepository`]: case-insensitive, with a fallback
/// from `dir` to `dir/index`. Files are read once; restart to pick up edits.
#[derive(Debug, Clone, Default)]
pub struct FlatFileRepository {
    root: Option<PathBuf>,
    pages: MemoryRepository,
}

impl FlatFileRepository {
    /// Creates a repository with no content directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*{extension}` file under `root`.
    pub fn open(root: impl AsRef<Path>, extension: &str) -> Result<Self, RepositoryError> {
        let root = root.as_ref();
        let mut pages = MemoryRepository::new();
        for file in folio_render::walk_dir(root, &[extension])? {
            let source = std::fs::read_to_string(&file.path).map_err(|source| {
                RepositoryError::Read {
                    path: file.path.clone(),
                    source,
                }
            })?;
            pages.insert(parse_page(&file.name, &source, &file.path)?);
        }
        debug!(root = %root.display(), pages = pages.len(), "Loaded content directory");
        Ok(Self {
            root: Some(root.to_path_buf()),
            pages,
        })
    }

    /// Loads `root` with the configured `content_extension`.
    pub fn from_config(root: impl AsRef<Path>, config: &Config) -> Result<Self, RepositoryError> {
        let extension = config
            .get_str(folio_dispatch::CONTENT_EXTENSION)
            .unwrap_or(DEFAULT_EXTENSION);
        Self::open(root, extension)
    }

    /// Adds or replaces a page.
    pub fn insert(&mut self, page: Page) -> Option<Page> {
        self.pages.insert(page)
    }

    /// The content directory, if one was loaded.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// All pages, sorted by identifier.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.pages()
    }

    /// Pages not marked `hidden`, sorted by identifier.
    pub fn visible_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages().filter(|page| !page.is_hidden())
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if there are no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageRepository for FlatFileRepository {
    fn find_by_path(&self, page_id: &str) -> Result<Page, PageNotFound> {
        self.pages.find_by_path(page_id)
    }
}

const DEFAULT_EXTENSION: &str = ".md";

/// Splits a source file into front matter and body and builds the page.
///
/// `path` is only used in error messages.
pub fn parse_page(id: &str, source: &str, path: &Path) -> Result<Page, RepositoryError> {
    let (front_matter, body) = split_front_matter(source);
    let meta = match front_matter {
        None => Map::new(),
        Some(yaml) if yaml.trim().is_empty() => Map::new(),
        Some(yaml) => match serde_yaml::from_str::<Value>(yaml) {
            Ok(Value::Object(map)) => map,
            Ok(Value::Null) => Map::new(),
            Ok(_) => {
                return Err(RepositoryError::FrontMatterNotMapping {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(RepositoryError::FrontMatter {
                    path: path.to_path_buf(),
                    source,
                })
            }
        },
    };
    Ok(Page::new(id, body).with_meta_map(meta))
}

/// Returns `(front matter, body)`. Without an opening `---` line the whole
/// source is the body; without a closing one there is no front matter.
fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return (None, source);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let body = &rest[offset + line.len()..];
            return (Some(&rest[..offset]), body);
        }
        offset += line.len();
    }
    (None, source)
}
