//! Directory walking for extension-matched files.
//!
//! Both templates and content pages are plain files named by their path
//! relative to a root directory. [`walk_dir`] finds them:
//!
//! ```text
//! templates/
//! ├── index.html          → "index"      ("index.html")
//! └── partials/
//!     └── nav.j2          → "partials/nav" ("partials/nav.j2")
//! ```
//!
//! Names always use forward slashes, whatever the platform separator.

use std::fmt;
use std::path::{Path, PathBuf};

/// A file found by [`walk_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    /// Relative name without extension (`"partials/nav"`).
    pub name: String,
    /// Relative name with extension (`"partials/nav.j2"`).
    pub name_with_ext: String,
    /// Absolute path to the file.
    pub path: PathBuf,
    /// The root directory the file was found under.
    pub source_dir: PathBuf,
}

impl LoadedFile {
    /// Creates a file descriptor.
    pub fn new(
        name: impl Into<String>,
        name_with_ext: impl Into<String>,
        path: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            name_with_ext: name_with_ext.into(),
            path: path.into(),
            source_dir: source_dir.into(),
        }
    }

    /// Position of this file's extension in `extensions`, lower wins.
    pub fn extension_priority(&self, extensions: &[&str]) -> usize {
        extension_priority(&self.name_with_ext, extensions)
    }
}

/// Position of `name`'s extension in `extensions`.
///
/// Returns `usize::MAX` if none matches.
pub fn extension_priority(name: &str, extensions: &[&str]) -> usize {
    extensions
        .iter()
        .position(|ext| name.ends_with(ext))
        .unwrap_or(usize::MAX)
}

/// Errors raised while walking a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The root does not exist or is not a directory.
    DirectoryNotFound {
        /// The missing root.
        path: PathBuf,
    },

    /// Reading a directory or file failed.
    Io {
        /// The path being read.
        path: PathBuf,
        /// The I/O error message.
        message: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::DirectoryNotFound { path } => {
                write!(f, "directory not found: {}", path.display())
            }
            LoadError::Io { path, message } => {
                write!(f, "failed to read {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Finds every file under `root` whose name ends with one of `extensions`.
///
/// Results are sorted by `name_with_ext`.
///
/// # Errors
///
/// Returns [`LoadError::DirectoryNotFound`] if `root` is not a directory and
/// [`LoadError::Io`] if a directory cannot be listed.
pub fn walk_dir(root: &Path, extensions: &[&str]) -> Result<Vec<LoadedFile>, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }
    let root_canonical = root.canonicalize().map_err(|e| LoadError::Io {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    walk_dir_recursive(&root_canonical, &root_canonical, extensions, &mut files)?;
    files.sort_by(|a, b| a.name_with_ext.cmp(&b.name_with_ext));
    Ok(files)
}

fn walk_dir_recursive(
    current: &Path,
    root: &Path,
    extensions: &[&str],
    files: &mut Vec<LoadedFile>,
) -> Result<(), LoadError> {
    let entries = std::fs::read_dir(current).map_err(|e| LoadError::Io {
        path: current.to_path_buf(),
        message: e.to_string(),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| LoadError::Io {
            path: current.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();

        if path.is_dir() {
            walk_dir_recursive(&path, root, extensions, files)?;
        } else if path.is_file() {
            if let Some(loaded_file) = try_parse_file(&path, root, extensions) {
                files.push(loaded_file);
            }
        }
    }

    Ok(())
}

fn try_parse_file(path: &Path, root: &Path, extensions: &[&str]) -> Option<LoadedFile> {
    let path_str = path.to_string_lossy();
    let extension = extensions.iter().find(|ext| path_str.ends_with(*ext))?;

    let relative = path.strip_prefix(root).ok()?;
    let name_with_ext = relative
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/");
    let name = name_with_ext.strip_suffix(extension)?.to_string();

    // Dotfiles like ".html" have no name.
    if name.is_empty() || name.ends_with('/') {
        return None;
    }
    Some(LoadedFile::new(name, name_with_ext, path, root))
}
