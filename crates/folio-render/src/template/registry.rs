//! Template registry for file-based and inline templates.
//!
//! [`TemplateRegistry`] collects templates from inline strings and template
//! directories and resolves names to their source.
//!
//! # Template Resolution
//!
//! 1. Inline templates (added via [`TemplateRegistry::add_inline`]) win.
//! 2. File templates are searched next.
//! 3. Names resolve with or without extension: both `"page"` and
//!    `"page.html"` find `page.html`.
//!
//! # Supported Extensions
//!
//! | Priority | Extension |
//! |----------|-----------|
//! | 1 (highest) | `.html` |
//! | 2 | `.jinja` |
//! | 3 | `.j2` |
//!
//! If one directory holds `page.html` and `page.j2`, the extensionless name
//! `page` resolves to `page.html`; `page.j2` stays reachable by full name.
//!
//! # Collisions
//!
//! Two *different* directories providing the same name is a configuration
//! mistake and is reported as [`RenderError::Collision`] rather than letting
//! one of them silently win.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::RenderError;
use crate::file_loader::{self, LoadedFile};

/// Recognized template file extensions in priority order.
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".html", ".jinja", ".j2"];

/// A template file discovered during directory walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Resolution name without extension (e.g. `"blog/post"`).
    pub name: String,
    /// Resolution name with extension (e.g. `"blog/post.html"`).
    pub name_with_ext: String,
    /// Absolute path to the template file.
    pub absolute_path: PathBuf,
    /// The template directory this file belongs to.
    pub source_dir: PathBuf,
}

impl TemplateFile {
    /// Returns the extension priority (lower is higher priority).
    pub fn extension_priority(&self) -> usize {
        file_loader::extension_priority(&self.name_with_ext, TEMPLATE_EXTENSIONS)
    }
}

impl From<LoadedFile> for TemplateFile {
    fn from(file: LoadedFile) -> Self {
        Self {
            name: file.name,
            name_with_ext: file.name_with_ext,
            absolute_path: file.path,
            source_dir: file.source_dir,
        }
    }
}

/// Finds every template file under `root`.
pub fn walk_template_dir(root: impl AsRef<Path>) -> Result<Vec<TemplateFile>, RenderError> {
    let files = file_loader::walk_dir(root.as_ref(), TEMPLATE_EXTENSIONS)?;
    Ok(files.into_iter().map(TemplateFile::from).collect())
}

/// Registry for template resolution from inline strings and directories.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    inline: HashMap<String, String>,
    files: HashMap<String, PathBuf>,
    /// name → (path, source dir), for collision reports.
    sources: HashMap<String, (PathBuf, PathBuf)>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an inline template, shadowing any file with the same name.
    pub fn add_inline(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.inline.insert(name.into(), content.into());
    }

    /// Adds every template found under `path`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be walked or if it provides a name
    /// another directory already provides.
    pub fn add_template_dir<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RenderError> {
        let files = walk_template_dir(path.as_ref())?;
        debug!(
            dir = %path.as_ref().display(),
            templates = files.len(),
            "Loaded template directory"
        );
        self.add_from_files(files)
    }

    /// Registers discovered template files.
    ///
    /// Each file is registered under its name with and without extension.
    pub fn add_from_files(&mut self, files: Vec<TemplateFile>) -> Result<(), RenderError> {
        let mut sorted_files = files;
        sorted_files.sort_by_key(TemplateFile::extension_priority);

        for file in sorted_files {
            if let Some((existing_path, existing_dir)) = self.sources.get(&file.name) {
                if existing_dir != &file.source_dir {
                    return Err(RenderError::Collision {
                        name: file.name,
                        existing: existing_path.clone(),
                        conflicting: file.absolute_path,
                    });
                }
                // Lower-priority extension from the same directory.
                self.files
                    .insert(file.name_with_ext, file.absolute_path);
                continue;
            }

            self.sources.insert(
                file.name.clone(),
                (file.absolute_path.clone(), file.source_dir.clone()),
            );
            self.files
                .insert(file.name.clone(), file.absolute_path.clone());
            self.files.insert(file.name_with_ext, file.absolute_path);
        }

        Ok(())
    }

    /// Returns `true` if `name` resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.inline.contains_key(name) || self.files.contains_key(name)
    }

    /// Reads the source of `name`.
    ///
    /// # Errors
    ///
    /// [`RenderError::TemplateNotFound`] if nothing resolves, or an I/O error
    /// if the file cannot be read.
    pub fn get_content(&self, name: &str) -> Result<String, RenderError> {
        if let Some(content) = self.inline.get(name) {
            return Ok(content.clone());
        }
        match self.files.get(name) {
            Some(path) => Ok(std::fs::read_to_string(path)?),
            None => Err(RenderError::TemplateNotFound(name.to_string())),
        }
    }

    /// All resolvable names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .inline
            .keys()
            .chain(self.files.keys().filter(|name| !self.inline.contains_key(*name)))
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of resolvable names.
    pub fn len(&self) -> usize {
        self.names().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.files.is_empty()
    }
}
